use super::ModConfigurator;
use crate::config::{CredentialsFormat, ServerConfig};
use crate::config_gen::{patch_directive, server_cfg_path};
use crate::storage::write_file;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

/// Directive VPPAdminTools reads from serverDZ.cfg to skip its login prompt.
const DISABLE_PASSWORD_KEY: &str = "vppDisablePassword";

pub struct VppAdminTools;

#[async_trait]
impl ModConfigurator for VppAdminTools {
    fn name(&self) -> &'static str {
        "VPPAdminTools"
    }

    async fn configure(&self, config: &ServerConfig) -> Result<(), String> {
        let vpp = match &config.mod_configs.vpp_admin_tools {
            Some(vpp) => vpp,
            None => {
                info!("no vppAdminTools config block, nothing to configure");
                return Ok(());
            }
        };

        let base = config.paths.profiles_dir.join("VPPAdminTools");

        let super_admins_path = base.join("Permissions/SuperAdmins/SuperAdmins.txt");
        let mut list = vpp.super_admins.join("\n");
        if !list.is_empty() {
            list.push('\n');
        }
        write_file(&super_admins_path, &list).await?;
        info!(
            "wrote {} super admin(s) to {}",
            vpp.super_admins.len(),
            super_admins_path.display()
        );

        let credentials_path = base.join("credentials.txt");
        let credentials = if vpp.disable_password {
            String::new()
        } else {
            match vpp.password.as_deref() {
                Some(password) => match vpp.credentials_format {
                    CredentialsFormat::Plaintext => password.to_string(),
                    CredentialsFormat::Sha256 => {
                        format!("{:x}", Sha256::digest(password.as_bytes()))
                    }
                },
                None => {
                    warn!("vppAdminTools has no password and passwords are not disabled");
                    String::new()
                }
            }
        };
        write_file(&credentials_path, &credentials).await?;

        if vpp.disable_password {
            self.patch_server_cfg(config).await?;
        }

        Ok(())
    }
}

impl VppAdminTools {
    /// Flip the disable-password directive in serverDZ.cfg. The file only
    /// exists after config generation, so the first configuration pass before
    /// generation skips the patch; the post-generation pass applies it.
    async fn patch_server_cfg(&self, config: &ServerConfig) -> Result<(), String> {
        let cfg_path = server_cfg_path(config);
        let text = match tokio::fs::read_to_string(&cfg_path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "{} not generated yet, deferring {DISABLE_PASSWORD_KEY} patch",
                    cfg_path.display()
                );
                return Ok(());
            }
            Err(err) => {
                return Err(format!("failed to read {}: {err}", cfg_path.display()));
            }
        };

        let patched = patch_directive(&text, DISABLE_PASSWORD_KEY, "1");
        write_file(&cfg_path, &patched).await?;
        info!("set {DISABLE_PASSWORD_KEY} = 1 in {}", cfg_path.display());
        Ok(())
    }
}
