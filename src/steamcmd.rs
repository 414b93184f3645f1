use crate::config::{Credentials, ModEntry, Paths};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const SERVER_APP_ID: &str = "223350";
pub const WORKSHOP_APP_ID: &str = "221100";

const STEAMCMD_ARCHIVE_URL: &str =
    "https://steamcdn-a.akamaihd.net/client/installer/steamcmd_linux.tar.gz";

/// Exit code SteamCMD uses when the account needs a Steam Guard code.
const EXIT_SECOND_FACTOR: i32 = 5;

/// Outcome of one SteamCMD invocation. Nonzero exit codes are data here, not
/// errors: the caller decides what each variant means for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteamOutcome {
    Success,
    SecondFactorRequired,
    Failure(i32),
}

impl SteamOutcome {
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => SteamOutcome::Success,
            EXIT_SECOND_FACTOR => SteamOutcome::SecondFactorRequired,
            other => SteamOutcome::Failure(other),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SteamOutcome::Success)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("steamcmd is not installed at {0}; run `dayzctl install-steamcmd` first")]
    MissingSteamCmd(PathBuf),
    #[error("steam credentials are required for workshop downloads; set STEAM_USERNAME and STEAM_PASSWORD")]
    MissingCredentials,
    #[error("{0}")]
    Io(String),
}

/// Seam between the installer and the actual shell so tests can substitute
/// recorded exit codes for real SteamCMD runs.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, cwd: Option<&Path>) -> Result<i32, String>;
}

/// Production runner: `sh -c <command>` with inherited stdio so SteamCMD's
/// own progress output reaches the console.
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, cwd: Option<&Path>) -> Result<i32, String> {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let status = cmd
            .status()
            .await
            .map_err(|err| format!("failed to run command: {err}"))?;
        Ok(status.code().unwrap_or(-1))
    }
}

/// Quote a value for interpolation into a POSIX shell command line. Embedded
/// single quotes become `'\''` so the value can never terminate the quoting.
pub fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Mods the game client must also load, `;`-joined for the `-mod=` argument.
pub fn build_mod_string(mods: &[ModEntry]) -> String {
    mods.iter()
        .filter(|entry| !entry.server_side)
        .map(|entry| entry.name.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

/// Server-only mods, `;`-joined for the `-servermod=` argument.
pub fn build_server_mod_string(mods: &[ModEntry]) -> String {
    mods.iter()
        .filter(|entry| entry.server_side)
        .map(|entry| entry.name.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

pub struct SteamCmd {
    paths: Paths,
    runner: Arc<dyn CommandRunner>,
}

impl SteamCmd {
    pub fn new(paths: Paths, runner: Arc<dyn CommandRunner>) -> Self {
        Self { paths, runner }
    }

    pub fn script_path(&self) -> PathBuf {
        self.paths.steamcmd_dir.join("steamcmd.sh")
    }

    pub async fn is_installed(&self) -> bool {
        tokio::fs::metadata(self.script_path()).await.is_ok()
    }

    /// Fetch the SteamCMD distribution archive, unpack it, and run it once in
    /// self-update mode. No partial retries: any failed step fails the whole
    /// install.
    pub async fn install(&self) -> Result<(), InstallError> {
        let dir = &self.paths.steamcmd_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|err| InstallError::Io(format!("failed to create {}: {err}", dir.display())))?;

        info!("downloading steamcmd from {STEAMCMD_ARCHIVE_URL}");
        let response = reqwest::get(STEAMCMD_ARCHIVE_URL)
            .await
            .map_err(|err| InstallError::Io(format!("failed to download steamcmd: {err}")))?;
        if !response.status().is_success() {
            return Err(InstallError::Io(format!(
                "failed to download steamcmd: status {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| InstallError::Io(format!("failed to download steamcmd: {err}")))?;

        let archive = dir.join("steamcmd_linux.tar.gz");
        tokio::fs::write(&archive, &bytes)
            .await
            .map_err(|err| InstallError::Io(format!("failed to write archive: {err}")))?;

        let extract = format!(
            "tar -xzf {} -C {}",
            sh_quote(&archive.to_string_lossy()),
            sh_quote(&dir.to_string_lossy())
        );
        let code = self
            .runner
            .run(&extract, None)
            .await
            .map_err(InstallError::Io)?;
        if code != 0 {
            return Err(InstallError::Io(format!(
                "failed to extract steamcmd archive: tar exited with code {code}"
            )));
        }
        let _ = tokio::fs::remove_file(&archive).await;

        // First run updates SteamCMD itself.
        let update = format!("{} +quit", sh_quote(&self.script_path().to_string_lossy()));
        let code = self
            .runner
            .run(&update, Some(dir))
            .await
            .map_err(InstallError::Io)?;
        if code != 0 {
            return Err(InstallError::Io(format!(
                "steamcmd self-update exited with code {code}"
            )));
        }

        info!("steamcmd installed at {}", dir.display());
        Ok(())
    }

    fn login_directive(&self, credentials: &Credentials) -> String {
        match credentials.username.as_deref() {
            None => "+login anonymous".to_string(),
            Some(username) => {
                let mut parts = vec!["+login".to_string(), sh_quote(username)];
                if let Some(password) = credentials.password.as_deref() {
                    parts.push(sh_quote(password));
                    if let Some(code) = credentials.guard_code.as_deref() {
                        parts.push(sh_quote(code));
                    }
                }
                parts.join(" ")
            }
        }
    }

    /// Install or update the dedicated server binary.
    pub async fn install_server(
        &self,
        credentials: &Credentials,
    ) -> Result<SteamOutcome, InstallError> {
        if !self.is_installed().await {
            return Err(InstallError::MissingSteamCmd(self.script_path()));
        }

        let command = format!(
            "{} +force_install_dir {} {} +app_update {SERVER_APP_ID} validate +quit",
            sh_quote(&self.script_path().to_string_lossy()),
            sh_quote(&self.paths.server_dir.to_string_lossy()),
            self.login_directive(credentials),
        );

        info!("installing server (app {SERVER_APP_ID})");
        let code = self
            .runner
            .run(&command, Some(&self.paths.steamcmd_dir))
            .await
            .map_err(InstallError::Io)?;
        Ok(SteamOutcome::from_exit_code(code))
    }

    /// Download one workshop item and link it into place under the mods
    /// directory. Content stays where SteamCMD put it; the server sees a
    /// stable `@Name` path through a directory symlink.
    pub async fn install_mod(
        &self,
        credentials: &Credentials,
        workshop_id: &str,
        mod_name: &str,
    ) -> Result<SteamOutcome, InstallError> {
        if !self.is_installed().await {
            return Err(InstallError::MissingSteamCmd(self.script_path()));
        }

        let command = format!(
            "{} +force_install_dir {} {} +workshop_download_item {WORKSHOP_APP_ID} {} +quit",
            sh_quote(&self.script_path().to_string_lossy()),
            sh_quote(&self.paths.server_dir.to_string_lossy()),
            self.login_directive(credentials),
            sh_quote(workshop_id),
        );

        info!("downloading workshop item {workshop_id} ({mod_name})");
        let code = self
            .runner
            .run(&command, Some(&self.paths.steamcmd_dir))
            .await
            .map_err(InstallError::Io)?;

        let outcome = SteamOutcome::from_exit_code(code);
        if outcome.is_success() {
            self.link_mod(workshop_id, mod_name).await?;
        }
        Ok(outcome)
    }

    pub fn workshop_content_dir(&self, workshop_id: &str) -> PathBuf {
        self.paths
            .server_dir
            .join("steamapps/workshop/content")
            .join(WORKSHOP_APP_ID)
            .join(workshop_id)
    }

    async fn link_mod(&self, workshop_id: &str, mod_name: &str) -> Result<(), InstallError> {
        let content = self.workshop_content_dir(workshop_id);
        if tokio::fs::metadata(&content).await.is_err() {
            return Err(InstallError::Io(format!(
                "workshop content for {workshop_id} not found at {}",
                content.display()
            )));
        }

        let target = self.paths.mods_dir.join(mod_name);
        remove_existing(&target).await?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                InstallError::Io(format!("failed to create {}: {err}", parent.display()))
            })?;
        }
        tokio::fs::symlink(&content, &target).await.map_err(|err| {
            InstallError::Io(format!(
                "failed to link {} -> {}: {err}",
                target.display(),
                content.display()
            ))
        })?;
        info!("linked {} -> {}", target.display(), content.display());
        Ok(())
    }

    /// Copy the mod's signing keys into the server's trusted-keys directory.
    /// Mods without a keys directory are fine; the copy is just skipped.
    pub async fn copy_mod_keys(&self, mod_name: &str) -> Result<usize, InstallError> {
        let mod_dir = self.paths.mods_dir.join(mod_name);
        let keys_dir = match find_keys_dir(&mod_dir).await {
            Some(dir) => dir,
            None => {
                info!("{mod_name} ships no keys directory, skipping key copy");
                return Ok(0);
            }
        };

        let server_keys = self.paths.server_dir.join("keys");
        let copied = crate::storage::copy_dir_files(&keys_dir, &server_keys)
            .await
            .map_err(InstallError::Io)?;
        info!("copied {copied} key(s) from {mod_name}");
        Ok(copied)
    }
}

async fn find_keys_dir(mod_dir: &Path) -> Option<PathBuf> {
    for name in ["keys", "Keys"] {
        let candidate = mod_dir.join(name);
        if let Ok(meta) = tokio::fs::metadata(&candidate).await {
            if meta.is_dir() {
                return Some(candidate);
            }
        }
    }
    None
}

async fn remove_existing(path: &Path) -> Result<(), InstallError> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(_) => return Ok(()),
    };
    let result = if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        // Covers plain files and stale symlinks.
        tokio::fs::remove_file(path).await
    };
    result.map_err(|err| InstallError::Io(format!("failed to remove {}: {err}", path.display())))
}
