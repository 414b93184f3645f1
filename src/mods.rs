use crate::config::{Credentials, ServerConfig};
use crate::configurators::ConfiguratorRegistry;
use crate::steamcmd::{InstallError, SteamCmd, SteamOutcome};
use tracing::{debug, error, info};

/// Per-mod outcome within one batch install.
#[derive(Debug, Clone, PartialEq)]
pub struct ModOutcome {
    pub workshop_id: String,
    pub name: String,
    pub result: Result<(), String>,
}

/// Aggregate result of a batch install, so callers can tell "2 of 5 failed"
/// without reading logs.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ModOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_all_ok(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ModOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Install every configured mod in order, copying signing keys after each
/// successful download. A failing mod is recorded and the batch moves on;
/// only missing prerequisites (SteamCMD, credentials) abort up front.
pub async fn install_all(
    config: &ServerConfig,
    credentials: &Credentials,
    steam: &SteamCmd,
) -> Result<BatchReport, InstallError> {
    if config.mods.is_empty() {
        info!("no mods configured");
        return Ok(BatchReport::default());
    }
    if credentials.is_anonymous() {
        return Err(InstallError::MissingCredentials);
    }
    if !steam.is_installed().await {
        return Err(InstallError::MissingSteamCmd(steam.script_path()));
    }

    let mut report = BatchReport::default();
    for entry in &config.mods {
        let result = install_one(credentials, steam, &entry.workshop_id, &entry.name).await;
        if let Err(message) = &result {
            error!("failed to install {}: {message}", entry.name);
        }
        report.outcomes.push(ModOutcome {
            workshop_id: entry.workshop_id.clone(),
            name: entry.name.clone(),
            result,
        });
    }

    info!(
        "mod install finished: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(report)
}

async fn install_one(
    credentials: &Credentials,
    steam: &SteamCmd,
    workshop_id: &str,
    name: &str,
) -> Result<(), String> {
    let outcome = steam
        .install_mod(credentials, workshop_id, name)
        .await
        .map_err(|err| err.to_string())?;

    match outcome {
        SteamOutcome::Success => {
            steam
                .copy_mod_keys(name)
                .await
                .map_err(|err| err.to_string())?;
            info!("installed {name}");
            Ok(())
        }
        SteamOutcome::SecondFactorRequired => {
            Err("steam guard code required; set STEAM_GUARD_CODE and re-run".to_string())
        }
        SteamOutcome::Failure(code) => Err(format!("steamcmd exited with code {code}")),
    }
}

/// Dispatch each configured mod to its registered configurator. Mods without
/// one are a logged no-op.
pub async fn configure_all(config: &ServerConfig) -> Result<(), String> {
    let registry = ConfiguratorRegistry::new();
    for entry in &config.mods {
        match registry.lookup(&entry.name) {
            Some(configurator) => {
                info!("configuring {}", entry.name);
                configurator.configure(config).await?;
            }
            None => debug!("no configurator registered for {}", entry.name),
        }
    }
    Ok(())
}
