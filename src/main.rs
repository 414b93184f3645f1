use clap::{Parser, Subcommand};
use colored::Colorize;
use dayzctl::config::{self, Credentials, ServerConfig};
use dayzctl::config_gen;
use dayzctl::mods;
use dayzctl::runner;
use dayzctl::steamcmd::{ShellRunner, SteamCmd, SteamOutcome};
use dayzctl::storage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "dayzctl", version, about = "DayZ dedicated server installer and supervisor")]
struct Cli {
    /// Configuration file (falls back to $DAYZCTL_CONFIG, then ./dayzctl.yaml)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init,
    /// Check the configuration and report every violation
    Validate,
    /// Full pipeline: steamcmd, server, mods, config generation
    Install,
    /// Install SteamCMD only
    InstallSteamcmd,
    /// Install or update the server binary only
    InstallServer,
    /// Install or update workshop mods only
    InstallMods,
    /// Generate serverDZ.cfg, the start script, and mod config fragments
    Configure,
    /// Update server and mods, then regenerate configuration
    Update,
    /// Full pipeline, then run the server under supervision
    Start,
    /// Open a shell in the server directory
    Shell,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(message) => {
            eprintln!("{}", message.red());
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32, String> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let config_path = storage::config_path(cli.config, env.get(storage::ENV_CONFIG_PATH).cloned());

    if let Commands::Init = cli.command {
        storage::save_config(&config_path, &config::starter_config())
            .await
            .map_err(|err| err.to_string())?;
        println!("{}", format!("wrote {}", config_path.display()).green());
        return Ok(0);
    }

    let raw = storage::load_config(&config_path)
        .await
        .map_err(|err| err.to_string())?;
    let (config, credentials) = match config::resolve(raw, &env) {
        Ok(resolved) => resolved,
        Err(config::ConfigError::Invalid(violations)) => {
            eprintln!("{}", "configuration invalid:".red());
            for violation in violations {
                eprintln!("  {}", violation.red());
            }
            return Ok(1);
        }
        Err(err) => return Err(err.to_string()),
    };

    let steam = SteamCmd::new(config.paths.clone(), Arc::new(ShellRunner));

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Validate => {
            println!("{}", format!("{} is valid", config_path.display()).green());
            Ok(0)
        }
        Commands::InstallSteamcmd => {
            ensure_steamcmd(&steam).await?;
            Ok(0)
        }
        Commands::InstallServer => install_server(&steam, &credentials).await,
        Commands::InstallMods => {
            let code = install_mods(&config, &credentials, &steam).await?;
            if code == 0 {
                mods::configure_all(&config).await?;
            }
            Ok(code)
        }
        Commands::Configure => {
            configure(&config).await?;
            Ok(0)
        }
        Commands::Install => install_pipeline(&config, &credentials, &steam).await,
        Commands::Update => {
            let code = install_server(&steam, &credentials).await?;
            if code != 0 {
                return Ok(code);
            }
            let code = install_mods(&config, &credentials, &steam).await?;
            configure(&config).await?;
            Ok(code)
        }
        Commands::Start => {
            let code = install_pipeline(&config, &credentials, &steam).await?;
            if code != 0 {
                return Ok(code);
            }
            start(&config).await
        }
        Commands::Shell => shell(&config).await,
    }
}

/// Install SteamCMD when it is not already present.
async fn ensure_steamcmd(steam: &SteamCmd) -> Result<(), String> {
    if steam.is_installed().await {
        info!("steamcmd already installed");
        return Ok(());
    }
    steam.install().await.map_err(|err| err.to_string())?;
    println!("{}", "steamcmd installed".green());
    Ok(())
}

async fn install_server(steam: &SteamCmd, credentials: &Credentials) -> Result<i32, String> {
    let outcome = steam
        .install_server(credentials)
        .await
        .map_err(|err| err.to_string())?;
    Ok(report_outcome(&outcome, "server install"))
}

async fn install_mods(
    config: &ServerConfig,
    credentials: &Credentials,
    steam: &SteamCmd,
) -> Result<i32, String> {
    let report = mods::install_all(config, credentials, steam)
        .await
        .map_err(|err| err.to_string())?;

    for failure in report.failures() {
        eprintln!(
            "{}",
            format!(
                "{} ({}): {}",
                failure.name,
                failure.workshop_id,
                failure.result.as_ref().unwrap_err()
            )
            .red()
        );
    }
    if report.is_all_ok() {
        if !report.outcomes.is_empty() {
            println!("{}", format!("{} mod(s) installed", report.succeeded()).green());
        }
        Ok(0)
    } else {
        eprintln!(
            "{}",
            format!("{} of {} mod(s) failed", report.failed(), report.outcomes.len()).red()
        );
        Ok(1)
    }
}

async fn configure(config: &ServerConfig) -> Result<(), String> {
    config_gen::generate(config).await?;
    mods::configure_all(config).await?;
    println!("{}", "server configuration generated".green());
    Ok(())
}

/// The full install pipeline: prerequisites fail fast, then mods, then the
/// generated files, then a second configurator pass for settings that patch
/// the generated files.
async fn install_pipeline(
    config: &ServerConfig,
    credentials: &Credentials,
    steam: &SteamCmd,
) -> Result<i32, String> {
    ensure_steamcmd(steam).await?;

    let code = install_server(steam, credentials).await?;
    if code != 0 {
        return Ok(code);
    }

    let code = install_mods(config, credentials, steam).await?;
    if code != 0 {
        return Ok(code);
    }
    mods::configure_all(config).await?;

    configure(config).await?;
    Ok(0)
}

async fn start(config: &ServerConfig) -> Result<i32, String> {
    let script = config_gen::start_script_path(config);
    runner::supervise(&script, &config.paths.server_dir)
        .await
        .map_err(|err| err.to_string())
}

async fn shell(config: &ServerConfig) -> Result<i32, String> {
    let status = tokio::process::Command::new("bash")
        .current_dir(&config.paths.server_dir)
        .status()
        .await
        .map_err(|err| format!("failed to start shell: {err}"))?;
    Ok(status.code().unwrap_or(0))
}

fn report_outcome(outcome: &SteamOutcome, what: &str) -> i32 {
    match outcome {
        SteamOutcome::Success => {
            println!("{}", format!("{what} complete").green());
            0
        }
        SteamOutcome::SecondFactorRequired => {
            eprintln!("{}", format!("{what} needs a Steam Guard code").yellow());
            eprintln!("{}", "  1. check your email or authenticator for the code".yellow());
            eprintln!("{}", "  2. export STEAM_GUARD_CODE=<code>".yellow());
            eprintln!("{}", "  3. re-run the command".yellow());
            1
        }
        SteamOutcome::Failure(code) => {
            eprintln!("{}", format!("{what} failed: steamcmd exited with code {code}").red());
            1
        }
    }
}
