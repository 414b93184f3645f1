use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

pub const ENV_STEAM_USERNAME: &str = "STEAM_USERNAME";
pub const ENV_STEAM_PASSWORD: &str = "STEAM_PASSWORD";
pub const ENV_STEAM_GUARD_CODE: &str = "STEAM_GUARD_CODE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("configuration invalid:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),
}

/// Configuration document as found on disk. Every field is optional so a
/// partial document can be merged over the built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    #[serde(default)]
    pub server: RawServerSettings,
    #[serde(default)]
    pub mods: Vec<ModEntry>,
    #[serde(default)]
    pub mod_configs: ModConfigs,
    #[serde(default)]
    pub paths: RawPaths,
    // Credentials may be supplied in the file but are never written back out.
    #[serde(default, skip_serializing)]
    pub credentials: RawCredentials,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RawServerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_players: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_port: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battl_eye: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_signatures: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motd: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_acceleration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub night_time_acceleration: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPaths {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steamcmd_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mods_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub guard_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModEntry {
    pub workshop_id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub client_required: bool,
    #[serde(default)]
    pub server_side: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_yaml::Value>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModConfigs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpp_admin_tools: Option<VppAdminToolsConfig>,
    // Blocks for mods without a dedicated configurator pass through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// On-disk format of the VPPAdminTools credentials file. The mod's own
/// releases have disagreed on whether it expects a plaintext password or a
/// precomputed digest, so the choice is explicit rather than silently picked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CredentialsFormat {
    #[default]
    Plaintext,
    Sha256,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VppAdminToolsConfig {
    #[serde(default)]
    pub super_admins: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub disable_password: bool,
    #[serde(default)]
    pub credentials_format: CredentialsFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_webhook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_log_webhook: Option<String>,
}

/// Fully resolved configuration: defaults merged in, bounds checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub mods: Vec<ModEntry>,
    pub mod_configs: ModConfigsResolved,
    pub paths: Paths,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub name: String,
    pub password: Option<String>,
    pub admin_password: String,
    pub max_players: u32,
    pub port: u32,
    pub query_port: u32,
    pub battl_eye: bool,
    pub verify_signatures: u32,
    pub persistence: bool,
    pub mission: String,
    pub motd: Vec<String>,
    pub time_acceleration: Option<f64>,
    pub night_time_acceleration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModConfigsResolved {
    pub vpp_admin_tools: Option<VppAdminToolsConfig>,
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    pub steamcmd_dir: PathBuf,
    pub server_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub mods_dir: PathBuf,
}

/// Steam login material. Resolved once per run and passed explicitly to the
/// components that need it; never persisted back into the config file.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub guard_code: Option<String>,
}

impl Credentials {
    pub fn is_anonymous(&self) -> bool {
        self.username.is_none()
    }
}

pub mod defaults {
    pub const SERVER_NAME: &str = "DayZ Server";
    pub const MAX_PLAYERS: u32 = 60;
    pub const PORT: u32 = 2302;
    pub const QUERY_PORT: u32 = 27016;
    pub const VERIFY_SIGNATURES: u32 = 2;
    pub const MISSION: &str = "dayzOffline.chernarusplus";
    pub const STEAMCMD_DIR: &str = "/opt/steamcmd";
    pub const SERVER_DIR: &str = "/opt/dayz-server";
    pub const PROFILES_DIR: &str = "/opt/dayz-server/profiles";
    pub const MODS_DIR: &str = "/opt/dayz-server";
}

/// Merge a raw document over the built-in defaults, overlay credentials from
/// the environment, and validate. Pure: no filesystem or process access.
///
/// All validation violations are collected and returned together so the
/// operator sees every problem in one pass.
pub fn resolve(
    raw: RawConfig,
    env: &HashMap<String, String>,
) -> Result<(ServerConfig, Credentials), ConfigError> {
    let server = ServerSettings {
        name: raw.server.name.unwrap_or_else(|| defaults::SERVER_NAME.to_string()),
        password: raw.server.password,
        admin_password: raw.server.admin_password.unwrap_or_default(),
        max_players: raw.server.max_players.unwrap_or(defaults::MAX_PLAYERS),
        port: raw.server.port.unwrap_or(defaults::PORT),
        query_port: raw.server.query_port.unwrap_or(defaults::QUERY_PORT),
        battl_eye: raw.server.battl_eye.unwrap_or(true),
        verify_signatures: raw
            .server
            .verify_signatures
            .unwrap_or(defaults::VERIFY_SIGNATURES),
        persistence: raw.server.persistence.unwrap_or(true),
        mission: raw.server.mission.unwrap_or_else(|| defaults::MISSION.to_string()),
        motd: raw.server.motd.unwrap_or_default(),
        time_acceleration: raw.server.time_acceleration,
        night_time_acceleration: raw.server.night_time_acceleration,
    };

    let paths = Paths {
        steamcmd_dir: raw
            .paths
            .steamcmd_dir
            .unwrap_or_else(|| defaults::STEAMCMD_DIR.to_string())
            .into(),
        server_dir: raw
            .paths
            .server_dir
            .unwrap_or_else(|| defaults::SERVER_DIR.to_string())
            .into(),
        profiles_dir: raw
            .paths
            .profiles_dir
            .unwrap_or_else(|| defaults::PROFILES_DIR.to_string())
            .into(),
        mods_dir: raw
            .paths
            .mods_dir
            .unwrap_or_else(|| defaults::MODS_DIR.to_string())
            .into(),
    };

    let config = ServerConfig {
        server,
        mods: raw.mods,
        mod_configs: ModConfigsResolved {
            vpp_admin_tools: raw.mod_configs.vpp_admin_tools,
            extra: raw.mod_configs.extra,
        },
        paths,
    };

    let violations = validate(&config);
    if !violations.is_empty() {
        return Err(ConfigError::Invalid(violations));
    }

    let credentials = resolve_credentials(&raw.credentials, env);
    Ok((config, credentials))
}

/// Environment always wins over file-supplied credentials, field by field.
pub fn resolve_credentials(file: &RawCredentials, env: &HashMap<String, String>) -> Credentials {
    let pick = |env_key: &str, from_file: &Option<String>| {
        env.get(env_key)
            .filter(|value| !value.is_empty())
            .cloned()
            .or_else(|| from_file.clone())
    };
    Credentials {
        username: pick(ENV_STEAM_USERNAME, &file.username),
        password: pick(ENV_STEAM_PASSWORD, &file.password),
        guard_code: pick(ENV_STEAM_GUARD_CODE, &file.guard_code),
    }
}

pub fn validate(config: &ServerConfig) -> Vec<String> {
    let mut violations = Vec::new();

    if config.server.name.trim().is_empty() {
        violations.push("server.name must not be empty".to_string());
    }
    if config.server.admin_password.trim().is_empty() {
        violations.push("server.adminPassword must not be empty".to_string());
    }
    if config.server.port < 1 || config.server.port > 65535 {
        violations.push(format!(
            "server.port must be between 1 and 65535, got {}",
            config.server.port
        ));
    }
    if config.server.max_players < 1 || config.server.max_players > 127 {
        violations.push(format!(
            "server.maxPlayers must be between 1 and 127, got {}",
            config.server.max_players
        ));
    }
    for (idx, entry) in config.mods.iter().enumerate() {
        if entry.workshop_id.trim().is_empty() {
            violations.push(format!("mods[{idx}].workshopId must not be empty"));
        }
        if entry.name.trim().is_empty() {
            violations.push(format!("mods[{idx}].name must not be empty"));
        }
    }

    violations
}

/// Starter document written by `dayzctl init`.
pub fn starter_config() -> RawConfig {
    RawConfig {
        server: RawServerSettings {
            name: Some(defaults::SERVER_NAME.to_string()),
            admin_password: Some("changeme".to_string()),
            max_players: Some(defaults::MAX_PLAYERS),
            port: Some(defaults::PORT),
            query_port: Some(defaults::QUERY_PORT),
            battl_eye: Some(true),
            verify_signatures: Some(defaults::VERIFY_SIGNATURES),
            persistence: Some(true),
            mission: Some(defaults::MISSION.to_string()),
            ..RawServerSettings::default()
        },
        ..RawConfig::default()
    }
}
