#![allow(dead_code)]

use async_trait::async_trait;
use dayzctl::config::{
    Credentials, ModConfigsResolved, ModEntry, Paths, ServerConfig, ServerSettings,
};
use dayzctl::steamcmd::CommandRunner;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

/// Records every command and answers with a canned exit code chosen by
/// substring match (first match wins, default 0).
pub struct MockRunner {
    commands: Mutex<Vec<String>>,
    exit_codes: Vec<(String, i32)>,
}

impl MockRunner {
    pub fn ok() -> Self {
        Self::with_exit_codes(&[])
    }

    pub fn with_exit_codes(codes: &[(&str, i32)]) -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            exit_codes: codes
                .iter()
                .map(|(needle, code)| (needle.to_string(), *code))
                .collect(),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().expect("lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.commands.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, command: &str, _cwd: Option<&Path>) -> Result<i32, String> {
        self.commands
            .lock()
            .expect("lock poisoned")
            .push(command.to_string());
        for (needle, code) in &self.exit_codes {
            if command.contains(needle.as_str()) {
                return Ok(*code);
            }
        }
        Ok(0)
    }
}

pub fn test_paths(base: &Path) -> Paths {
    Paths {
        steamcmd_dir: base.join("steamcmd"),
        server_dir: base.join("server"),
        profiles_dir: base.join("server/profiles"),
        mods_dir: base.join("server"),
    }
}

pub fn test_config(base: &Path, mods: Vec<ModEntry>) -> ServerConfig {
    ServerConfig {
        server: ServerSettings {
            name: "Test Server".to_string(),
            password: None,
            admin_password: "secret".to_string(),
            max_players: 60,
            port: 2302,
            query_port: 27016,
            battl_eye: true,
            verify_signatures: 2,
            persistence: true,
            mission: "dayzOffline.chernarusplus".to_string(),
            motd: Vec::new(),
            time_acceleration: None,
            night_time_acceleration: None,
        },
        mods,
        mod_configs: ModConfigsResolved {
            vpp_admin_tools: None,
            extra: BTreeMap::new(),
        },
        paths: test_paths(base),
    }
}

pub fn mod_entry(workshop_id: &str, name: &str, server_side: bool) -> ModEntry {
    ModEntry {
        workshop_id: workshop_id.to_string(),
        name: name.to_string(),
        client_required: !server_side,
        server_side,
        config: None,
    }
}

pub fn steam_credentials() -> Credentials {
    Credentials {
        username: Some("steamuser".to_string()),
        password: Some("hunter2".to_string()),
        guard_code: None,
    }
}

/// Lay down a fake steamcmd.sh so `is_installed` passes.
pub async fn fake_steamcmd(paths: &Paths) {
    tokio::fs::create_dir_all(&paths.steamcmd_dir)
        .await
        .expect("mkdir steamcmd");
    tokio::fs::write(paths.steamcmd_dir.join("steamcmd.sh"), "#!/bin/sh\n")
        .await
        .expect("write steamcmd.sh");
}

/// Pre-create the workshop content directory SteamCMD would have downloaded
/// into, optionally with a signing key inside a `keys` subdirectory.
pub async fn fake_workshop_content(paths: &Paths, workshop_id: &str, with_key: Option<&str>) {
    let content = paths
        .server_dir
        .join("steamapps/workshop/content/221100")
        .join(workshop_id);
    tokio::fs::create_dir_all(&content).await.expect("mkdir content");
    if let Some(key_name) = with_key {
        let keys = content.join("keys");
        tokio::fs::create_dir_all(&keys).await.expect("mkdir keys");
        tokio::fs::write(keys.join(key_name), b"key material")
            .await
            .expect("write key");
    }
}
