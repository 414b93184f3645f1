use crate::config::ServerConfig;
use crate::steamcmd::{build_mod_string, build_server_mod_string};
use crate::storage::write_file;
use std::path::PathBuf;
use tracing::info;

pub const SERVER_CFG_NAME: &str = "serverDZ.cfg";
pub const START_SCRIPT_NAME: &str = "start_server.sh";
const SERVER_BINARY: &str = "./DayZServer";

pub fn server_cfg_path(config: &ServerConfig) -> PathBuf {
    config.paths.server_dir.join(SERVER_CFG_NAME)
}

pub fn start_script_path(config: &ServerConfig) -> PathBuf {
    config.paths.server_dir.join(START_SCRIPT_NAME)
}

/// Render the primary server configuration file: `key = value;` statements
/// in the order the stock serverDZ.cfg lists them.
pub fn render_server_cfg(config: &ServerConfig) -> String {
    let server = &config.server;
    let mut out = String::new();

    push_str_directive(&mut out, "hostname", &server.name);
    push_str_directive(&mut out, "password", server.password.as_deref().unwrap_or(""));
    push_str_directive(&mut out, "passwordAdmin", &server.admin_password);
    push_directive(&mut out, "maxPlayers", &server.max_players.to_string());
    push_directive(
        &mut out,
        "verifySignatures",
        &server.verify_signatures.to_string(),
    );
    push_directive(&mut out, "BattlEye", bool_flag(server.battl_eye));
    push_directive(&mut out, "persistent", bool_flag(server.persistence));
    push_directive(&mut out, "steamQueryPort", &server.query_port.to_string());

    if !server.motd.is_empty() {
        let lines = server
            .motd
            .iter()
            .map(|line| format!("\"{}\"", line.replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("motd[] = {{ {lines} }};\n"));
    }

    if let Some(factor) = server.time_acceleration {
        push_directive(&mut out, "timeAcceleration", &format_factor(factor));
    }
    if let Some(factor) = server.night_time_acceleration {
        push_directive(&mut out, "nightTimeAcceleration", &format_factor(factor));
    }

    out.push_str("\nclass Missions\n{\n    class DayZ\n    {\n");
    out.push_str(&format!("        template = \"{}\";\n", server.mission));
    out.push_str("    };\n};\n");

    out
}

/// Render the startup script the supervisor launches. Mod arguments are
/// quoted as a whole because mod names may contain spaces.
pub fn render_start_script(config: &ServerConfig) -> String {
    let mut out = String::from("#!/bin/sh\n");

    let mut args = vec![
        format!("-config={SERVER_CFG_NAME}"),
        format!("-port={}", config.server.port),
        format!("-profiles={}", config.paths.profiles_dir.display()),
    ];

    let mods = build_mod_string(&config.mods);
    if !mods.is_empty() {
        args.push(format!("\"-mod={mods}\""));
    }
    let server_mods = build_server_mod_string(&config.mods);
    if !server_mods.is_empty() {
        args.push(format!("\"-servermod={server_mods}\""));
    }

    args.push("-dologs".to_string());
    args.push("-adminlog".to_string());
    args.push("-freezecheck".to_string());

    out.push_str(&format!("exec {SERVER_BINARY} {}\n", args.join(" ")));
    out
}

/// Write serverDZ.cfg and the startup script into the server directory.
pub async fn generate(config: &ServerConfig) -> Result<(), String> {
    let cfg_path = server_cfg_path(config);
    write_file(&cfg_path, &render_server_cfg(config)).await?;
    info!("wrote {}", cfg_path.display());

    let script_path = start_script_path(config);
    write_file(&script_path, &render_start_script(config)).await?;
    make_executable(&script_path).await?;
    info!("wrote {}", script_path.display());

    Ok(())
}

async fn make_executable(path: &std::path::Path) -> Result<(), String> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o755);
    tokio::fs::set_permissions(path, perms)
        .await
        .map_err(|err| format!("failed to chmod {}: {err}", path.display()))
}

/// Replace a `key = 0;` / `key = 1;` directive in place, or append one with a
/// comment when the file carries no such line yet.
pub fn patch_directive(text: &str, key: &str, value: &str) -> String {
    let off = format!("{key} = 0;");
    let on = format!("{key} = 1;");

    let mut replaced = false;
    let mut lines: Vec<String> = text
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed == off || trimmed == on {
                replaced = true;
                format!("{key} = {value};")
            } else {
                line.to_string()
            }
        })
        .collect();

    if !replaced {
        lines.push(format!("// {key} managed by mod configuration"));
        lines.push(format!("{key} = {value};"));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn push_directive(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!("{key} = {value};\n"));
}

fn push_str_directive(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!("{key} = \"{}\";\n", value.replace('"', "\\\"")));
}

fn bool_flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn format_factor(factor: f64) -> String {
    if factor.fract() == 0.0 {
        format!("{factor:.1}")
    } else {
        factor.to_string()
    }
}
