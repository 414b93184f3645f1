use dayzctl::config::{
    resolve, resolve_credentials, RawConfig, RawCredentials, ENV_STEAM_PASSWORD,
    ENV_STEAM_USERNAME,
};
use std::collections::HashMap;

fn full_document() -> RawConfig {
    serde_yaml::from_str(
        r#"
server:
  name: "Namalsk Winter"
  password: "join"
  adminPassword: "admin"
  maxPlayers: 42
  port: 2402
  queryPort: 27017
  battlEye: false
  verifySignatures: 1
  persistence: false
  mission: "hardcore.namalsk"
  motd:
    - "welcome"
    - "no cheating"
  timeAcceleration: 4.0
mods:
  - workshopId: "1559212036"
    name: "@CF"
  - workshopId: "1828439124"
    name: "@VPPAdminTools"
    serverSide: true
modConfigs:
  vppAdminTools:
    superAdmins: ["76561198000000001"]
    password: "vpp"
paths:
  steamcmdDir: /tmp/steamcmd
  serverDir: /tmp/server
  profilesDir: /tmp/server/profiles
  modsDir: /tmp/server
"#,
    )
    .expect("yaml parse failed")
}

#[test]
fn camel_case_document_maps_onto_the_model() {
    let raw = full_document();
    assert_eq!(raw.server.name.as_deref(), Some("Namalsk Winter"));
    assert_eq!(raw.server.max_players, Some(42));
    assert_eq!(raw.server.battl_eye, Some(false));
    assert_eq!(raw.mods.len(), 2);
    assert!(raw.mods[1].server_side);
    assert!(raw.mod_configs.vpp_admin_tools.is_some());
}

#[test]
fn resolution_is_idempotent_for_a_full_document() {
    let env = HashMap::new();
    let (first, _) = resolve(full_document(), &env).expect("resolve failed");
    let (second, _) = resolve(full_document(), &env).expect("resolve failed");
    assert_eq!(first, second);
    // Nothing was replaced by a default.
    assert_eq!(first.server.name, "Namalsk Winter");
    assert_eq!(first.server.port, 2402);
    assert_eq!(first.server.mission, "hardcore.namalsk");
}

#[test]
fn all_violations_are_collected_not_short_circuited() {
    let raw: RawConfig = serde_yaml::from_str(
        r#"
server:
  name: ""
  maxPlayers: 500
  port: 0
mods:
  - workshopId: ""
    name: ""
"#,
    )
    .expect("yaml parse failed");

    let err = resolve(raw, &HashMap::new()).unwrap_err();
    let violations = match err {
        dayzctl::config::ConfigError::Invalid(violations) => violations,
        other => panic!("unexpected error: {other}"),
    };

    assert!(violations.iter().any(|v| v.contains("server.name")));
    assert!(violations.iter().any(|v| v.contains("adminPassword")));
    assert!(violations.iter().any(|v| v.contains("server.port")));
    assert!(violations.iter().any(|v| v.contains("maxPlayers")));
    assert!(violations.iter().any(|v| v.contains("mods[0].workshopId")));
    assert!(violations.iter().any(|v| v.contains("mods[0].name")));
    assert_eq!(violations.len(), 6);
}

#[test]
fn environment_credentials_override_file_credentials() {
    let file = RawCredentials {
        username: Some("file-user".to_string()),
        password: Some("file-pass".to_string()),
        guard_code: None,
    };

    let mut env = HashMap::new();
    env.insert(ENV_STEAM_USERNAME.to_string(), "env-user".to_string());

    let creds = resolve_credentials(&file, &env);
    // Env wins where set, file fills the rest.
    assert_eq!(creds.username.as_deref(), Some("env-user"));
    assert_eq!(creds.password.as_deref(), Some("file-pass"));
    assert_eq!(creds.guard_code, None);
}

#[test]
fn credential_sources_cover_all_present_absent_combinations() {
    let cases = [
        (None, None, None),
        (Some("file"), None, Some("file")),
        (None, Some("env"), Some("env")),
        (Some("file"), Some("env"), Some("env")),
    ];
    for (file_value, env_value, expected) in cases {
        let file = RawCredentials {
            password: file_value.map(str::to_string),
            ..RawCredentials::default()
        };
        let mut env = HashMap::new();
        if let Some(value) = env_value {
            env.insert(ENV_STEAM_PASSWORD.to_string(), value.to_string());
        }
        let creds = resolve_credentials(&file, &env);
        assert_eq!(creds.password.as_deref(), expected);
    }
}

#[test]
fn empty_environment_values_do_not_shadow_file_values() {
    let file = RawCredentials {
        username: Some("file-user".to_string()),
        ..RawCredentials::default()
    };
    let mut env = HashMap::new();
    env.insert(ENV_STEAM_USERNAME.to_string(), String::new());

    let creds = resolve_credentials(&file, &env);
    assert_eq!(creds.username.as_deref(), Some("file-user"));
}

#[test]
fn saved_documents_never_contain_credentials() {
    let mut raw = full_document();
    raw.credentials.username = Some("leaky".to_string());
    raw.credentials.password = Some("secret".to_string());

    let serialized = serde_yaml::to_string(&raw).expect("serialize failed");
    assert!(!serialized.contains("leaky"));
    assert!(!serialized.contains("credentials"));
}
