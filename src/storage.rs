use crate::config::{ConfigError, RawConfig};
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "DAYZCTL_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "dayzctl.yaml";

/// Config file location: explicit CLI flag beats the environment override
/// beats the default name in the working directory.
pub fn config_path(cli_override: Option<PathBuf>, env_override: Option<String>) -> PathBuf {
    if let Some(path) = cli_override {
        return path;
    }
    if let Some(path) = env_override {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

pub async fn load_config(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| io_error(path, &err))?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Serialize and write the document atomically: write to a temp file next to
/// the target, then rename into place.
pub async fn save_config(path: &Path, config: &RawConfig) -> Result<(), ConfigError> {
    let data = serde_yaml::to_string(config)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| io_error(path, &err))?;
        }
    }

    let tmp_path = path.with_extension("yaml.tmp");
    tokio::fs::write(&tmp_path, data)
        .await
        .map_err(|err| io_error(&tmp_path, &err))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|err| io_error(path, &err))
}

fn io_error(path: &Path, err: &std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Shared write helper used by the generators and configurators: parent
/// directories are created as needed and existing content is overwritten.
pub async fn write_file(path: &Path, contents: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| format!("failed to create {}: {err}", parent.display()))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|err| format!("failed to write {}: {err}", path.display()))
}

/// Copy every regular file in `src` into `dst` (non-recursive). Returns the
/// number of files copied.
pub async fn copy_dir_files(src: &Path, dst: &Path) -> Result<usize, String> {
    tokio::fs::create_dir_all(dst)
        .await
        .map_err(|err| format!("failed to create {}: {err}", dst.display()))?;

    let mut entries = tokio::fs::read_dir(src)
        .await
        .map_err(|err| format!("failed to read {}: {err}", src.display()))?;

    let mut copied = 0usize;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| format!("failed to read {}: {err}", src.display()))?
    {
        let path = entry.path();
        let is_file = entry
            .file_type()
            .await
            .map(|kind| kind.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        let target = dst.join(entry.file_name());
        tokio::fs::copy(&path, &target)
            .await
            .map_err(|err| format!("failed to copy {}: {err}", path.display()))?;
        copied += 1;
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_file_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a/b/c.txt");

        write_file(&path, "hello").await.expect("write failed");
        let read = tokio::fs::read_to_string(&path).await.expect("read failed");
        assert_eq!(read, "hello");

        write_file(&path, "replaced").await.expect("rewrite failed");
        let read = tokio::fs::read_to_string(&path).await.expect("read failed");
        assert_eq!(read, "replaced");
    }

    #[tokio::test]
    async fn copy_dir_files_skips_subdirectories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("keys");
        let dst = dir.path().join("out");
        tokio::fs::create_dir_all(src.join("nested")).await.expect("mkdir");
        tokio::fs::write(src.join("mod.bikey"), b"key").await.expect("write");

        let copied = copy_dir_files(&src, &dst).await.expect("copy failed");
        assert_eq!(copied, 1);
        assert!(dst.join("mod.bikey").exists());
        assert!(!dst.join("nested").exists());
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dayzctl.yaml");

        let config = crate::config::starter_config();
        save_config(&path, &config).await.expect("save failed");
        let loaded = load_config(&path).await.expect("load failed");
        assert_eq!(loaded.server.name.as_deref(), Some("DayZ Server"));
        assert_eq!(loaded.server.port, Some(2302));
    }
}
