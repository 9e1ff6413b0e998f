//! Application configuration layered from defaults, a TOML file and the environment.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{models::Locale, query::DEFAULT_PAGE_SIZE};

/// Prefix for environment overrides, e.g. `BACKLOG__DRIVE__ACCESS_TOKEN`.
pub const ENV_PREFIX: &str = "BACKLOG";

const DEFAULT_CONFIG: &str = r#"# Backlog configuration.
# Every key can be overridden with BACKLOG__<SECTION>__<KEY> environment variables.

# Where the game collection and backup manifest are stored.
# data_dir = "/home/me/.local/share/backlog"

# Interface language: "es" or "en".
locale = "es"

# Records per list page.
page_size = 9

[drive]
api_base = "https://www.googleapis.com/drive/v3"
upload_base = "https://www.googleapis.com/upload/drive/v3"
file_name = "gametracker-backup.json"
# OAuth access token with the drive.appdata scope, obtained by your sign-in flow.
# access_token = "ya29..."
"#;

/// Remote backup settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriveConfig {
    /// Drive v3 metadata endpoint.
    pub api_base: String,
    /// Drive v3 upload endpoint.
    pub upload_base: String,
    /// Name of the backup file inside the app data folder.
    pub file_name: String,
    /// Bearer token; backups are unavailable without it.
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Resolved configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Directory holding the collection slot and the backup manifest.
    pub data_dir: PathBuf,
    /// Interface and export language.
    pub locale: Locale,
    /// Records per list page.
    pub page_size: usize,
    /// Remote backup settings.
    pub drive: DriveConfig,
}

impl AppConfig {
    /// Load from the user config file and `BACKLOG__*` environment variables.
    pub fn load() -> Result<Self> {
        let path = config_path();
        Self::build(path.as_deref(), Environment::with_prefix(ENV_PREFIX))
    }

    /// Load from an explicit file, still honouring environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::build(Some(path.as_ref()), Environment::with_prefix(ENV_PREFIX))
    }

    fn build(file: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("data_dir", default_data_dir().display().to_string())?
            .set_default("locale", Locale::default().code())?
            .set_default("page_size", DEFAULT_PAGE_SIZE as i64)?
            .set_default("drive.api_base", "https://www.googleapis.com/drive/v3")?
            .set_default("drive.upload_base", "https://www.googleapis.com/upload/drive/v3")?
            .set_default("drive.file_name", "gametracker-backup.json")?;

        if let Some(file) = file {
            builder = builder.add_source(
                File::from(file.to_path_buf())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let mut config: AppConfig = builder
            .add_source(env.separator("__").try_parsing(true))
            .build()
            .context("failed to assemble configuration")?
            .try_deserialize()
            .context("failed to parse configuration")?;

        config.page_size = config.page_size.max(1);
        config.drive.access_token = config
            .drive
            .access_token
            .take()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        Ok(config)
    }
}

/// Location of the user configuration file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("backlog").join("config.toml"))
}

/// Platform data directory, falling back to the working directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("backlog"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Write the commented default configuration if no file exists yet.
pub fn ensure_default_config() -> Result<()> {
    let Some(path) = config_path() else {
        return Ok(());
    };
    write_default_config(&path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn defaults_apply_without_file() {
        let config = AppConfig::build(None, env(&[])).expect("config");
        assert_eq!(config.locale, Locale::Es);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.drive.file_name, "gametracker-backup.json");
        assert!(config.drive.access_token.is_none());
    }

    #[test]
    fn default_file_parses() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("backlog").join("config.toml");
        write_default_config(&path).expect("write");
        let config = AppConfig::build(Some(&path), env(&[])).expect("config");
        assert_eq!(config.page_size, 9);
        assert_eq!(config.drive.api_base, "https://www.googleapis.com/drive/v3");
    }

    #[test]
    fn existing_file_is_not_overwritten() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "locale = \"en\"\n").expect("write");
        write_default_config(&path).expect("noop");
        assert_eq!(fs::read_to_string(&path).expect("read"), "locale = \"en\"\n");
    }

    #[test]
    fn file_then_environment_override() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "locale = \"en\"\npage_size = 0\ndata_dir = \"/tmp/games\"\n[drive]\naccess_token = \"  \"\n",
        )
        .expect("write");

        let config = AppConfig::build(Some(&path), env(&[])).expect("config");
        assert_eq!(config.locale, Locale::En);
        assert_eq!(config.page_size, 1);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/games"));
        assert!(config.drive.access_token.is_none());

        let config = AppConfig::build(
            Some(&path),
            env(&[
                ("BACKLOG__LOCALE", "es"),
                ("BACKLOG__DRIVE__ACCESS_TOKEN", "token-123"),
            ]),
        )
        .expect("config");
        assert_eq!(config.locale, Locale::Es);
        assert_eq!(config.drive.access_token.as_deref(), Some("token-123"));
    }
}
