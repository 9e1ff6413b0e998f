mod app;
mod form;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::Mutex,
};

use backlog_core::{
    config::{self, AppConfig},
    store::{FileSlot, GameStore},
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;
    init_logging(&config.data_dir)?;

    let store = GameStore::open(FileSlot::in_dir(&config.data_dir));
    info!(
        data_dir = %config.data_dir.display(),
        games = store.len(),
        "collection loaded"
    );

    let mut app = app::BacklogApp::new(store, config);
    app.run().await
}

fn log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("logs").join("backlog.log")
}

fn init_logging(data_dir: &Path) -> Result<()> {
    let log_path = log_path(data_dir);
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("failed to create {}", log_dir.display()))?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal belongs to the UI, so events only go to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_lives_under_configured_data_dir() {
        let data_dir = PathBuf::from("/srv/backlog-data");
        assert_eq!(
            log_path(&data_dir),
            PathBuf::from("/srv/backlog-data/logs/backlog.log")
        );
    }
}
