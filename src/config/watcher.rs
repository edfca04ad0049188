//! Configuration file watcher for hot reload.
//!
//! Watches the parent directory rather than the file itself so that editors
//! which save by rename are still noticed.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::MonitorConfig;

pub struct ConfigWatcher {
    path: PathBuf,
    current: MonitorConfig,
    update_tx: mpsc::UnboundedSender<MonitorConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver that yields each changed, valid
    /// configuration. `current` is the configuration already in effect.
    pub fn new(
        path: &Path,
        current: MonitorConfig,
    ) -> (Self, mpsc::UnboundedReceiver<MonitorConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            current,
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut current,
            update_tx,
        } = self;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let target = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_config = (event.kind.is_modify() || event.kind.is_create())
                        && event.paths.iter().any(|p| p.file_name() == target.file_name());
                    if !touches_config {
                        return;
                    }
                    if let Some(new_config) = reload(&target, &mut current) {
                        let _ = update_tx.send(new_config);
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

/// Load `path` and return it when it is valid and differs from `current`.
fn reload(path: &Path, current: &mut MonitorConfig) -> Option<MonitorConfig> {
    match load_config(path) {
        Ok(new_config) if new_config == *current => {
            tracing::debug!(path = ?path, "Config file touched without changes");
            None
        }
        Ok(new_config) => {
            tracing::info!(
                environments = new_config.environments.len(),
                "Configuration reloaded"
            );
            *current = new_config.clone();
            Some(new_config)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            None
        }
    }
}
