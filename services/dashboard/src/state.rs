//! Application state for the dashboard.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use monitor_common::FileKind;

use crate::config::DashboardConfig;
use crate::runner::ScriptRunner;
use crate::store::FileStore;
use crate::tracker::RunTracker;

/// Shared application state.
pub struct AppState {
    pub config: DashboardConfig,

    /// Uploaded scripts and data files.
    pub store: FileStore,

    pub runner: ScriptRunner,

    /// Active and recent script runs.
    pub tracker: RunTracker,

    /// Prometheus handle; `None` when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state from configuration, opening the file store.
    pub async fn new(config: DashboardConfig, metrics: Option<PrometheusHandle>) -> Result<Self> {
        config.validate()?;

        let store = FileStore::open(&config.storage, config.runner.script_extensions.clone())
            .await
            .with_context(|| {
                format!(
                    "Failed to open storage root: {}",
                    config.storage.root.display()
                )
            })?;
        let runner = ScriptRunner::new(&config.runner, store.root());

        tracing::debug!(
            data_dir = %store.dir(FileKind::Data).display(),
            scripts_dir = %store.dir(FileKind::Script).display(),
            interpreter = %runner.interpreter(),
            "Initialized dashboard state"
        );

        Ok(Self {
            config,
            store,
            runner,
            tracker: RunTracker::new(),
            metrics,
        })
    }
}
