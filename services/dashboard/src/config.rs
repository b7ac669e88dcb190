//! Dashboard configuration.
//!
//! Loaded from a YAML file (every field optional), then overridden by
//! `DASHBOARD_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use monitor_common::{MonitorError, MonitorResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Top-level dashboard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Listen address
    pub listen: String,
    pub storage: StorageConfig,
    pub runner: RunnerConfig,
    pub preview: PreviewConfig,
    pub chart: ChartConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8501".to_string(),
            storage: StorageConfig::default(),
            runner: RunnerConfig::default(),
            preview: PreviewConfig::default(),
            chart: ChartConfig::default(),
        }
    }
}

/// Where uploads are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root holding `scripts/` and `uploaded_data/`
    pub root: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            max_upload_bytes: 200 * 1024 * 1024,
        }
    }
}

/// How uploaded scripts are executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub interpreter: String,
    /// Extensions accepted for script uploads
    pub script_extensions: Vec<String>,
    /// Wall-clock limit per run; 0 disables it
    pub timeout_secs: u64,
    /// Cap applied separately to stdout and stderr
    pub max_output_bytes: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            script_extensions: vec!["py".to_string()],
            timeout_secs: 300,
            max_output_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub default_rows: usize,
    pub max_rows: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            default_rows: 100,
            max_rows: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: usize,
    pub height: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a YAML file, falling back to defaults if it is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: DashboardConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!(path = %path.display(), "Loaded dashboard configuration");
        Ok(config)
    }

    /// Apply `DASHBOARD_*` environment variable overrides.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(listen) = lookup("DASHBOARD_LISTEN") {
            self.listen = listen;
        }
        if let Some(root) = lookup("DASHBOARD_STORAGE_ROOT") {
            self.storage.root = PathBuf::from(root);
        }
        if let Some(interpreter) = lookup("DASHBOARD_INTERPRETER") {
            self.runner.interpreter = interpreter;
        }
        if let Some(secs) = lookup("DASHBOARD_TIMEOUT_SECS") {
            self.runner.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("Invalid DASHBOARD_TIMEOUT_SECS: {}", secs))?;
        }
        if let Some(bytes) = lookup("DASHBOARD_MAX_UPLOAD_BYTES") {
            self.storage.max_upload_bytes = bytes
                .trim()
                .parse()
                .with_context(|| format!("Invalid DASHBOARD_MAX_UPLOAD_BYTES: {}", bytes))?;
        }
        Ok(self)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> MonitorResult<()> {
        if self.runner.interpreter.trim().is_empty() {
            return Err(MonitorError::ConfigError(
                "runner.interpreter must not be empty".to_string(),
            ));
        }
        if self.runner.script_extensions.is_empty() {
            return Err(MonitorError::ConfigError(
                "runner.script_extensions must list at least one extension".to_string(),
            ));
        }
        if self.preview.default_rows > self.preview.max_rows {
            return Err(MonitorError::ConfigError(format!(
                "preview.default_rows ({}) exceeds preview.max_rows ({})",
                self.preview.default_rows, self.preview.max_rows
            )));
        }
        let min = renderer::chart::MIN_CHART_SIZE;
        if self.chart.width < min || self.chart.height < min {
            return Err(MonitorError::ConfigError(format!(
                "chart size must be at least {}x{}",
                min, min
            )));
        }
        Ok(())
    }
}
