//! `research-watch` configuration file (RON).
//!
//! Every field is optional; missing fields take the engine defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use log::LevelFilter;
use research_core::EstimatorConfig;
use research_engine::{
    EngineConfig, DEFAULT_BASE_URL, DEFAULT_POLL_INTERVAL, DEFAULT_PUSH_IDLE_TIMEOUT,
    DEFAULT_RECONNECT_INITIAL, DEFAULT_RECONNECT_MAX, DEFAULT_REQUEST_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub base_url: String,
    pub push_base_url: Option<String>,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
    pub push_idle_timeout_ms: u64,
    pub scan_norm: u32,
    pub findings_norm: u32,
    pub documenting_fixed_point: f64,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let estimator = EstimatorConfig::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            push_base_url: None,
            poll_interval_ms: millis(DEFAULT_POLL_INTERVAL),
            request_timeout_ms: millis(DEFAULT_REQUEST_TIMEOUT),
            reconnect_initial_ms: millis(DEFAULT_RECONNECT_INITIAL),
            reconnect_max_ms: millis(DEFAULT_RECONNECT_MAX),
            push_idle_timeout_ms: millis(DEFAULT_PUSH_IDLE_TIMEOUT),
            scan_norm: estimator.scan_norm,
            findings_norm: estimator.findings_norm,
            documenting_fixed_point: estimator.documenting_fixed_point,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl WatchConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }

    pub fn log_level(&self) -> anyhow::Result<LevelFilter> {
        self.log_level
            .parse()
            .with_context(|| format!("unknown log level {:?}", self.log_level))
    }

    pub fn engine_config(&self, project_dir: Option<String>) -> anyhow::Result<EngineConfig> {
        anyhow::ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be greater than 0");
        anyhow::ensure!(self.request_timeout_ms > 0, "request_timeout_ms must be greater than 0");
        anyhow::ensure!(
            self.reconnect_initial_ms > 0,
            "reconnect_initial_ms must be greater than 0"
        );
        anyhow::ensure!(
            self.push_idle_timeout_ms > 0,
            "push_idle_timeout_ms must be greater than 0"
        );
        let base_url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid base_url {:?}", self.base_url))?;
        let push_base_url = self
            .push_base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .context("invalid push_base_url")?;

        Ok(EngineConfig {
            push_base_url,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            reconnect_initial: Duration::from_millis(self.reconnect_initial_ms),
            reconnect_max: Duration::from_millis(self.reconnect_max_ms.max(self.reconnect_initial_ms)),
            push_idle_timeout: Duration::from_millis(self.push_idle_timeout_ms),
            project_dir,
            estimator: EstimatorConfig {
                scan_norm: self.scan_norm,
                findings_norm: self.findings_norm,
                documenting_fixed_point: self.documenting_fixed_point,
            },
            ..EngineConfig::with_base_url(base_url)
        })
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
