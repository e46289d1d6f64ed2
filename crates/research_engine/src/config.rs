use std::time::Duration;

use research_core::{EstimatorConfig, JobId};
use url::Url;

use crate::{ApiError, PushError};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8888";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RECONNECT_INITIAL: Duration = Duration::from_secs(1);
pub const DEFAULT_RECONNECT_MAX: Duration = Duration::from_secs(30);
pub const DEFAULT_PUSH_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Root of the research server's HTTP API.
    pub base_url: Url,
    /// Explicit push endpoint root; derived from `base_url` when absent.
    pub push_base_url: Option<Url>,
    pub poll_interval: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
    /// A push connection silent for this long is treated as dropped.
    pub push_idle_timeout: Duration,
    /// Sent with start requests so the server can register an unknown project.
    pub project_dir: Option<String>,
    pub estimator: EstimatorConfig,
}

impl EngineConfig {
    /// Default timings and estimator for a server rooted at `base_url`.
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            push_base_url: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconnect_initial: DEFAULT_RECONNECT_INITIAL,
            reconnect_max: DEFAULT_RECONNECT_MAX,
            push_idle_timeout: DEFAULT_PUSH_IDLE_TIMEOUT,
            project_dir: None,
            estimator: EstimatorConfig::default(),
        }
    }

    /// `{base}/api/projects/{job}/agent/{tail...}`
    pub fn agent_url(&self, job: &JobId, tail: &[&str]) -> Result<Url, ApiError> {
        let mut segments = vec!["api", "projects", job.as_str(), "agent"];
        segments.extend_from_slice(tail);
        append_segments(&self.base_url, &segments).ok_or_else(|| {
            ApiError::InvalidUrl(format!("{} cannot carry a path", self.base_url))
        })
    }

    /// `ws(s)://{host}/ws/projects/{job}`
    pub fn push_url(&self, job: &JobId) -> Result<Url, PushError> {
        let root = match &self.push_base_url {
            Some(url) => url.clone(),
            None => websocket_root(&self.base_url)?,
        };
        append_segments(&root, &["ws", "projects", job.as_str()])
            .ok_or_else(|| PushError::InvalidUrl(format!("{root} cannot carry a path")))
    }
}

fn websocket_root(base: &Url) -> Result<Url, PushError> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(PushError::InvalidUrl(format!("unsupported scheme {other}"))),
    };
    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|()| PushError::InvalidUrl(base.to_string()))?;
    Ok(url)
}

fn append_segments(base: &Url, segments: &[&str]) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(segments);
    Some(url)
}
