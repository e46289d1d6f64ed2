use research_core::{JobId, JobSnapshot, Phase};
use serde::{Deserialize, Serialize};

use crate::{ApiError, ControlReply, EngineConfig};

/// HTTP surface of the research server consumed by a session.
#[async_trait::async_trait]
pub trait ResearchApi: Send + Sync {
    async fn fetch_status(&self, job: &JobId) -> Result<JobSnapshot, ApiError>;

    async fn start_job(&self, job: &JobId, model: Option<&str>) -> Result<ControlReply, ApiError>;

    async fn stop_job(&self, job: &JobId) -> Result<ControlReply, ApiError>;
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    #[serde(default)]
    status: Option<String>,
    phase: Option<String>,
    files_scanned: u64,
    findings_count: u64,
    finalized: bool,
}

#[derive(Debug, Serialize)]
struct StartPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_dir: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ControlPayload {
    success: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

/// Parses a status response body into a snapshot.
pub fn parse_status(body: &str) -> Result<JobSnapshot, ApiError> {
    let payload: StatusPayload =
        serde_json::from_str(body).map_err(|err| ApiError::Malformed(err.to_string()))?;
    let phase = Phase::from_wire(payload.phase.as_deref())
        .map_err(|err| ApiError::Malformed(err.to_string()))?;
    Ok(JobSnapshot {
        phase,
        files_scanned: payload.files_scanned,
        findings_count: payload.findings_count,
        finalized: payload.finalized,
        executor_status: payload.status,
    })
}

fn parse_control(body: &str) -> Result<ControlReply, ApiError> {
    let payload: ControlPayload =
        serde_json::from_str(body).map_err(|err| ApiError::Malformed(err.to_string()))?;
    if !payload.success {
        return Err(ApiError::Rejected(payload.message));
    }
    Ok(ControlReply {
        status: payload.status,
        message: payload.message,
    })
}

#[derive(Debug, Clone)]
pub struct HttpResearchApi {
    client: reqwest::Client,
    config: EngineConfig,
}

impl HttpResearchApi {
    pub fn new(config: EngineConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(Self { client, config })
    }

    async fn read_body(response: reqwest::Response) -> Result<String, ApiError> {
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if status.is_success() {
            return Ok(body);
        }
        // FastAPI reports failures as {"detail": "..."}; surface that text when present.
        match serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| value.get("detail")?.as_str().map(ToOwned::to_owned))
        {
            Some(detail) if status.is_client_error() => Err(ApiError::Rejected(detail)),
            _ => Err(ApiError::HttpStatus(status.as_u16())),
        }
    }
}

#[async_trait::async_trait]
impl ResearchApi for HttpResearchApi {
    async fn fetch_status(&self, job: &JobId) -> Result<JobSnapshot, ApiError> {
        let url = self.config.agent_url(job, &["research", "status"])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status.as_u16()));
        }
        let body = response.text().await.map_err(map_reqwest_error)?;
        parse_status(&body)
    }

    async fn start_job(&self, job: &JobId, model: Option<&str>) -> Result<ControlReply, ApiError> {
        let url = self.config.agent_url(job, &["start-research"])?;
        let payload = StartPayload {
            model,
            project_dir: self.config.project_dir.as_deref(),
        };
        let body = serde_json::to_string(&payload)
            .map_err(|err| ApiError::Malformed(err.to_string()))?;
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        parse_control(&Self::read_body(response).await?)
    }

    async fn stop_job(&self, job: &JobId) -> Result<ControlReply, ApiError> {
        let url = self.config.agent_url(job, &["research", "stop"])?;
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        parse_control(&Self::read_body(response).await?)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout;
    }
    ApiError::Network(err.to_string())
}
