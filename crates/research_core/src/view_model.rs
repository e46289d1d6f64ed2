use crate::{JobId, LogEntry, Phase, Reconciler};

/// Immutable snapshot of one session, published after every change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReconciledState {
    pub job_id: Option<JobId>,
    /// False until the first status response of the session has been applied.
    pub status_known: bool,
    pub phase: Phase,
    pub phase_label: &'static str,
    pub files_scanned: u64,
    pub findings_count: u64,
    pub finalized: bool,
    pub executor_status: Option<String>,
    pub current_tool: Option<String>,
    pub logs: Vec<LogEntry>,
    pub displayed_progress: f64,
    pub connection_healthy: bool,
    pub control_error: Option<String>,
}

impl ReconciledState {
    pub(crate) fn from_session(
        job_id: &JobId,
        reconciler: &Reconciler,
        control_error: Option<&str>,
    ) -> Self {
        let pulled = reconciler.pulled();
        let phase = pulled.map(|s| s.phase).unwrap_or_default();
        Self {
            job_id: Some(job_id.clone()),
            status_known: pulled.is_some(),
            phase,
            phase_label: phase.label(),
            files_scanned: pulled.map_or(0, |s| s.files_scanned),
            findings_count: pulled.map_or(0, |s| s.findings_count),
            finalized: pulled.is_some_and(|s| s.finalized),
            executor_status: pulled.and_then(|s| s.executor_status.clone()),
            current_tool: reconciler.current_tool().map(ToOwned::to_owned),
            logs: reconciler.logs().entries().to_vec(),
            displayed_progress: reconciler.displayed_progress(),
            connection_healthy: reconciler.connection_healthy(),
            control_error: control_error.map(ToOwned::to_owned),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.job_id.is_some()
    }
}
