use std::fmt;

use watch_logging::{watch_debug, watch_info};

use crate::view_model::ReconciledState;
use crate::{Applied, Arrival, Effect, EstimatorConfig, Reconciler};

/// Incremented on every attach and detach; arrivals from an older generation are dropped.
pub type Generation = u64;
/// Strictly increasing per pull request within one generation.
pub type RequestSeq = u64;

/// Identifier of the observed job (the project name on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Attachment {
    job_id: JobId,
    reconciler: Reconciler,
    last_applied_pull: Option<RequestSeq>,
    control_error: Option<String>,
}

impl Attachment {
    fn new(job_id: JobId, config: EstimatorConfig) -> Self {
        Self {
            job_id,
            reconciler: Reconciler::new(config),
            last_applied_pull: None,
            control_error: None,
        }
    }
}

/// Session lifecycle: `Detached -> Attached(job) -> Detached`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    config: EstimatorConfig,
    generation: Generation,
    attachment: Option<Attachment>,
    dirty: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

impl SessionState {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            generation: 0,
            attachment: None,
            dirty: false,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.attachment.as_ref().map(|a| &a.job_id)
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    pub fn view(&self) -> ReconciledState {
        match &self.attachment {
            Some(attachment) => ReconciledState::from_session(
                &attachment.job_id,
                &attachment.reconciler,
                attachment.control_error.as_deref(),
            ),
            None => ReconciledState::default(),
        }
    }

    /// Returns whether anything visible changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn attach(&mut self, job_id: JobId) -> Vec<Effect> {
        if self.job_id() == Some(&job_id) {
            return Vec::new();
        }

        let mut effects = Vec::with_capacity(2);
        if let Some(previous) = self.attachment.take() {
            watch_info!("Switching session from {} to {}", previous.job_id, job_id);
            effects.push(Effect::CloseChannels {
                generation: self.generation,
            });
        }

        self.generation += 1;
        watch_info!("Attached to {} (generation {})", job_id, self.generation);
        self.attachment = Some(Attachment::new(job_id.clone(), self.config));
        self.dirty = true;
        effects.push(Effect::OpenChannels {
            job_id,
            generation: self.generation,
        });
        effects
    }

    pub(crate) fn detach(&mut self) -> Vec<Effect> {
        let Some(previous) = self.attachment.take() else {
            return Vec::new();
        };
        let closed = self.generation;
        self.generation += 1;
        self.dirty = true;
        watch_info!("Detached from {} (generation {})", previous.job_id, closed);
        vec![Effect::CloseChannels { generation: closed }]
    }

    pub(crate) fn apply_pulled(&mut self, generation: Generation, request: RequestSeq, arrival: Arrival) {
        let Some(attachment) = self.current_attachment(generation) else {
            return;
        };
        if attachment.last_applied_pull.is_some_and(|last| request <= last) {
            watch_debug!(
                "Dropping stale status response #{} (already applied #{:?})",
                request,
                attachment.last_applied_pull
            );
            return;
        }
        attachment.last_applied_pull = Some(request);
        let applied = attachment.reconciler.apply(arrival);
        self.mark_if_changed(applied);
    }

    pub(crate) fn apply_pushed(&mut self, generation: Generation, arrival: Arrival) {
        let Some(attachment) = self.current_attachment(generation) else {
            return;
        };
        let applied = attachment.reconciler.apply(arrival);
        self.mark_if_changed(applied);
    }

    /// Job and generation a control request should be issued for, if attached.
    pub(crate) fn control_target(&self) -> Option<(JobId, Generation)> {
        self.attachment
            .as_ref()
            .map(|attachment| (attachment.job_id.clone(), self.generation))
    }

    pub(crate) fn apply_control_result(&mut self, generation: Generation, result: Result<(), String>) {
        let Some(attachment) = self.current_attachment(generation) else {
            return;
        };
        let next = result.err();
        if attachment.control_error != next {
            attachment.control_error = next;
            self.dirty = true;
        }
    }

    fn current_attachment(&mut self, generation: Generation) -> Option<&mut Attachment> {
        if generation != self.generation {
            watch_debug!(
                "Dropping arrival from generation {} (current {})",
                generation,
                self.generation
            );
            return None;
        }
        self.attachment.as_mut()
    }

    fn mark_if_changed(&mut self, applied: Applied) {
        if applied == Applied::Changed {
            self.dirty = true;
        }
    }
}
