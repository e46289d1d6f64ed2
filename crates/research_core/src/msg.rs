use crate::{ActivityEvent, Generation, JobId, JobSnapshot, RequestSeq};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Host started observing a job. Re-attaching to the same job is a no-op.
    Attach(JobId),
    /// Host stopped observing; all session state is discarded.
    Detach,
    /// A status response, tagged with the request that produced it.
    Pulled {
        generation: Generation,
        request: RequestSeq,
        snapshot: JobSnapshot,
    },
    /// One arrival batch from the push channel.
    PushEvents {
        generation: Generation,
        events: Vec<ActivityEvent>,
    },
    /// Push channel connected or dropped.
    PushConnection { generation: Generation, healthy: bool },
    /// User asked the executor to start the job.
    StartJobClicked { model: Option<String> },
    /// User asked the executor to stop the job.
    StopJobClicked,
    /// Control request outcome.
    ControlCompleted {
        generation: Generation,
        result: Result<(), String>,
    },
}
