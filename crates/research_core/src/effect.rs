use crate::{Generation, JobId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start the pull loop and the push subscription for a job.
    OpenChannels { job_id: JobId, generation: Generation },
    /// Cancel both channels of a generation, including in-flight requests.
    CloseChannels { generation: Generation },
    StartJob {
        job_id: JobId,
        generation: Generation,
        model: Option<String>,
    },
    StopJob { job_id: JobId, generation: Generation },
}
