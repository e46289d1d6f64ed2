//! Research core: pure reconciliation of pulled status and pushed activity
//! into one monotonically progressing session view.
mod activity;
mod effect;
mod estimate;
mod guard;
mod msg;
mod phase;
mod reconcile;
mod state;
mod update;
mod view_model;

pub use activity::{ActivityEvent, LogAggregator, LogEntry, LogTag};
pub use effect::Effect;
pub use estimate::{estimate, EstimatorConfig};
pub use guard::MonotonicGuard;
pub use msg::Msg;
pub use phase::{Phase, ProgressInterval, UnknownPhase};
pub use reconcile::{resets_session, Applied, Arrival, JobSnapshot, Reconciler};
pub use state::{Generation, JobId, RequestSeq, SessionState};
pub use update::update;
pub use view_model::ReconciledState;
