use std::sync::Arc;
use std::time::Duration;

use research_core::{Generation, JobId, Msg, RequestSeq};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use watch_logging::{watch_trace, watch_warn};

use crate::session::Inbox;
use crate::{ApiError, ResearchApi};

/// Issues one status request per tick until `cancel` fires.
///
/// Requests do not wait for each other, so responses may arrive out of order;
/// each carries its request sequence and the reducer discards stale ones.
pub(crate) async fn run_pull_loop(
    api: Arc<dyn ResearchApi>,
    job_id: JobId,
    generation: Generation,
    interval: Duration,
    inbox: Inbox,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut request: RequestSeq = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        request += 1;
        tokio::spawn(pull_once(
            api.clone(),
            job_id.clone(),
            generation,
            request,
            inbox.clone(),
            cancel.clone(),
        ));
    }
}

async fn pull_once(
    api: Arc<dyn ResearchApi>,
    job_id: JobId,
    generation: Generation,
    request: RequestSeq,
    inbox: Inbox,
    cancel: CancellationToken,
) {
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = api.fetch_status(&job_id) => result,
    };
    match result {
        Ok(snapshot) => {
            watch_trace!("Status #{} for {}: {:?}", request, job_id, snapshot);
            inbox.send(Msg::Pulled {
                generation,
                request,
                snapshot,
            });
        }
        Err(ApiError::Malformed(reason)) => {
            watch_warn!("Dropping malformed status #{} for {}: {}", request, job_id, reason);
        }
        Err(err) => {
            watch_warn!("Status request #{} for {} failed: {}", request, job_id, err);
        }
    }
}
