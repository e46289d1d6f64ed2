//! Session controller: owns the session state and is its only writer.
//!
//! Every arrival (pulled status, push frames, control outcomes, host requests)
//! is funnelled through one mpsc queue into a single task that runs the pure
//! `update` function, executes the returned effects, and republishes the view
//! when it changed.

use std::sync::Arc;

use research_core::{update, Effect, Generation, JobId, Msg, ReconciledState, SessionState};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use watch_logging::{watch_debug, watch_info, watch_warn};

use crate::pull::run_pull_loop;
use crate::push::{run_push_loop, Backoff};
use crate::{EngineConfig, ResearchApi, SessionClosed};

enum Command {
    Dispatch {
        msg: Msg,
        ack: Option<oneshot::Sender<()>>,
    },
    Shutdown,
}

/// Producer side of the controller queue, handed to channel tasks.
#[derive(Clone)]
pub(crate) struct Inbox {
    tx: mpsc::UnboundedSender<Command>,
}

impl Inbox {
    /// Delivery fails only after shutdown, when nothing is listening any more.
    pub(crate) fn send(&self, msg: Msg) {
        let _ = self.tx.send(Command::Dispatch { msg, ack: None });
    }
}

/// Host-facing handle of one session.
///
/// Must be created inside a tokio runtime. Dropping the handle shuts the
/// session down.
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Command>,
    view_rx: watch::Receiver<Arc<ReconciledState>>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn spawn(api: Arc<dyn ResearchApi>, config: EngineConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = SessionState::new(config.estimator);
        let (view_tx, view_rx) = watch::channel(Arc::new(state.view()));
        let controller = SessionController {
            api,
            config,
            state,
            channels: None,
            inbox: tx.downgrade(),
            view_tx,
        };
        let task = tokio::spawn(controller.run(rx));
        Self {
            tx,
            view_rx,
            task: Some(task),
        }
    }

    /// Starts observing `job_id`. Returns once the previous session (if any) is
    /// torn down and the new channels are running.
    pub async fn attach(&self, job_id: JobId) -> Result<(), SessionClosed> {
        self.dispatch_acked(Msg::Attach(job_id)).await
    }

    /// Stops observing. Once this returns, no arrival from the old session can
    /// change the published view.
    pub async fn detach(&self) -> Result<(), SessionClosed> {
        self.dispatch_acked(Msg::Detach).await
    }

    /// Asks the executor to start the attached job. Failures surface as
    /// `control_error` on the view.
    pub fn start_job(&self, model: Option<String>) -> Result<(), SessionClosed> {
        self.dispatch(Msg::StartJobClicked { model })
    }

    pub fn stop_job(&self) -> Result<(), SessionClosed> {
        self.dispatch(Msg::StopJobClicked)
    }

    /// Receiver notified once per published change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ReconciledState>> {
        self.view_rx.clone()
    }

    /// Latest published view.
    pub fn snapshot(&self) -> Arc<ReconciledState> {
        self.view_rx.borrow().clone()
    }

    /// Detaches, stops the controller task and waits for it to finish.
    pub async fn shutdown(mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn dispatch(&self, msg: Msg) -> Result<(), SessionClosed> {
        self.tx
            .send(Command::Dispatch { msg, ack: None })
            .map_err(|_| SessionClosed)
    }

    async fn dispatch_acked(&self, msg: Msg) -> Result<(), SessionClosed> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Command::Dispatch {
                msg,
                ack: Some(ack),
            })
            .map_err(|_| SessionClosed)?;
        done.await.map_err(|_| SessionClosed)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.tx.send(Command::Shutdown);
        }
    }
}

struct OpenChannels {
    generation: Generation,
    cancel: CancellationToken,
}

struct SessionController {
    api: Arc<dyn ResearchApi>,
    config: EngineConfig,
    state: SessionState,
    channels: Option<OpenChannels>,
    inbox: mpsc::WeakUnboundedSender<Command>,
    view_tx: watch::Sender<Arc<ReconciledState>>,
}

impl SessionController {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Dispatch { msg, ack } => {
                    self.dispatch(msg);
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                }
                Command::Shutdown => break,
            }
        }
        self.dispatch(Msg::Detach);
        watch_debug!("Session controller stopped");
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let changed = state.consume_dirty();
        let view = changed.then(|| Arc::new(state.view()));
        self.state = state;

        for effect in effects {
            self.run_effect(effect);
        }
        if let Some(view) = view {
            self.view_tx.send_replace(view);
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::OpenChannels { job_id, generation } => self.open_channels(job_id, generation),
            Effect::CloseChannels { generation } => {
                if let Some(open) = self.channels.take_if(|open| open.generation == generation) {
                    open.cancel.cancel();
                    watch_debug!("Closed channels of generation {}", generation);
                }
            }
            Effect::StartJob {
                job_id,
                generation,
                model,
            } => {
                let Some(inbox) = self.inbox() else { return };
                let api = self.api.clone();
                tokio::spawn(async move {
                    let result = api.start_job(&job_id, model.as_deref()).await;
                    report_control(&inbox, generation, "start", &job_id, result);
                });
            }
            Effect::StopJob { job_id, generation } => {
                let Some(inbox) = self.inbox() else { return };
                let api = self.api.clone();
                tokio::spawn(async move {
                    let result = api.stop_job(&job_id).await;
                    report_control(&inbox, generation, "stop", &job_id, result);
                });
            }
        }
    }

    fn open_channels(&mut self, job_id: JobId, generation: Generation) {
        let Some(inbox) = self.inbox() else { return };
        let cancel = CancellationToken::new();

        tokio::spawn(run_pull_loop(
            self.api.clone(),
            job_id.clone(),
            generation,
            self.config.poll_interval,
            inbox.clone(),
            cancel.clone(),
        ));

        match self.config.push_url(&job_id) {
            Ok(url) => {
                let backoff = Backoff {
                    initial: self.config.reconnect_initial,
                    max: self.config.reconnect_max,
                };
                tokio::spawn(run_push_loop(
                    url,
                    generation,
                    backoff,
                    self.config.push_idle_timeout,
                    inbox,
                    cancel.clone(),
                ));
            }
            // The pull loop alone still keeps phase and counters current.
            Err(err) => watch_warn!("Push channel unavailable for {}: {}", job_id, err),
        }

        if let Some(previous) = self.channels.replace(OpenChannels { generation, cancel }) {
            previous.cancel.cancel();
        }
    }

    fn inbox(&self) -> Option<Inbox> {
        self.inbox.upgrade().map(|tx| Inbox { tx })
    }
}

fn report_control<T: std::fmt::Display>(
    inbox: &Inbox,
    generation: Generation,
    action: &str,
    job_id: &JobId,
    result: Result<T, crate::ApiError>,
) {
    let result = match result {
        Ok(reply) => {
            watch_info!("Research {} for {}: {}", action, job_id, reply);
            Ok(())
        }
        Err(err) => {
            watch_warn!("Research {} for {} failed: {}", action, job_id, err);
            Err(format!("Failed to {action} research: {err}"))
        }
    };
    inbox.send(Msg::ControlCompleted { generation, result });
}
