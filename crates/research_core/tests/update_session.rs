use std::sync::Once;

use chrono::{TimeZone, Utc};
use research_core::{update, ActivityEvent, Effect, JobId, JobSnapshot, Msg, Phase, SessionState};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(watch_logging::initialize_for_tests);
}

fn attach(state: SessionState, job: &str) -> (SessionState, Vec<Effect>) {
    update(state, Msg::Attach(JobId::new(job)))
}

fn event(secs: i64, msg: &str) -> ActivityEvent {
    ActivityEvent::new(Utc.timestamp_opt(secs, 0).unwrap(), "research_progress", msg)
}

#[test]
fn attach_opens_channels_for_a_new_generation() {
    init_logging();
    let (mut state, effects) = attach(SessionState::default(), "alpha");

    assert_eq!(
        effects,
        vec![Effect::OpenChannels {
            job_id: JobId::new("alpha"),
            generation: 1,
        }]
    );
    assert!(state.consume_dirty());
    let view = state.view();
    assert_eq!(view.job_id, Some(JobId::new("alpha")));
    assert!(!view.status_known);
    assert_eq!(view.displayed_progress, 0.0);
}

#[test]
fn reattach_to_same_job_is_noop() {
    init_logging();
    let (mut state, _) = attach(SessionState::default(), "alpha");
    assert!(state.consume_dirty());

    let (mut state, effects) = attach(state, "alpha");
    assert!(effects.is_empty());
    assert_eq!(state.generation(), 1);
    assert!(!state.consume_dirty());
}

#[test]
fn attach_to_other_job_tears_down_and_rebuilds() {
    init_logging();
    let (state, _) = attach(SessionState::default(), "alpha");
    let (state, _) = update(
        state,
        Msg::PushEvents {
            generation: 1,
            events: vec![event(1, "a")],
        },
    );
    let (state, effects) = attach(state, "beta");

    assert_eq!(
        effects,
        vec![
            Effect::CloseChannels { generation: 1 },
            Effect::OpenChannels {
                job_id: JobId::new("beta"),
                generation: 2,
            },
        ]
    );
    let view = state.view();
    assert_eq!(view.job_id, Some(JobId::new("beta")));
    assert!(view.logs.is_empty());
}

#[test]
fn detach_discards_everything_and_ignores_late_arrivals() {
    init_logging();
    let (state, _) = attach(SessionState::default(), "alpha");
    let (state, effects) = update(state, Msg::Detach);
    assert_eq!(effects, vec![Effect::CloseChannels { generation: 1 }]);
    assert!(!state.is_attached());

    let (mut state, _) = update(
        state,
        Msg::Pulled {
            generation: 1,
            request: 1,
            snapshot: JobSnapshot {
                phase: Phase::Analyzing,
                files_scanned: 10,
                findings_count: 3,
                ..JobSnapshot::default()
            },
        },
    );
    state.consume_dirty();
    let (mut state, _) = update(
        state,
        Msg::PushEvents {
            generation: 1,
            events: vec![event(1, "late")],
        },
    );
    assert!(!state.consume_dirty());
    assert!(!state.view().is_attached());
    assert!(state.view().logs.is_empty());
}

#[test]
fn detach_while_detached_is_noop() {
    let (state, effects) = update(SessionState::default(), Msg::Detach);
    assert!(effects.is_empty());
    assert_eq!(state.generation(), 0);
}

#[test]
fn logs_do_not_survive_detach_and_reattach() {
    init_logging();
    let (state, _) = attach(SessionState::default(), "alpha");
    let (state, _) = update(
        state,
        Msg::PushEvents {
            generation: 1,
            events: vec![event(1, "a"), event(2, "b")],
        },
    );
    assert_eq!(state.view().logs.len(), 2);

    let (state, _) = update(state, Msg::Detach);
    let (state, effects) = attach(state, "alpha");
    assert_eq!(
        effects,
        vec![Effect::OpenChannels {
            job_id: JobId::new("alpha"),
            generation: 3,
        }]
    );
    assert!(state.view().logs.is_empty());
}

#[test]
fn control_requests_target_the_attached_job() {
    init_logging();
    let (state, effects) = update(SessionState::default(), Msg::StopJobClicked);
    assert!(effects.is_empty());

    let (state, _) = attach(state, "alpha");
    let (state, effects) = update(
        state,
        Msg::StartJobClicked {
            model: Some("opus".to_string()),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::StartJob {
            job_id: JobId::new("alpha"),
            generation: 1,
            model: Some("opus".to_string()),
        }]
    );

    let (_state, effects) = update(state, Msg::StopJobClicked);
    assert_eq!(
        effects,
        vec![Effect::StopJob {
            job_id: JobId::new("alpha"),
            generation: 1,
        }]
    );
}

#[test]
fn control_failure_is_surfaced_without_touching_reconciled_fields() {
    init_logging();
    let (state, _) = attach(SessionState::default(), "alpha");
    let (state, _) = update(
        state,
        Msg::Pulled {
            generation: 1,
            request: 1,
            snapshot: JobSnapshot {
                phase: Phase::Analyzing,
                files_scanned: 10,
                findings_count: 5,
                ..JobSnapshot::default()
            },
        },
    );
    let before = state.view();

    let (mut state, _) = update(
        state,
        Msg::ControlCompleted {
            generation: 1,
            result: Err("agent already running".to_string()),
        },
    );
    assert!(state.consume_dirty());
    let after = state.view();
    assert_eq!(after.control_error.as_deref(), Some("agent already running"));
    assert_eq!(after.phase, before.phase);
    assert_eq!(after.displayed_progress, before.displayed_progress);

    let (state, _) = update(
        state,
        Msg::ControlCompleted {
            generation: 1,
            result: Ok(()),
        },
    );
    assert_eq!(state.view().control_error, None);
}
