use crate::{Arrival, Effect, Msg, SessionState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: SessionState, msg: Msg) -> (SessionState, Vec<Effect>) {
    let effects = match msg {
        Msg::Attach(job_id) => state.attach(job_id),
        Msg::Detach => state.detach(),
        Msg::Pulled {
            generation,
            request,
            snapshot,
        } => {
            state.apply_pulled(generation, request, Arrival::Pulled(snapshot));
            Vec::new()
        }
        Msg::PushEvents { generation, events } => {
            if !events.is_empty() {
                state.apply_pushed(generation, Arrival::Pushed(events));
            }
            Vec::new()
        }
        Msg::PushConnection {
            generation,
            healthy,
        } => {
            state.apply_pushed(generation, Arrival::PushConnection { healthy });
            Vec::new()
        }
        Msg::StartJobClicked { model } => match state.control_target() {
            Some((job_id, generation)) => vec![Effect::StartJob {
                job_id,
                generation,
                model,
            }],
            None => Vec::new(),
        },
        Msg::StopJobClicked => match state.control_target() {
            Some((job_id, generation)) => vec![Effect::StopJob { job_id, generation }],
            None => Vec::new(),
        },
        Msg::ControlCompleted { generation, result } => {
            state.apply_control_result(generation, result);
            Vec::new()
        }
    };

    (state, effects)
}
