//! Field-wise merge of the pulled status and the pushed activity stream.
//!
//! Ownership is fixed per field and never contended:
//! - phase, counters and `finalized` come only from pulled snapshots;
//! - activity entries and the current tool come only from the push channel;
//! - connection health is the push channel's own liveness signal;
//! - the displayed percentage is derived from pulled fields through the
//!   estimator and the monotonic guard.
//!
//! Numeric fields carried by push messages never reach this module.

use watch_logging::{watch_debug, watch_info};

use crate::{estimate, ActivityEvent, EstimatorConfig, LogAggregator, LogTag, MonotonicGuard, Phase};

/// Status as reported by the pull endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSnapshot {
    pub phase: Phase,
    pub files_scanned: u64,
    pub findings_count: u64,
    pub finalized: bool,
    /// Executor process status ("running", "stopped", ...), informational only.
    pub executor_status: Option<String>,
}

/// One arrival, tagged with the channel it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arrival {
    Pulled(JobSnapshot),
    Pushed(Vec<ActivityEvent>),
    PushConnection { healthy: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    Unchanged,
    /// The arrival contradicted forward-only progress and was discarded.
    Stale,
}

/// True when a pulled phase/findings pair is indistinguishable from a fresh session.
///
/// A scan with nothing found yet counts as fresh even when it is the early part
/// of a run that is still going.
pub fn resets_session(phase: Phase, findings_count: u64) -> bool {
    match phase {
        Phase::NotStarted => true,
        Phase::Scanning => findings_count == 0,
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciler {
    config: EstimatorConfig,
    pulled: Option<JobSnapshot>,
    guard: MonotonicGuard,
    displayed_progress: f64,
    logs: LogAggregator,
    current_tool: Option<String>,
    connection_healthy: bool,
}

impl Reconciler {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            pulled: None,
            guard: MonotonicGuard::new(),
            displayed_progress: 0.0,
            logs: LogAggregator::new(),
            current_tool: None,
            connection_healthy: false,
        }
    }

    pub fn apply(&mut self, arrival: Arrival) -> Applied {
        match arrival {
            Arrival::Pulled(snapshot) => self.apply_pulled(snapshot),
            Arrival::Pushed(events) => self.apply_pushed(events),
            Arrival::PushConnection { healthy } => {
                if self.connection_healthy == healthy {
                    Applied::Unchanged
                } else {
                    self.connection_healthy = healthy;
                    Applied::Changed
                }
            }
        }
    }

    fn apply_pulled(&mut self, snapshot: JobSnapshot) -> Applied {
        let reset = resets_session(snapshot.phase, snapshot.findings_count);
        if let Some(previous) = &self.pulled {
            if snapshot.phase.rank() < previous.phase.rank() && !reset {
                watch_debug!(
                    "Dropping pulled snapshot: phase {:?} behind {:?}",
                    snapshot.phase,
                    previous.phase
                );
                return Applied::Stale;
            }
        }

        let raw = estimate(
            &self.config,
            snapshot.phase,
            snapshot.files_scanned,
            snapshot.findings_count,
        );
        if reset && self.guard.current() > raw {
            watch_info!(
                "Progress reset: phase {:?} with {} findings",
                snapshot.phase,
                snapshot.findings_count
            );
        }
        let shown = self.guard.admit(raw, reset);

        let mut changed = self.pulled.as_ref() != Some(&snapshot) || shown != self.displayed_progress;
        self.displayed_progress = shown;
        self.pulled = Some(snapshot);
        if self.is_finished() && self.current_tool.take().is_some() {
            changed = true;
        }

        if changed {
            Applied::Changed
        } else {
            Applied::Unchanged
        }
    }

    fn apply_pushed(&mut self, events: Vec<ActivityEvent>) -> Applied {
        let before = self.logs.len();
        let appended = self.logs.append_batch(events);
        if appended == 0 {
            return Applied::Unchanged;
        }

        let finished = self.is_finished();
        for entry in &self.logs.entries()[before..] {
            self.current_tool = match entry.tag {
                LogTag::TerminalSuccess => None,
                _ if finished => None,
                _ => entry.event.tool_name.clone(),
            };
        }
        Applied::Changed
    }

    /// The job is known to be done; no in-progress indicator may survive this.
    pub fn is_finished(&self) -> bool {
        self.pulled
            .as_ref()
            .is_some_and(|s| s.finalized || s.phase == Phase::Complete)
    }

    pub fn pulled(&self) -> Option<&JobSnapshot> {
        self.pulled.as_ref()
    }

    pub fn displayed_progress(&self) -> f64 {
        self.displayed_progress
    }

    pub fn logs(&self) -> &LogAggregator {
        &self.logs
    }

    pub fn current_tool(&self) -> Option<&str> {
        self.current_tool.as_deref()
    }

    pub fn connection_healthy(&self) -> bool {
        self.connection_healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pulled(phase: Phase, files: u64, findings: u64) -> Arrival {
        Arrival::Pulled(JobSnapshot {
            phase,
            files_scanned: files,
            findings_count: findings,
            ..JobSnapshot::default()
        })
    }

    fn event(secs: i64, event_type: &str, tool: Option<&str>) -> ActivityEvent {
        let event = ActivityEvent::new(Utc.timestamp_opt(secs, 0).unwrap(), event_type, "msg");
        match tool {
            Some(tool) => event.with_tool(tool),
            None => event,
        }
    }

    #[test]
    fn reset_conditions() {
        assert!(resets_session(Phase::NotStarted, 7));
        assert!(resets_session(Phase::Scanning, 0));
        assert!(!resets_session(Phase::Scanning, 1));
        assert!(!resets_session(Phase::Analyzing, 0));
    }

    #[test]
    fn push_only_session_keeps_counters_at_zero() {
        let mut reconciler = Reconciler::new(EstimatorConfig::default());
        reconciler.apply(Arrival::Pushed(vec![event(1, "research_progress", Some("Read"))]));

        assert!(reconciler.pulled().is_none());
        assert_eq!(reconciler.displayed_progress(), 0.0);
        assert_eq!(reconciler.current_tool(), Some("Read"));
        assert_eq!(reconciler.logs().len(), 1);
    }

    #[test]
    fn phase_regression_without_reset_is_stale() {
        let mut reconciler = Reconciler::new(EstimatorConfig::default());
        reconciler.apply(pulled(Phase::Documenting, 40, 12));
        assert_eq!(reconciler.apply(pulled(Phase::Analyzing, 40, 10)), Applied::Stale);
        assert_eq!(reconciler.pulled().unwrap().phase, Phase::Documenting);
        assert_eq!(reconciler.displayed_progress(), 85.0);
    }

    #[test]
    fn fresh_scan_after_completion_resets_progress() {
        let mut reconciler = Reconciler::new(EstimatorConfig::default());
        reconciler.apply(pulled(Phase::Complete, 40, 12));
        assert_eq!(reconciler.displayed_progress(), 100.0);
        assert_eq!(reconciler.apply(pulled(Phase::Scanning, 0, 0)), Applied::Changed);
        assert_eq!(reconciler.displayed_progress(), 5.0);
    }

    #[test]
    fn counter_drop_within_a_phase_holds_the_percentage() {
        let mut reconciler = Reconciler::new(EstimatorConfig::default());
        reconciler.apply(pulled(Phase::Analyzing, 10, 10));
        let high = reconciler.displayed_progress();
        reconciler.apply(pulled(Phase::Analyzing, 10, 4));
        assert_eq!(reconciler.displayed_progress(), high);
        assert_eq!(reconciler.pulled().unwrap().findings_count, 4);
    }

    #[test]
    fn completion_clears_current_tool() {
        let mut reconciler = Reconciler::new(EstimatorConfig::default());
        reconciler.apply(pulled(Phase::Documenting, 10, 10));
        reconciler.apply(Arrival::Pushed(vec![event(1, "research_progress", Some("Write"))]));
        assert_eq!(reconciler.current_tool(), Some("Write"));

        reconciler.apply(pulled(Phase::Complete, 10, 10));
        assert_eq!(reconciler.current_tool(), None);

        // Late activity after completion does not bring the indicator back.
        reconciler.apply(Arrival::Pushed(vec![event(2, "research_progress", Some("Write"))]));
        assert_eq!(reconciler.current_tool(), None);
    }

    #[test]
    fn terminal_success_event_clears_current_tool() {
        let mut reconciler = Reconciler::new(EstimatorConfig::default());
        reconciler.apply(Arrival::Pushed(vec![
            event(1, "research_progress", Some("Glob")),
            event(2, "research_complete", None),
        ]));
        assert_eq!(reconciler.current_tool(), None);
    }

    #[test]
    fn replayed_events_do_not_move_the_tool_back() {
        let mut reconciler = Reconciler::new(EstimatorConfig::default());
        let first = event(1, "research_progress", Some("Glob"));
        let second = event(2, "research_progress", Some("Read"));
        reconciler.apply(Arrival::Pushed(vec![first.clone(), second]));
        assert_eq!(reconciler.apply(Arrival::Pushed(vec![first])), Applied::Unchanged);
        assert_eq!(reconciler.current_tool(), Some("Read"));
    }

    #[test]
    fn connection_flag_reports_changes_only() {
        let mut reconciler = Reconciler::new(EstimatorConfig::default());
        assert_eq!(
            reconciler.apply(Arrival::PushConnection { healthy: true }),
            Applied::Changed
        );
        assert_eq!(
            reconciler.apply(Arrival::PushConnection { healthy: true }),
            Applied::Unchanged
        );
    }
}
