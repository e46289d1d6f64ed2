use research_core::{LogTag, ReconciledState};

/// Turns published snapshots into terminal lines, printing each log entry once.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    printed_logs: usize,
    last_status: Option<String>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, view: &ReconciledState) -> Vec<String> {
        let mut lines = Vec::new();

        // Logs only shrink when a new session started.
        if view.logs.len() < self.printed_logs {
            self.printed_logs = 0;
        }
        for entry in &view.logs[self.printed_logs..] {
            let marker = match entry.tag {
                LogTag::Error => "!!",
                LogTag::TerminalSuccess => "OK",
                LogTag::Info => "--",
            };
            let tool = entry
                .event
                .tool_name
                .as_deref()
                .map(|tool| format!(" [{tool}]"))
                .unwrap_or_default();
            lines.push(format!(
                "{} {} {}{}",
                entry.event.timestamp.format("%H:%M:%S"),
                marker,
                entry.event.message,
                tool
            ));
        }
        self.printed_logs = view.logs.len();

        let status = status_line(view);
        if self.last_status.as_deref() != Some(status.as_str()) {
            lines.push(status.clone());
            self.last_status = Some(status);
        }
        lines
    }
}

pub fn status_line(view: &ReconciledState) -> String {
    let Some(job_id) = &view.job_id else {
        return "detached".to_string();
    };
    let mut line = if view.status_known {
        format!(
            "{job_id}: {:>5.1}% {} | files {} | findings {}",
            view.displayed_progress, view.phase_label, view.files_scanned, view.findings_count
        )
    } else {
        format!("{job_id}: waiting for status")
    };
    if let Some(tool) = &view.current_tool {
        line.push_str(&format!(" | running {tool}"));
    }
    if view.finalized {
        line.push_str(" | finalized");
    }
    if !view.connection_healthy {
        line.push_str(" | live feed offline");
    }
    if let Some(error) = &view.control_error {
        line.push_str(&format!(" | {error}"));
    }
    line
}
