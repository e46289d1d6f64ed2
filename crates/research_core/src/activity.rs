use std::collections::HashSet;

use chrono::{DateTime, Utc};

/// One activity message delivered by the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub message: String,
    pub tool_name: Option<String>,
}

impl ActivityEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        event_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            event_type: event_type.into(),
            message: message.into(),
            tool_name: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool_name = Some(tool.into());
        self
    }
}

/// Presentation tag assigned on admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogTag {
    #[default]
    Info,
    Error,
    TerminalSuccess,
}

impl LogTag {
    pub fn classify(event_type: &str) -> Self {
        if event_type.contains("error") {
            LogTag::Error
        } else if matches!(event_type, "research_complete" | "research_finalized") {
            LogTag::TerminalSuccess
        } else {
            LogTag::Info
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub event: ActivityEvent,
    pub tag: LogTag,
}

/// Identity of an event: its timestamp plus its position among identical
/// events sharing that timestamp inside one arrival batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EventKey {
    timestamp: DateTime<Utc>,
    ordinal: usize,
    event_type: String,
    message: String,
    tool_name: Option<String>,
}

impl EventKey {
    fn new(event: &ActivityEvent, ordinal: usize) -> Self {
        Self {
            timestamp: event.timestamp,
            ordinal,
            event_type: event.event_type.clone(),
            message: event.message.clone(),
            tool_name: event.tool_name.clone(),
        }
    }

    fn same_event(&self, event: &ActivityEvent) -> bool {
        self.timestamp == event.timestamp
            && self.event_type == event.event_type
            && self.message == event.message
            && self.tool_name == event.tool_name
    }
}

/// Ordered, deduplicated, append-only activity log for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogAggregator {
    entries: Vec<LogEntry>,
    seen: HashSet<EventKey>,
}

impl LogAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one arrival batch in arrival order, skipping events already recorded.
    /// Returns the number of entries appended.
    pub fn append_batch(&mut self, batch: Vec<ActivityEvent>) -> usize {
        let mut batch_keys: Vec<EventKey> = Vec::with_capacity(batch.len());
        let mut appended = 0;
        for event in batch {
            let ordinal = batch_keys
                .iter()
                .filter(|key| key.same_event(&event))
                .count();
            let key = EventKey::new(&event, ordinal);
            batch_keys.push(key.clone());
            if !self.seen.insert(key) {
                continue;
            }
            let tag = LogTag::classify(&event.event_type);
            self.entries.push(LogEntry { event, tag });
            appended += 1;
        }
        appended
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
