use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use futures_util::StreamExt;
use research_core::{ActivityEvent, Generation, Msg};
use serde::Deserialize;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;
use watch_logging::{watch_debug, watch_info, watch_trace, watch_warn};

use crate::session::Inbox;
use crate::PushError;

/// Message types that only prove the channel is alive.
const LIVENESS_TYPES: [&str; 3] = ["ping", "pong", "heartbeat"];

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    tool: Option<String>,
}

/// Activity extracted from one text frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedFrame {
    pub events: Vec<ActivityEvent>,
    /// One description per dropped object.
    pub malformed: Vec<String>,
}

/// Decodes a text frame holding one message object or an array of them.
///
/// Objects without `type`, or activity objects without `message` or
/// `timestamp`, are dropped individually; numeric status fields are never read.
pub fn decode_frame(text: &str) -> Result<DecodedFrame, PushError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|err| PushError::Malformed(err.to_string()))?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        object @ serde_json::Value::Object(_) => vec![object],
        other => {
            return Err(PushError::Malformed(format!(
                "expected object or array, got {other}"
            )))
        }
    };

    let mut frame = DecodedFrame::default();
    for item in items {
        match decode_item(item) {
            Ok(Some(event)) => frame.events.push(event),
            Ok(None) => {}
            Err(reason) => frame.malformed.push(reason),
        }
    }
    Ok(frame)
}

fn decode_item(item: serde_json::Value) -> Result<Option<ActivityEvent>, String> {
    let wire: WireMessage = serde_json::from_value(item).map_err(|err| err.to_string())?;
    if LIVENESS_TYPES.contains(&wire.kind.as_str()) {
        return Ok(None);
    }
    let message = wire
        .message
        .ok_or_else(|| format!("{} message without text", wire.kind))?;
    // The timestamp is part of the entry's identity, so replays must carry the same one.
    let raw = wire
        .timestamp
        .ok_or_else(|| format!("{} message without timestamp", wire.kind))?;
    let timestamp = parse_timestamp(&raw).ok_or_else(|| format!("bad timestamp {raw:?}"))?;
    Ok(Some(ActivityEvent {
        timestamp,
        event_type: wire.kind,
        message,
        tool_name: wire.tool.filter(|tool| !tool.is_empty()),
    }))
}

/// RFC 3339, or a naive ISO-8601 timestamp taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

/// Keeps one push subscription alive until `cancel` fires, reconnecting with backoff.
///
/// A connection that delivers no frame at all (heartbeats included) within
/// `idle_timeout` is dropped and reported unhealthy.
pub(crate) async fn run_push_loop(
    url: Url,
    generation: Generation,
    backoff: Backoff,
    idle_timeout: Duration,
    inbox: Inbox,
    cancel: CancellationToken,
) {
    let mut delay = backoff.initial;
    loop {
        let connect = tokio::select! {
            _ = cancel.cancelled() => return,
            connect = tokio_tungstenite::connect_async(url.as_str()) => connect,
        };
        let mut ws = match connect {
            Ok((ws, _response)) => ws,
            Err(err) => {
                watch_warn!("Push connect to {} failed: {}", url, err);
                if sleep_or_cancel(delay, &cancel).await {
                    return;
                }
                delay = backoff.next(delay);
                continue;
            }
        };

        watch_info!("Push channel connected to {}", url);
        delay = backoff.initial;
        inbox.send(Msg::PushConnection {
            generation,
            healthy: true,
        });

        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = ws.close(None).await;
                    return;
                }
                frame = tokio::time::timeout(idle_timeout, ws.next()) => frame,
            };
            let Ok(frame) = frame else {
                watch_warn!("Push channel silent for {:?}, dropping it", idle_timeout);
                break;
            };
            match frame {
                Some(Ok(Message::Text(text))) => handle_text(text.as_str(), generation, &inbox),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    watch_warn!("Push channel error: {}", err);
                    break;
                }
            }
        }

        watch_info!("Push channel disconnected from {}", url);
        inbox.send(Msg::PushConnection {
            generation,
            healthy: false,
        });
        if sleep_or_cancel(delay, &cancel).await {
            return;
        }
        delay = backoff.next(delay);
    }
}

fn handle_text(text: &str, generation: Generation, inbox: &Inbox) {
    watch_trace!("Push frame: {}", text);
    match decode_frame(text) {
        Ok(frame) => {
            for reason in &frame.malformed {
                watch_warn!("Dropping malformed push message: {}", reason);
            }
            if !frame.events.is_empty() {
                inbox.send(Msg::PushEvents {
                    generation,
                    events: frame.events,
                });
            }
        }
        Err(err) => watch_warn!("Dropping push frame: {}", err),
    }
}

/// Returns true when cancelled before the delay elapsed.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    watch_debug!("Push reconnect in {:?}", delay);
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
