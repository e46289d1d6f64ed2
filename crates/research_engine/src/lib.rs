//! Research engine: status polling, push subscription and session control.
mod api;
mod config;
mod pull;
mod push;
mod session;
mod types;

pub use api::{parse_status, HttpResearchApi, ResearchApi};
pub use config::{
    EngineConfig, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_POLL_INTERVAL,
    DEFAULT_PUSH_IDLE_TIMEOUT, DEFAULT_RECONNECT_INITIAL, DEFAULT_RECONNECT_MAX,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use push::{decode_frame, DecodedFrame};
pub use session::SessionHandle;
pub use types::{ApiError, ControlReply, PushError, SessionClosed};
