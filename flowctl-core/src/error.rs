//! Domain-specific error types for the flow-control protocol.
//!
//! All fallible operations return `Result<T, FlowError>`.
//! Invalid input never panics; every failure is a typed variant.

use std::time::Duration;
use thiserror::Error;

use crate::command::CommandCode;

/// The canonical error type for the flow-control client.
#[derive(Debug, Error)]
pub enum FlowError {
    // ── Input Errors ─────────────────────────────────────────────
    /// A message or byte buffer offered to the codec is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A trailing string field was not valid UTF-8.
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// An endpoint string is not of the form `tcp://host:port`.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A JSON request document could not be parsed.
    #[error("invalid request document: {0}")]
    Document(#[from] serde_json::Error),

    // ── Command Errors ───────────────────────────────────────────
    /// The command field holds a value outside the known set.
    #[error("unknown command code: {0}")]
    UnknownCommand(u16),

    /// The command is known but has no decoder for replies.
    #[error("command {0} is not a valid reply")]
    UnexpectedCommand(CommandCode),

    // ── Transport Errors ─────────────────────────────────────────
    /// The transport reported an I/O error.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Dialing did not succeed before the connect deadline.
    #[error("connect to {endpoint} failed after {attempts} attempt(s): {source}")]
    ConnectFailed {
        endpoint: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// Writing a request to the transport failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// The peer closed the transport.
    #[error("transport closed by peer")]
    TransportClosed,

    /// The session has no open transport.
    #[error("session is not connected")]
    NotConnected,

    /// A request is already waiting for its reply.
    #[error("a request is already outstanding")]
    RequestOutstanding,

    // ── Timeout ──────────────────────────────────────────────────
    /// No reply arrived within the requested window.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    // ── Protocol Errors ──────────────────────────────────────────
    /// The server answered with `ERROR`.
    #[error("server error: {message}")]
    Server { message: String },

    /// The server answered with `MSG_ERROR` for a specific flow.
    #[error("flow {flow_id} error: {message}")]
    Flow { flow_id: u32, message: String },

    /// The reply does not belong to the request that was sent.
    #[error("unexpected reply: expected {expected}, got {actual}")]
    UnexpectedResponse {
        expected: CommandCode,
        actual: CommandCode,
    },
}

impl FlowError {
    /// Returns `true` for failures where re-sending the request on a fresh
    /// connection may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FlowError::Timeout(_)
                | FlowError::Transport(_)
                | FlowError::ConnectFailed { .. }
                | FlowError::SendFailed(_)
                | FlowError::TransportClosed
        )
    }

    /// Returns `true` when the server itself reported the failure.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, FlowError::Server { .. } | FlowError::Flow { .. })
    }
}

impl From<&str> for FlowError {
    fn from(s: &str) -> Self {
        FlowError::InvalidInput(s.to_string())
    }
}
