//! Session lifecycle.
//!
//! ```text
//!  Disconnected ──connect──► Ready ──send──► AwaitingReply
//!       ▲                      ▲                 │    │
//!       │                      └────reply────────┘    │ timeout / recv error
//!       │                                             ▼
//!       └────────────close (from any state)───────  Stale ──send──► (re-dial) Ready
//! ```
//!
//! `Ready`, `AwaitingReply` and `Stale` are all "connected" from the
//! caller's point of view.

use std::fmt;

use crate::error::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No transport. Initial and terminal state.
    #[default]
    Disconnected,

    /// Connected, no request in flight.
    Ready,

    /// A request was sent and its reply has not been received.
    AwaitingReply,

    /// The last request timed out or its receive failed. A late reply may
    /// still arrive on this transport, so the next send re-dials.
    Stale,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Ready => write!(f, "Ready"),
            Self::AwaitingReply => write!(f, "AwaitingReply"),
            Self::Stale => write!(f, "Stale"),
        }
    }
}

impl SessionPhase {
    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    /// Checks that a request may be written now.
    ///
    /// Returns `Ok(true)` when the transport must be re-dialed first.
    pub fn check_send(&self) -> Result<bool, FlowError> {
        match self {
            Self::Disconnected => Err(FlowError::NotConnected),
            Self::AwaitingReply => Err(FlowError::RequestOutstanding),
            Self::Ready => Ok(false),
            Self::Stale => Ok(true),
        }
    }

    /// Phase after a receive timed out.
    pub fn on_timeout(self) -> Self {
        match self {
            Self::AwaitingReply => Self::Stale,
            other => other,
        }
    }
}
