//! Command codes carried in every message header.
//!
//! Unknown values are rejected through `TryFrom`, never panicked on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FlowError;

/// All command codes understood by the flow-control protocol.
///
/// The same code is used for a request and its reply; `Error` and
/// `MsgError` only ever appear in replies.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandCode {
    /// Placeholder, never sent.
    None = 0,
    /// Start a flow and its metrics publisher.
    Start = 1,
    /// Stop a flow.
    Stop = 2,
    /// Ask the service to shut down.
    Shutdown = 3,
    /// Add tunnels to a flow.
    AddTunnels = 4,
    /// Delete tunnels from a flow by TEID.
    DelTunnels = 5,
    /// Delete every tunnel of a flow.
    DelAllTunnels = 6,
    /// Query service information.
    GetInfo = 7,
    /// Service-level failure (reply only).
    Error = 8,
    /// Per-flow failure (reply only).
    MsgError = 9,
    /// Placeholder, never sent.
    Invalid = 10,
}

impl CommandCode {
    /// Every code in wire order. `ALL[code as usize] == code`.
    pub const ALL: [CommandCode; 11] = [
        CommandCode::None,
        CommandCode::Start,
        CommandCode::Stop,
        CommandCode::Shutdown,
        CommandCode::AddTunnels,
        CommandCode::DelTunnels,
        CommandCode::DelAllTunnels,
        CommandCode::GetInfo,
        CommandCode::Error,
        CommandCode::MsgError,
        CommandCode::Invalid,
    ];

    /// The numeric wire value.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns `true` for codes a client may send.
    pub fn is_request(self) -> bool {
        matches!(
            self,
            CommandCode::Start
                | CommandCode::Stop
                | CommandCode::Shutdown
                | CommandCode::AddTunnels
                | CommandCode::DelTunnels
                | CommandCode::DelAllTunnels
                | CommandCode::GetInfo
        )
    }
}

impl TryFrom<u16> for CommandCode {
    type Error = FlowError;

    fn try_from(value: u16) -> Result<Self, FlowError> {
        CommandCode::ALL
            .get(value as usize)
            .copied()
            .ok_or(FlowError::UnknownCommand(value))
    }
}

impl From<CommandCode> for u16 {
    fn from(code: CommandCode) -> u16 {
        code as u16
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandCode::None => "NONE",
            CommandCode::Start => "START",
            CommandCode::Stop => "STOP",
            CommandCode::Shutdown => "SHUTDOWN",
            CommandCode::AddTunnels => "ADD_TUNNELS",
            CommandCode::DelTunnels => "DEL_TUNNELS",
            CommandCode::DelAllTunnels => "DEL_ALL_TUNNELS",
            CommandCode::GetInfo => "GET_INFO",
            CommandCode::Error => "ERROR",
            CommandCode::MsgError => "MSG_ERROR",
            CommandCode::Invalid => "INVALID",
        };
        f.write_str(name)
    }
}
