//! Message model: the header envelope plus one payload variant.
//!
//! The command code is derived from the [`Body`] variant, so a message
//! whose header names one command while carrying another command's
//! payload cannot be built.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::command::CommandCode;
use crate::error::FlowError;
use crate::header::{COMMAND_SIZE, Header};

// ── Tunnel ───────────────────────────────────────────────────────

/// One GTP-style tunnel. Addresses are IPv4 in network order, so
/// `10.0.0.1` is `0x0A00_0001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tunnel {
    pub teid_in: u32,
    pub teid_out: u32,
    pub ue_address: u32,
    pub server_address: u32,
}

impl Tunnel {
    /// Encoded size on the wire.
    pub const SIZE: usize = 16;

    pub fn new(teid_in: u32, teid_out: u32, ue: Ipv4Addr, server: Ipv4Addr) -> Self {
        Self {
            teid_in,
            teid_out,
            ue_address: u32::from(ue),
            server_address: u32::from(server),
        }
    }

    pub fn ue_ipv4(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.ue_address)
    }

    pub fn server_ipv4(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.server_address)
    }
}

// ── Requests ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub flow_id: u32,
    pub metrics_interval_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRequest {
    pub flow_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTunnelsRequest {
    pub flow_id: u32,
    pub tunnels: Vec<Tunnel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelTunnelsRequest {
    pub flow_id: u32,
    pub teids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelAllTunnelsRequest {
    pub flow_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetInfoRequest {
    pub flow_id: u32,
}

// ── Responses ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartResponse {
    pub flow_id: u32,
    /// Address of the metrics publisher, e.g. `tcp://10.0.0.5:5557`.
    pub publisher_address: String,
}

/// Generic acknowledgement, used for `STOP`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub flow_id: u32,
}

/// Reply to the three tunnel commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelResponse {
    pub flow_id: u32,
    pub tunnel_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetInfoResponse {
    pub flow_id: u32,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowErrorResponse {
    pub flow_id: u32,
    pub message: String,
}

// ── Body ─────────────────────────────────────────────────────────

/// The payload of a message. Exactly one variant is populated per message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Body {
    StartRequest(StartRequest),
    StopRequest(StopRequest),
    ShutdownRequest,
    AddTunnelsRequest(AddTunnelsRequest),
    DelTunnelsRequest(DelTunnelsRequest),
    DelAllTunnelsRequest(DelAllTunnelsRequest),
    GetInfoRequest(GetInfoRequest),

    StartResponse(StartResponse),
    /// Reply to `STOP`.
    Response(Response),
    AddTunnelsResponse(TunnelResponse),
    DelTunnelsResponse(TunnelResponse),
    DelAllTunnelsResponse(TunnelResponse),
    GetInfoResponse(GetInfoResponse),
    ErrorResponse(ErrorResponse),
    FlowErrorResponse(FlowErrorResponse),
}

impl Body {
    /// The command code this payload travels under.
    pub fn command(&self) -> CommandCode {
        match self {
            Body::StartRequest(_) | Body::StartResponse(_) => CommandCode::Start,
            Body::StopRequest(_) | Body::Response(_) => CommandCode::Stop,
            Body::ShutdownRequest => CommandCode::Shutdown,
            Body::AddTunnelsRequest(_) | Body::AddTunnelsResponse(_) => CommandCode::AddTunnels,
            Body::DelTunnelsRequest(_) | Body::DelTunnelsResponse(_) => CommandCode::DelTunnels,
            Body::DelAllTunnelsRequest(_) | Body::DelAllTunnelsResponse(_) => {
                CommandCode::DelAllTunnels
            }
            Body::GetInfoRequest(_) | Body::GetInfoResponse(_) => CommandCode::GetInfo,
            Body::ErrorResponse(_) => CommandCode::Error,
            Body::FlowErrorResponse(_) => CommandCode::MsgError,
        }
    }

    /// Returns `true` for payloads a client sends.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Body::StartRequest(_)
                | Body::StopRequest(_)
                | Body::ShutdownRequest
                | Body::AddTunnelsRequest(_)
                | Body::DelTunnelsRequest(_)
                | Body::DelAllTunnelsRequest(_)
                | Body::GetInfoRequest(_)
        )
    }

    /// Number of payload bytes following the header.
    pub fn payload_len(&self) -> usize {
        match self {
            // flow_id + second u32 (interval, or the always-zero tunnel count)
            Body::StartRequest(_) | Body::DelAllTunnelsRequest(_) => 8,
            Body::StopRequest(_) | Body::GetInfoRequest(_) | Body::Response(_) => 4,
            Body::ShutdownRequest => 0,
            Body::AddTunnelsRequest(req) => 8 + req.tunnels.len() * Tunnel::SIZE,
            Body::DelTunnelsRequest(req) => 8 + req.teids.len() * 4,
            Body::AddTunnelsResponse(_)
            | Body::DelTunnelsResponse(_)
            | Body::DelAllTunnelsResponse(_) => 8,
            Body::StartResponse(resp) => 4 + resp.publisher_address.len(),
            Body::GetInfoResponse(resp) => 4 + resp.version.len(),
            Body::ErrorResponse(resp) => resp.message.len(),
            Body::FlowErrorResponse(resp) => 4 + resp.message.len(),
        }
    }

    /// Conventional header length: command code plus payload, saturating
    /// at `u16::MAX`.
    pub fn wire_length(&self) -> u16 {
        u16::try_from(COMMAND_SIZE + self.payload_len()).unwrap_or(u16::MAX)
    }
}

// ── Message ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    header: Header,
    body: Body,
}

impl Message {
    /// Builds a message with a caller-chosen header length.
    pub fn new(length: u16, body: Body) -> Self {
        Self {
            header: Header::new(length, body.command()),
            body,
        }
    }

    /// Builds a message whose length follows the wire convention.
    pub fn from_body(body: Body) -> Self {
        Self::new(body.wire_length(), body)
    }

    pub fn start(flow_id: u32, metrics_interval_seconds: u32) -> Self {
        Self::from_body(Body::StartRequest(StartRequest {
            flow_id,
            metrics_interval_seconds,
        }))
    }

    pub fn stop(flow_id: u32) -> Self {
        Self::from_body(Body::StopRequest(StopRequest { flow_id }))
    }

    pub fn shutdown() -> Self {
        Self::from_body(Body::ShutdownRequest)
    }

    pub fn add_tunnels(flow_id: u32, tunnels: Vec<Tunnel>) -> Self {
        Self::from_body(Body::AddTunnelsRequest(AddTunnelsRequest { flow_id, tunnels }))
    }

    pub fn del_tunnels(flow_id: u32, teids: Vec<u32>) -> Self {
        Self::from_body(Body::DelTunnelsRequest(DelTunnelsRequest { flow_id, teids }))
    }

    pub fn del_all_tunnels(flow_id: u32) -> Self {
        Self::from_body(Body::DelAllTunnelsRequest(DelAllTunnelsRequest { flow_id }))
    }

    pub fn get_info(flow_id: u32) -> Self {
        Self::from_body(Body::GetInfoRequest(GetInfoRequest { flow_id }))
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn length(&self) -> u16 {
        self.header.length
    }

    pub fn command(&self) -> CommandCode {
        self.header.command
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    /// Splits a reply into success or the server-reported failure.
    ///
    /// `ERROR` becomes [`FlowError::Server`], `MSG_ERROR` becomes
    /// [`FlowError::Flow`]; the server text is kept verbatim.
    pub fn classify(self) -> Result<Message, FlowError> {
        match self.body {
            Body::ErrorResponse(resp) => Err(FlowError::Server {
                message: resp.message,
            }),
            Body::FlowErrorResponse(resp) => Err(FlowError::Flow {
                flow_id: resp.flow_id,
                message: resp.message,
            }),
            _ => Ok(self),
        }
    }
}
