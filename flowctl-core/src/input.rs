//! JSON request documents.
//!
//! ```json
//! {
//!   "command": "add_tunnels",
//!   "flow_id": 1233,
//!   "tunnels": [
//!     { "teid_in": 1, "teid_out": 1001,
//!       "ue_address": "10.0.0.1", "server_address": "192.168.1.1" }
//!   ]
//! }
//! ```
//!
//! `length` may be given to override the header length verbatim.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::message::{
    AddTunnelsRequest, Body, DelAllTunnelsRequest, DelTunnelsRequest, GetInfoRequest, Message,
    StartRequest, StopRequest, Tunnel,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u16>,
    #[serde(flatten)]
    pub request: RequestBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RequestBody {
    Start {
        flow_id: u32,
        metrics_interval_seconds: u32,
    },
    Stop {
        flow_id: u32,
    },
    AddTunnels {
        flow_id: u32,
        tunnels: Vec<TunnelDocument>,
    },
    DelTunnels {
        flow_id: u32,
        teids: Vec<u32>,
    },
    DelAllTunnels {
        flow_id: u32,
    },
    GetInfo {
        flow_id: u32,
    },
    Shutdown,
}

/// A tunnel with its addresses in dotted-decimal form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelDocument {
    pub teid_in: u32,
    pub teid_out: u32,
    pub ue_address: Ipv4Addr,
    pub server_address: Ipv4Addr,
}

impl From<TunnelDocument> for Tunnel {
    fn from(doc: TunnelDocument) -> Self {
        Tunnel::new(doc.teid_in, doc.teid_out, doc.ue_address, doc.server_address)
    }
}

impl RequestDocument {
    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_message(self) -> Message {
        let body = self.request.into_body();
        match self.length {
            Some(length) => Message::new(length, body),
            None => Message::from_body(body),
        }
    }
}

impl RequestBody {
    fn into_body(self) -> Body {
        match self {
            RequestBody::Start {
                flow_id,
                metrics_interval_seconds,
            } => Body::StartRequest(StartRequest {
                flow_id,
                metrics_interval_seconds,
            }),
            RequestBody::Stop { flow_id } => Body::StopRequest(StopRequest { flow_id }),
            RequestBody::AddTunnels { flow_id, tunnels } => {
                Body::AddTunnelsRequest(AddTunnelsRequest {
                    flow_id,
                    tunnels: tunnels.into_iter().map(Tunnel::from).collect(),
                })
            }
            RequestBody::DelTunnels { flow_id, teids } => {
                Body::DelTunnelsRequest(DelTunnelsRequest { flow_id, teids })
            }
            RequestBody::DelAllTunnels { flow_id } => {
                Body::DelAllTunnelsRequest(DelAllTunnelsRequest { flow_id })
            }
            RequestBody::GetInfo { flow_id } => Body::GetInfoRequest(GetInfoRequest { flow_id }),
            RequestBody::Shutdown => Body::ShutdownRequest,
        }
    }
}
