//! Reply decoders, one per reply-carrying command.
//!
//! Decoders receive the buffer positioned just after the header. A reply
//! that is too short for its fixed fields is rejected outright.

use bytes::Buf;

use crate::error::FlowError;
use crate::message::{
    Body, ErrorResponse, FlowErrorResponse, GetInfoResponse, Response, StartResponse,
    TunnelResponse,
};

fn read_u32(src: &mut &[u8], field: &'static str) -> Result<u32, FlowError> {
    if src.remaining() < 4 {
        return Err(FlowError::InvalidInput(format!(
            "reply truncated at {field}: {} byte(s) left, need 4",
            src.remaining()
        )));
    }
    Ok(src.get_u32())
}

/// Takes every remaining byte as a UTF-8 string.
///
/// Only valid for the last field of a reply: the protocol relies on
/// transport framing instead of a length prefix or terminator.
fn read_trailing_string(src: &mut &[u8]) -> Result<String, FlowError> {
    let text = String::from_utf8(src.to_vec())?;
    src.advance(src.remaining());
    Ok(text)
}

fn read_tunnel_response(src: &mut &[u8]) -> Result<TunnelResponse, FlowError> {
    Ok(TunnelResponse {
        flow_id: read_u32(src, "flow_id")?,
        tunnel_count: read_u32(src, "tunnel_count")?,
    })
}

pub(super) fn start(src: &mut &[u8]) -> Result<Body, FlowError> {
    let flow_id = read_u32(src, "flow_id")?;
    let publisher_address = read_trailing_string(src)?;
    Ok(Body::StartResponse(StartResponse {
        flow_id,
        publisher_address,
    }))
}

pub(super) fn stop(src: &mut &[u8]) -> Result<Body, FlowError> {
    Ok(Body::Response(Response {
        flow_id: read_u32(src, "flow_id")?,
    }))
}

pub(super) fn add_tunnels(src: &mut &[u8]) -> Result<Body, FlowError> {
    read_tunnel_response(src).map(Body::AddTunnelsResponse)
}

pub(super) fn del_tunnels(src: &mut &[u8]) -> Result<Body, FlowError> {
    read_tunnel_response(src).map(Body::DelTunnelsResponse)
}

pub(super) fn del_all_tunnels(src: &mut &[u8]) -> Result<Body, FlowError> {
    read_tunnel_response(src).map(Body::DelAllTunnelsResponse)
}

pub(super) fn get_info(src: &mut &[u8]) -> Result<Body, FlowError> {
    let flow_id = read_u32(src, "flow_id")?;
    let version = read_trailing_string(src)?;
    Ok(Body::GetInfoResponse(GetInfoResponse { flow_id, version }))
}

pub(super) fn error(src: &mut &[u8]) -> Result<Body, FlowError> {
    Ok(Body::ErrorResponse(ErrorResponse {
        message: read_trailing_string(src)?,
    }))
}

pub(super) fn flow_error(src: &mut &[u8]) -> Result<Body, FlowError> {
    let flow_id = read_u32(src, "flow_id")?;
    let message = read_trailing_string(src)?;
    Ok(Body::FlowErrorResponse(FlowErrorResponse { flow_id, message }))
}
