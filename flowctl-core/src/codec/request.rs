//! Request encoders, one per sendable command.
//!
//! Each encoder writes only the payload; the header is already in `dst`.

use bytes::{BufMut, BytesMut};

use crate::error::FlowError;
use crate::message::Body;

fn mismatch(expected: &'static str) -> FlowError {
    FlowError::InvalidInput(format!("payload is not a {expected}"))
}

fn put_count(dst: &mut BytesMut, len: usize) -> Result<(), FlowError> {
    let count = u32::try_from(len)
        .map_err(|_| FlowError::InvalidInput(format!("{len} entries do not fit in a u32 count")))?;
    dst.put_u32(count);
    Ok(())
}

pub(super) fn start(body: &Body, dst: &mut BytesMut) -> Result<(), FlowError> {
    let Body::StartRequest(req) = body else {
        return Err(mismatch("start request"));
    };
    dst.put_u32(req.flow_id);
    dst.put_u32(req.metrics_interval_seconds);
    Ok(())
}

pub(super) fn stop(body: &Body, dst: &mut BytesMut) -> Result<(), FlowError> {
    let Body::StopRequest(req) = body else {
        return Err(mismatch("stop request"));
    };
    dst.put_u32(req.flow_id);
    Ok(())
}

pub(super) fn shutdown(body: &Body, _dst: &mut BytesMut) -> Result<(), FlowError> {
    match body {
        Body::ShutdownRequest => Ok(()),
        _ => Err(mismatch("shutdown request")),
    }
}

pub(super) fn add_tunnels(body: &Body, dst: &mut BytesMut) -> Result<(), FlowError> {
    let Body::AddTunnelsRequest(req) = body else {
        return Err(mismatch("add-tunnels request"));
    };
    dst.put_u32(req.flow_id);
    put_count(dst, req.tunnels.len())?;
    for tunnel in &req.tunnels {
        dst.put_u32(tunnel.teid_in);
        dst.put_u32(tunnel.teid_out);
        dst.put_u32(tunnel.ue_address);
        dst.put_u32(tunnel.server_address);
    }
    Ok(())
}

pub(super) fn del_tunnels(body: &Body, dst: &mut BytesMut) -> Result<(), FlowError> {
    let Body::DelTunnelsRequest(req) = body else {
        return Err(mismatch("del-tunnels request"));
    };
    dst.put_u32(req.flow_id);
    put_count(dst, req.teids.len())?;
    for teid in &req.teids {
        dst.put_u32(*teid);
    }
    Ok(())
}

pub(super) fn del_all_tunnels(body: &Body, dst: &mut BytesMut) -> Result<(), FlowError> {
    let Body::DelAllTunnelsRequest(req) = body else {
        return Err(mismatch("del-all-tunnels request"));
    };
    dst.put_u32(req.flow_id);
    // tunnel count, unused on the request side
    dst.put_u32(0);
    Ok(())
}

pub(super) fn get_info(body: &Body, dst: &mut BytesMut) -> Result<(), FlowError> {
    let Body::GetInfoRequest(req) = body else {
        return Err(mismatch("get-info request"));
    };
    dst.put_u32(req.flow_id);
    Ok(())
}
