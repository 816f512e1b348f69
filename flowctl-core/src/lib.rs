//! # flowctl-core
//!
//! Client library for the flow/tunnel management service.
//!
//! This crate contains:
//! - **Protocol types**: `Header`, `CommandCode`, `Message`, `Body` and the
//!   request/response payloads
//! - **Codec**: table-driven `encode`/`decode` of the big-endian wire format
//! - **Transport**: `Transport`/`Dialer` traits; ZeroMQ REQ/SUB sockets by
//!   default, length-framed TCP and in-memory for tests
//! - **Session**: `SessionClient` request/reply with receive timeouts
//! - **Control**: `FlowControl`, one typed call per service command
//! - **Listener**: bounded-queue worker pool for pushed frames
//! - **Input**: JSON `RequestDocument`s
//! - **Error**: `FlowError`, typed and `thiserror`-based

pub mod codec;
pub mod command;
pub mod config;
pub mod control;
pub mod error;
pub mod header;
pub mod input;
pub mod listener;
pub mod message;
pub mod session;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{MAX_FRAME_SIZE, decode, encode};
pub use command::CommandCode;
pub use config::{ClientOptions, ListenerConfig, TransportKind};
pub use control::FlowControl;
pub use error::FlowError;
pub use header::{HEADER_SIZE, Header};
pub use input::{RequestBody, RequestDocument, TunnelDocument};
pub use listener::{FrameHandler, Listener, ListenerStats};
pub use message::{
    AddTunnelsRequest, Body, DelAllTunnelsRequest, DelTunnelsRequest, ErrorResponse,
    FlowErrorResponse, GetInfoRequest, GetInfoResponse, Message, Response, StartRequest,
    StartResponse, StopRequest, Tunnel, TunnelResponse,
};
pub use session::{Reply, SessionClient, SessionPhase};
pub use transport::{
    Dialer, Endpoint, FramedTransport, MemoryDialer, MemoryTransport, TcpDialer, TcpTransport,
    Transport, ZmqDialer, ZmqSubDialer, ZmqSubscriber, ZmqTransport,
};
