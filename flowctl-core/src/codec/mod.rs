//! Wire codec: `Message` ⇄ bytes.
//!
//! # Wire Protocol
//!
//! ```text
//! length(u16be) || command(u16be) || payload
//! ```
//!
//! Requests and replies share command codes but not payload layouts, so
//! every command has at most one request encoder and at most one reply
//! decoder. They live in [`request`] and [`response`] and are looked up
//! through a table indexed by the command code.

mod request;
mod response;

use std::fmt;

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::command::CommandCode;
use crate::error::FlowError;
use crate::header::{HEADER_SIZE, Header, LENGTH_SIZE};
use crate::message::{Body, Message};

/// Largest frame the header can describe: the length field plus
/// `u16::MAX` counted bytes.
pub const MAX_FRAME_SIZE: usize = LENGTH_SIZE + u16::MAX as usize;

type EncodeFn = fn(&Body, &mut BytesMut) -> Result<(), FlowError>;
type DecodeFn = fn(&mut &[u8]) -> Result<Body, FlowError>;

struct Entry {
    encode: Option<EncodeFn>,
    decode: Option<DecodeFn>,
}

impl Entry {
    const fn unused() -> Self {
        Self {
            encode: None,
            decode: None,
        }
    }

    const fn both(encode: EncodeFn, decode: DecodeFn) -> Self {
        Self {
            encode: Some(encode),
            decode: Some(decode),
        }
    }
}

/// Indexed by `CommandCode as usize`.
static TABLE: [Entry; CommandCode::ALL.len()] = [
    // NONE
    Entry::unused(),
    // START
    Entry::both(request::start, response::start),
    // STOP
    Entry::both(request::stop, response::stop),
    // SHUTDOWN
    Entry {
        encode: Some(request::shutdown),
        decode: None,
    },
    // ADD_TUNNELS
    Entry::both(request::add_tunnels, response::add_tunnels),
    // DEL_TUNNELS
    Entry::both(request::del_tunnels, response::del_tunnels),
    // DEL_ALL_TUNNELS
    Entry::both(request::del_all_tunnels, response::del_all_tunnels),
    // GET_INFO
    Entry::both(request::get_info, response::get_info),
    // ERROR
    Entry {
        encode: None,
        decode: Some(response::error),
    },
    // MSG_ERROR
    Entry {
        encode: None,
        decode: Some(response::flow_error),
    },
    // INVALID
    Entry::unused(),
];

fn entry(command: CommandCode) -> &'static Entry {
    &TABLE[command as usize]
}

/// Encodes a request message.
///
/// The header length is written exactly as carried by `msg`; the codec
/// never recomputes it.
pub fn encode(msg: &Message) -> Result<Bytes, FlowError> {
    let command = msg.command();
    let encoder = entry(command)
        .encode
        .ok_or_else(|| FlowError::InvalidInput(format!("{command} is not a request command")))?;

    let size = HEADER_SIZE + msg.body().payload_len();
    if size > MAX_FRAME_SIZE {
        return Err(FlowError::InvalidInput(format!(
            "{command} frame of {size} bytes exceeds {MAX_FRAME_SIZE}"
        )));
    }

    let mut dst = BytesMut::with_capacity(size);
    msg.header().write_to(&mut dst);
    encoder(msg.body(), &mut dst)?;

    if usize::from(msg.length()) + LENGTH_SIZE != dst.len() {
        debug!(
            %command,
            length = msg.length(),
            frame_len = dst.len(),
            "header length differs from encoded size"
        );
    }
    debug!(%command, frame = %HexDump(&dst), "encoded message");
    Ok(dst.freeze())
}

/// Decodes a reply message.
///
/// String fields that end a reply take every byte left in the buffer,
/// so `bytes` must be exactly one transport frame.
pub fn decode(bytes: &[u8]) -> Result<Message, FlowError> {
    if bytes.is_empty() {
        return Err(FlowError::InvalidInput("empty buffer".into()));
    }
    debug!(frame = %HexDump(bytes), "decoding message");

    let mut src = bytes;
    let header = Header::read_from(&mut src)?;
    let decoder = entry(header.command)
        .decode
        .ok_or(FlowError::UnexpectedCommand(header.command))?;
    let body = decoder(&mut src)?;
    Ok(Message::new(header.length, body))
}

/// Lower-case hex rendering of a frame for log lines.
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
