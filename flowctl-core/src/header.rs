//! Fixed four-byte message header.
//!
//! ```text
//! +----------------+----------------+
//! | length (u16be) | command (u16be)|
//! +----------------+----------------+
//! ```
//!
//! `length` counts everything after the length field itself, i.e. the
//! command code plus the payload. It is informational: payloads are
//! delimited by the transport frame, never by this field.

use bytes::{Buf, BufMut};
use serde::Serialize;

use crate::command::CommandCode;
use crate::error::FlowError;

/// Size of the encoded header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Bytes of the length field itself, not counted by `length`.
pub const LENGTH_SIZE: usize = 2;

/// Bytes of the command field, counted by `length`.
pub const COMMAND_SIZE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    pub length: u16,
    pub command: CommandCode,
}

impl Header {
    pub fn new(length: u16, command: CommandCode) -> Self {
        Self { length, command }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..2].copy_from_slice(&self.length.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.command.as_u16().to_be_bytes());
        bytes
    }

    pub fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u16(self.length);
        dst.put_u16(self.command.as_u16());
    }

    /// Reads a header off the front of `src`, advancing it past the header.
    pub fn read_from<B: Buf>(src: &mut B) -> Result<Self, FlowError> {
        if src.remaining() < HEADER_SIZE {
            return Err(FlowError::InvalidInput(format!(
                "buffer holds {} bytes, header needs {HEADER_SIZE}",
                src.remaining()
            )));
        }
        let length = src.get_u16();
        let command = CommandCode::try_from(src.get_u16())?;
        Ok(Self { length, command })
    }

    /// Parses the header without consuming the buffer.
    pub fn peek(bytes: &[u8]) -> Result<Self, FlowError> {
        let mut view = bytes;
        Self::read_from(&mut view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_big_endian() {
        let header = Header::new(10, CommandCode::Start);
        assert_eq!(header.to_bytes(), [0x00, 0x0A, 0x00, 0x01]);

        let mut buf = Vec::new();
        header.write_to(&mut buf);
        assert_eq!(buf, header.to_bytes());
    }

    #[test]
    fn peek_reads_header() {
        let header = Header::peek(&[0x00, 0x11, 0x00, 0x07, 0xFF]).unwrap();
        assert_eq!(header.length, 17);
        assert_eq!(header.command, CommandCode::GetInfo);
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(matches!(
            Header::peek(&[0x00, 0x06, 0x00]),
            Err(FlowError::InvalidInput(_))
        ));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(matches!(
            Header::peek(&[0x00, 0x02, 0x00, 0x2A]),
            Err(FlowError::UnknownCommand(42))
        ));
    }
}
