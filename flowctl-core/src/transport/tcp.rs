//! TCP transport: one length-prefixed frame per protocol message.
//!
//! ```text
//! frame_len(u32be) || message bytes
//! ```

use std::io;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use super::{Dialer, Endpoint, Transport};
use crate::codec::MAX_FRAME_SIZE;

pub type TcpTransport = FramedTransport<TcpStream>;

/// Builds the frame codec shared by clients and test servers.
pub fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .big_endian()
        .length_field_length(4)
        .max_frame_length(MAX_FRAME_SIZE)
        .new_codec()
}

/// A transport over any byte stream.
#[derive(Debug)]
pub struct FramedTransport<S> {
    framed: Framed<S, LengthDelimitedCodec>,
}

impl<S> FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: S) -> Self {
        Self {
            framed: Framed::new(io, frame_codec()),
        }
    }

    pub fn get_ref(&self) -> &S {
        self.framed.get_ref()
    }

    pub fn into_inner(self) -> S {
        self.framed.into_inner()
    }
}

#[async_trait]
impl<S> Transport for FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: Bytes) -> io::Result<()> {
        self.framed.send(frame).await
    }

    async fn recv(&mut self) -> io::Result<Option<Bytes>> {
        self.framed
            .next()
            .await
            .transpose()
            .map(|frame| frame.map(BytesMut::freeze))
    }

    async fn close(&mut self) -> io::Result<()> {
        SinkExt::<Bytes>::close(&mut self.framed).await
    }
}

/// Dials plain TCP connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    type Transport = TcpTransport;

    async fn dial(&self, endpoint: &Endpoint) -> io::Result<TcpTransport> {
        let stream = TcpStream::connect(endpoint.authority()).await?;
        stream.set_nodelay(true)?;
        Ok(FramedTransport::new(stream))
    }
}
