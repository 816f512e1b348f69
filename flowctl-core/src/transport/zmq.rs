//! ZeroMQ transports: a REQ socket for requests and a SUB socket for
//! pushed frames.
//!
//! A REQ socket must alternate send and recv, and its `recv` forgets the
//! outstanding request when dropped mid-wait. A driver task therefore owns
//! the socket and runs each send/recv pair to completion, handing replies
//! back over a channel. Waiting on that channel is cancel safe.
//!
//! ```text
//! send ──mpsc──► driver ──ZMTP──► service
//! recv ◄─mpsc─── driver ◄──ZMTP──
//! ```

use std::io;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use zeromq::{ReqSocket, Socket, SocketRecv, SocketSend, SubSocket, ZmqError, ZmqMessage};

use super::{Dialer, Endpoint, Transport};

fn zmq_error(e: ZmqError) -> io::Error {
    io::Error::other(e.to_string())
}

/// Joins a multipart message into one frame.
fn into_frame(msg: ZmqMessage) -> Bytes {
    let mut parts = msg.into_vec();
    if parts.len() == 1 {
        return parts.remove(0);
    }
    let mut frame = BytesMut::with_capacity(parts.iter().map(Bytes::len).sum());
    for part in parts {
        frame.extend_from_slice(&part);
    }
    frame.freeze()
}

// ── REQ ──────────────────────────────────────────────────────────

/// Request/reply connection over a ZeroMQ REQ socket.
pub struct ZmqTransport {
    requests: Option<mpsc::Sender<Bytes>>,
    replies: mpsc::Receiver<io::Result<Bytes>>,
    driver: JoinHandle<()>,
}

impl ZmqTransport {
    /// Connects a REQ socket and completes the ZMTP handshake setup.
    pub async fn connect(endpoint: &Endpoint) -> io::Result<Self> {
        let mut socket = ReqSocket::new();
        socket
            .connect(&endpoint.to_string())
            .await
            .map_err(zmq_error)?;

        let (requests, request_rx) = mpsc::channel(1);
        let (reply_tx, replies) = mpsc::channel(1);
        let driver = tokio::spawn(drive(socket, request_rx, reply_tx));

        Ok(Self {
            requests: Some(requests),
            replies,
            driver,
        })
    }
}

async fn drive(
    mut socket: ReqSocket,
    mut requests: mpsc::Receiver<Bytes>,
    replies: mpsc::Sender<io::Result<Bytes>>,
) {
    while let Some(frame) = requests.recv().await {
        let outcome = match socket.send(ZmqMessage::from(frame)).await {
            Ok(()) => socket.recv().await.map(into_frame).map_err(zmq_error),
            Err(e) => Err(zmq_error(e)),
        };
        let failed = outcome.is_err();
        if let Err(e) = &outcome {
            warn!("zmq request failed: {e}");
        }
        // REQ sockets cannot recover from a broken send/recv cycle.
        if replies.send(outcome).await.is_err() || failed {
            break;
        }
    }
    debug!("zmq driver exiting");
}

#[async_trait]
impl Transport for ZmqTransport {
    async fn send(&mut self, frame: Bytes) -> io::Result<()> {
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "transport closed"))?;
        requests
            .send(frame)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "zmq driver stopped"))
    }

    async fn recv(&mut self) -> io::Result<Option<Bytes>> {
        self.replies.recv().await.transpose()
    }

    async fn close(&mut self) -> io::Result<()> {
        self.requests = None;
        self.replies.close();
        self.driver.abort();
        Ok(())
    }
}

impl Drop for ZmqTransport {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// Dials ZeroMQ REQ connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZmqDialer;

#[async_trait]
impl Dialer for ZmqDialer {
    type Transport = ZmqTransport;

    async fn dial(&self, endpoint: &Endpoint) -> io::Result<ZmqTransport> {
        ZmqTransport::connect(endpoint).await
    }
}

// ── SUB ──────────────────────────────────────────────────────────

/// Receive-only connection over a ZeroMQ SUB socket.
pub struct ZmqSubscriber {
    socket: SubSocket,
}

impl ZmqSubscriber {
    pub async fn connect(endpoint: &Endpoint, topic: &str) -> io::Result<Self> {
        let mut socket = SubSocket::new();
        socket
            .connect(&endpoint.to_string())
            .await
            .map_err(zmq_error)?;
        socket.subscribe(topic).await.map_err(zmq_error)?;
        Ok(Self { socket })
    }
}

#[async_trait]
impl Transport for ZmqSubscriber {
    async fn send(&mut self, _frame: Bytes) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "SUB sockets cannot send",
        ))
    }

    async fn recv(&mut self) -> io::Result<Option<Bytes>> {
        self.socket
            .recv()
            .await
            .map(|msg| Some(into_frame(msg)))
            .map_err(zmq_error)
    }

    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Dials SUB connections subscribed to `topic` (empty for everything).
#[derive(Debug, Clone, Default)]
pub struct ZmqSubDialer {
    pub topic: String,
}

#[async_trait]
impl Dialer for ZmqSubDialer {
    type Transport = ZmqSubscriber;

    async fn dial(&self, endpoint: &Endpoint) -> io::Result<ZmqSubscriber> {
        ZmqSubscriber::connect(endpoint, &self.topic).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_part_message_is_passed_through() {
        let frame = into_frame(ZmqMessage::from(Bytes::from_static(b"\x00\x06\x00\x02")));
        assert_eq!(&frame[..], b"\x00\x06\x00\x02");
    }

    #[test]
    fn multipart_message_is_joined() {
        let mut msg = ZmqMessage::from(Bytes::from_static(b"ab"));
        msg.push_back(Bytes::from_static(b"cd"));
        assert_eq!(&into_frame(msg)[..], b"abcd");
    }
}
