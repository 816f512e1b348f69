//! Message-oriented request/reply transport.
//!
//! A transport moves whole frames: one `send` is one protocol message and
//! one `recv` yields exactly one message. The wire codec relies on this,
//! since trailing string fields run to the end of the frame.

pub mod memory;
pub mod tcp;
pub mod zmq;

use std::fmt;
use std::io;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::FlowError;

pub use memory::{MemoryDialer, MemoryTransport};
pub use tcp::{FramedTransport, TcpDialer, TcpTransport};
pub use zmq::{ZmqDialer, ZmqSubDialer, ZmqSubscriber, ZmqTransport};

// ── Traits ───────────────────────────────────────────────────────

/// One open request/reply connection.
///
/// `recv` must be cancel safe: dropping the future before it resolves
/// must not lose a frame that later arrives.
#[async_trait]
pub trait Transport: Send {
    /// Writes one frame.
    async fn send(&mut self, frame: Bytes) -> io::Result<()>;

    /// Waits for the next frame. `Ok(None)` means the peer closed.
    async fn recv(&mut self) -> io::Result<Option<Bytes>>;

    /// Flushes and releases the connection.
    async fn close(&mut self) -> io::Result<()>;
}

/// Opens transports to an [`Endpoint`].
#[async_trait]
pub trait Dialer: Send + Sync {
    type Transport: Transport + 'static;

    /// Makes a single connection attempt.
    async fn dial(&self, endpoint: &Endpoint) -> io::Result<Self::Transport>;
}

// ── Endpoint ─────────────────────────────────────────────────────

/// A `tcp://host:port` address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub const SCHEME: &'static str = "tcp://";

    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, suitable for socket APIs.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", Self::SCHEME, self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(Self::SCHEME)
            .ok_or_else(|| FlowError::InvalidEndpoint(format!("{s}: expected tcp:// scheme")))?;
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| FlowError::InvalidEndpoint(format!("{s}: missing port")))?;
        if host.is_empty() {
            return Err(FlowError::InvalidEndpoint(format!("{s}: missing host")));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| FlowError::InvalidEndpoint(format!("{s}: bad port: {e}")))?;
        Ok(Self::tcp(host, port))
    }
}

// ── Dialing ──────────────────────────────────────────────────────

/// Dials `endpoint` until it succeeds or `timeout` runs out, sleeping
/// `backoff` between attempts. At least one attempt is always made.
pub async fn dial_with_retry<D: Dialer>(
    dialer: &D,
    endpoint: &Endpoint,
    timeout: Duration,
    backoff: Duration,
) -> Result<D::Transport, FlowError> {
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        let budget = if remaining.is_zero() { backoff } else { remaining };

        let error = match tokio::time::timeout(budget, dialer.dial(endpoint)).await {
            Ok(Ok(transport)) => {
                debug!(%endpoint, attempts, "dial succeeded");
                return Ok(transport);
            }
            Ok(Err(e)) => e,
            Err(_) => io::Error::new(io::ErrorKind::TimedOut, "dial attempt timed out"),
        };

        if Instant::now() + backoff >= deadline {
            return Err(FlowError::ConnectFailed {
                endpoint: endpoint.to_string(),
                attempts,
                source: error,
            });
        }
        warn!(%endpoint, attempt = attempts, %error, "dial failed, retrying");
        tokio::time::sleep(backoff).await;
    }
}
