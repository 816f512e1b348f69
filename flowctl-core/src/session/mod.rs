//! Request/reply session over a [`Transport`].
//!
//! One request is in flight at a time. A caller sends a frame, then waits
//! for its reply with a deadline; a timeout is reported as
//! [`Reply::TimedOut`], not as an error, so slow servers can be told
//! apart from broken ones.

mod phase;

pub use phase::SessionPhase;

use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::config::ClientOptions;
use crate::error::FlowError;
use crate::transport::{Dialer, Transport, ZmqDialer, dial_with_retry};

/// Outcome of waiting for a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// One complete reply frame.
    Frame(Bytes),
    /// Nothing arrived before the deadline.
    TimedOut,
}

impl Reply {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Reply::TimedOut)
    }

    pub fn into_frame(self) -> Option<Bytes> {
        match self {
            Reply::Frame(frame) => Some(frame),
            Reply::TimedOut => None,
        }
    }
}

/// Owns one transport connection to the service.
pub struct SessionClient<D: Dialer = ZmqDialer> {
    options: ClientOptions,
    dialer: D,
    transport: Option<D::Transport>,
    phase: SessionPhase,
}

impl SessionClient<ZmqDialer> {
    /// A session over a ZeroMQ REQ socket.
    pub fn new(options: ClientOptions) -> Self {
        Self::with_dialer(options, ZmqDialer)
    }
}

impl<D: Dialer> SessionClient<D> {
    pub fn with_dialer(options: ClientOptions, dialer: D) -> Self {
        Self {
            options,
            dialer,
            transport: None,
            phase: SessionPhase::Disconnected,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase.is_connected()
    }

    /// Opens the transport, re-dialing every `dial_backoff` until
    /// `timeout` has elapsed. An existing connection is closed first.
    pub async fn connect(&mut self, timeout: Duration) -> Result<(), FlowError> {
        if self.transport.is_some() {
            debug!("connect on an open session, closing the old transport");
            self.close().await?;
        }

        let endpoint = self.options.endpoint();
        info!(%endpoint, ?timeout, "connecting");
        let transport =
            dial_with_retry(&self.dialer, &endpoint, timeout, self.options.dial_backoff()).await?;
        self.transport = Some(transport);
        self.phase = SessionPhase::Ready;
        info!(%endpoint, "connected");
        Ok(())
    }

    /// Writes one request frame.
    ///
    /// Fails with [`FlowError::RequestOutstanding`] while a previous reply
    /// is pending. After a timed-out request the transport is re-dialed
    /// first so a late reply cannot be mistaken for this request's reply.
    pub async fn send(&mut self, frame: Bytes) -> Result<(), FlowError> {
        if self.phase.check_send()? {
            warn!("previous request has no reply, re-dialing before send");
            self.redial().await?;
        }

        let transport = self.transport.as_mut().ok_or(FlowError::NotConnected)?;
        if let Err(e) = transport.send(frame).await {
            self.phase = SessionPhase::Stale;
            return Err(FlowError::SendFailed(e));
        }
        self.phase = SessionPhase::AwaitingReply;
        Ok(())
    }

    /// Waits up to `timeout` for one reply frame.
    ///
    /// A receive still pending at the deadline is dropped; the transport
    /// keeps any frame that arrives later.
    pub async fn receive_with_timeout(&mut self, timeout: Duration) -> Result<Reply, FlowError> {
        let transport = self.transport.as_mut().ok_or(FlowError::NotConnected)?;

        match tokio::time::timeout(timeout, transport.recv()).await {
            Err(_elapsed) => {
                debug!(?timeout, "no reply before deadline");
                self.phase = self.phase.on_timeout();
                Ok(Reply::TimedOut)
            }
            Ok(Ok(Some(frame))) => {
                self.phase = SessionPhase::Ready;
                Ok(Reply::Frame(frame))
            }
            Ok(Ok(None)) => {
                self.phase = SessionPhase::Stale;
                Err(FlowError::TransportClosed)
            }
            Ok(Err(e)) => {
                self.phase = SessionPhase::Stale;
                Err(FlowError::Transport(e))
            }
        }
    }

    /// `send` followed by `receive_with_timeout`. Nothing is received if
    /// the send fails.
    pub async fn send_and_receive_with_timeout(
        &mut self,
        frame: Bytes,
        timeout: Duration,
    ) -> Result<Reply, FlowError> {
        self.send(frame).await?;
        self.receive_with_timeout(timeout).await
    }

    /// Releases the transport. Closing a closed session is a no-op.
    pub async fn close(&mut self) -> Result<(), FlowError> {
        self.phase = SessionPhase::Disconnected;
        match self.transport.take() {
            Some(mut transport) => {
                transport.close().await?;
                info!(endpoint = %self.options.endpoint(), "closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn redial(&mut self) -> Result<(), FlowError> {
        if let Some(mut stale) = self.transport.take() {
            if let Err(e) = stale.close().await {
                debug!(error = %e, "closing stale transport failed");
            }
        }
        self.phase = SessionPhase::Disconnected;

        let endpoint = self.options.endpoint();
        let transport = dial_with_retry(
            &self.dialer,
            &endpoint,
            self.options.connect_timeout(),
            self.options.dial_backoff(),
        )
        .await?;
        self.transport = Some(transport);
        self.phase = SessionPhase::Ready;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryDialer, MemoryTransport};
    use tokio::time::Instant;

    fn options() -> ClientOptions {
        ClientOptions {
            dial_backoff_ms: 10,
            connect_timeout_secs: 1,
            ..ClientOptions::new("memory", 1)
        }
    }

    async fn connected() -> (SessionClient<MemoryDialer>, MemoryTransport) {
        let dialer = MemoryDialer::new();
        let (client, server) = MemoryTransport::pair(8);
        dialer.push(client);
        let mut session = SessionClient::with_dialer(options(), dialer);
        session.connect(Duration::from_secs(1)).await.unwrap();
        (session, server)
    }

    #[tokio::test]
    async fn send_requires_connect() {
        let mut session = SessionClient::with_dialer(options(), MemoryDialer::new());
        assert!(matches!(
            session.send(Bytes::from_static(b"x")).await,
            Err(FlowError::NotConnected)
        ));
        assert!(matches!(
            session.receive_with_timeout(Duration::from_millis(10)).await,
            Err(FlowError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn failed_connect_stays_disconnected() {
        let mut session = SessionClient::with_dialer(options(), MemoryDialer::new());
        let err = session.connect(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, FlowError::ConnectFailed { .. }));
        assert_eq!(session.phase(), SessionPhase::Disconnected);
    }

    #[tokio::test]
    async fn request_reply_cycle() {
        let (mut session, mut server) = connected().await;

        session.send(Bytes::from_static(b"req")).await.unwrap();
        assert_eq!(session.phase(), SessionPhase::AwaitingReply);

        assert_eq!(server.recv().await.unwrap().unwrap(), Bytes::from_static(b"req"));
        server.send(Bytes::from_static(b"rep")).await.unwrap();

        let reply = session
            .receive_with_timeout(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply, Reply::Frame(Bytes::from_static(b"rep")));
        assert_eq!(session.phase(), SessionPhase::Ready);
    }

    #[tokio::test]
    async fn second_send_before_reply_is_rejected() {
        let (mut session, _server) = connected().await;
        session.send(Bytes::from_static(b"one")).await.unwrap();
        assert!(matches!(
            session.send(Bytes::from_static(b"two")).await,
            Err(FlowError::RequestOutstanding)
        ));
    }

    #[tokio::test]
    async fn timeout_is_an_outcome_not_an_error() {
        let (mut session, _server) = connected().await;
        session.send(Bytes::from_static(b"req")).await.unwrap();

        let started = Instant::now();
        let reply = session
            .receive_with_timeout(Duration::from_millis(100))
            .await
            .unwrap();
        assert!(reply.is_timed_out());
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(session.phase(), SessionPhase::Stale);
    }

    #[tokio::test]
    async fn late_reply_can_still_be_awaited() {
        let (mut session, mut server) = connected().await;
        session.send(Bytes::from_static(b"req")).await.unwrap();
        assert!(
            session
                .receive_with_timeout(Duration::from_millis(20))
                .await
                .unwrap()
                .is_timed_out()
        );

        server.send(Bytes::from_static(b"late")).await.unwrap();
        let reply = session
            .receive_with_timeout(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply.into_frame().unwrap(), Bytes::from_static(b"late"));
        assert_eq!(session.phase(), SessionPhase::Ready);
    }

    #[tokio::test]
    async fn send_after_timeout_redials() {
        let dialer = MemoryDialer::new();
        let (first, mut first_server) = MemoryTransport::pair(8);
        let (second, mut second_server) = MemoryTransport::pair(8);
        dialer.push(first);
        dialer.push(second);

        let mut session = SessionClient::with_dialer(options(), dialer);
        session.connect(Duration::from_secs(1)).await.unwrap();
        session.send(Bytes::from_static(b"slow")).await.unwrap();
        assert!(
            session
                .receive_with_timeout(Duration::from_millis(20))
                .await
                .unwrap()
                .is_timed_out()
        );

        // late reply on the abandoned transport
        let _ = first_server.send(Bytes::from_static(b"stale")).await;

        session.send(Bytes::from_static(b"fresh")).await.unwrap();
        assert_eq!(
            second_server.recv().await.unwrap().unwrap(),
            Bytes::from_static(b"fresh")
        );
        second_server.send(Bytes::from_static(b"ok")).await.unwrap();

        let reply = session
            .receive_with_timeout(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply, Reply::Frame(Bytes::from_static(b"ok")));
        assert_eq!(session.dialer.attempts(), 2);
        assert!(first_server.recv().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn peer_close_is_a_transport_error() {
        let (mut session, server) = connected().await;
        session.send(Bytes::from_static(b"req")).await.unwrap();
        drop(server);
        assert!(matches!(
            session.receive_with_timeout(Duration::from_secs(1)).await,
            Err(FlowError::TransportClosed)
        ));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (mut session, _server) = connected().await;
        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Disconnected);
    }
}
