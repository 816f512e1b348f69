//! Typed flow-control operations on top of a [`SessionClient`].
//!
//! Each call encodes one request, waits `reply_timeout` for the answer and
//! decodes it. `ERROR` and `MSG_ERROR` replies surface as
//! [`FlowError::Server`] and [`FlowError::Flow`].

use tracing::{debug, instrument};

use crate::codec::{self, HexDump};
use crate::command::CommandCode;
use crate::config::ClientOptions;
use crate::error::FlowError;
use crate::header::Header;
use crate::message::{
    Body, GetInfoResponse, Message, Response, StartResponse, Tunnel, TunnelResponse,
};
use crate::session::{Reply, SessionClient};
use crate::transport::{Dialer, ZmqDialer};

pub struct FlowControl<D: Dialer = ZmqDialer> {
    session: SessionClient<D>,
}

impl FlowControl<ZmqDialer> {
    pub fn new(options: ClientOptions) -> Self {
        Self::with_session(SessionClient::new(options))
    }
}

impl<D: Dialer> FlowControl<D> {
    pub fn with_session(session: SessionClient<D>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionClient<D> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionClient<D> {
        &mut self.session
    }

    /// Connects using the configured connect timeout.
    pub async fn connect(&mut self) -> Result<(), FlowError> {
        let timeout = self.session.options().connect_timeout();
        self.session.connect(timeout).await
    }

    pub async fn close(&mut self) -> Result<(), FlowError> {
        self.session.close().await
    }

    /// Sends any request and returns the matching reply.
    ///
    /// The reply must carry the request's command code; anything else is
    /// [`FlowError::UnexpectedResponse`].
    #[instrument(level = "debug", skip_all, fields(command = %request.command()))]
    pub async fn execute(&mut self, request: &Message) -> Result<Message, FlowError> {
        let reply = self.round_trip(request).await?;
        let message = codec::decode(&reply)?.classify()?;
        if message.command() != request.command() {
            return Err(FlowError::UnexpectedResponse {
                expected: request.command(),
                actual: message.command(),
            });
        }
        Ok(message)
    }

    pub async fn start(
        &mut self,
        flow_id: u32,
        metrics_interval_seconds: u32,
    ) -> Result<StartResponse, FlowError> {
        match self.execute(&Message::start(flow_id, metrics_interval_seconds)).await?.into_body() {
            Body::StartResponse(resp) => Ok(resp),
            other => Err(mismatch(CommandCode::Start, &other)),
        }
    }

    pub async fn stop(&mut self, flow_id: u32) -> Result<Response, FlowError> {
        match self.execute(&Message::stop(flow_id)).await?.into_body() {
            Body::Response(resp) => Ok(resp),
            other => Err(mismatch(CommandCode::Stop, &other)),
        }
    }

    pub async fn add_tunnels(
        &mut self,
        flow_id: u32,
        tunnels: Vec<Tunnel>,
    ) -> Result<TunnelResponse, FlowError> {
        match self.execute(&Message::add_tunnels(flow_id, tunnels)).await?.into_body() {
            Body::AddTunnelsResponse(resp) => Ok(resp),
            other => Err(mismatch(CommandCode::AddTunnels, &other)),
        }
    }

    pub async fn del_tunnels(
        &mut self,
        flow_id: u32,
        teids: Vec<u32>,
    ) -> Result<TunnelResponse, FlowError> {
        match self.execute(&Message::del_tunnels(flow_id, teids)).await?.into_body() {
            Body::DelTunnelsResponse(resp) => Ok(resp),
            other => Err(mismatch(CommandCode::DelTunnels, &other)),
        }
    }

    pub async fn del_all_tunnels(&mut self, flow_id: u32) -> Result<TunnelResponse, FlowError> {
        match self.execute(&Message::del_all_tunnels(flow_id)).await?.into_body() {
            Body::DelAllTunnelsResponse(resp) => Ok(resp),
            other => Err(mismatch(CommandCode::DelAllTunnels, &other)),
        }
    }

    pub async fn get_info(&mut self, flow_id: u32) -> Result<GetInfoResponse, FlowError> {
        match self.execute(&Message::get_info(flow_id)).await?.into_body() {
            Body::GetInfoResponse(resp) => Ok(resp),
            other => Err(mismatch(CommandCode::GetInfo, &other)),
        }
    }

    /// Asks the service to exit.
    ///
    /// SHUTDOWN has no decodable reply, so any answer other than `ERROR`
    /// or `MSG_ERROR` counts as acknowledgement.
    pub async fn shutdown(&mut self) -> Result<(), FlowError> {
        let reply = self.round_trip(&Message::shutdown()).await?;
        let header = Header::peek(&reply)?;
        match header.command {
            CommandCode::Error | CommandCode::MsgError => {
                codec::decode(&reply)?.classify()?;
                Ok(())
            }
            command => {
                debug!(%command, "shutdown acknowledged");
                Ok(())
            }
        }
    }

    async fn round_trip(&mut self, request: &Message) -> Result<bytes::Bytes, FlowError> {
        let frame = codec::encode(request)?;
        let timeout = self.session.options().reply_timeout();
        match self.session.send_and_receive_with_timeout(frame, timeout).await? {
            Reply::Frame(reply) => {
                debug!(reply = %HexDump(&reply), "reply");
                Ok(reply)
            }
            Reply::TimedOut => Err(FlowError::Timeout(timeout)),
        }
    }
}

fn mismatch(expected: CommandCode, body: &Body) -> FlowError {
    FlowError::UnexpectedResponse {
        expected,
        actual: body.command(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryDialer, MemoryTransport, Transport};
    use bytes::Bytes;

    async fn control_with_server() -> (FlowControl<MemoryDialer>, MemoryTransport) {
        let dialer = MemoryDialer::new();
        let (client, server) = MemoryTransport::pair(4);
        dialer.push(client);
        let options = ClientOptions {
            reply_timeout_secs: 1,
            ..ClientOptions::new("memory", 1)
        };
        let mut control = FlowControl::with_session(SessionClient::with_dialer(options, dialer));
        control.connect().await.unwrap();
        (control, server)
    }

    fn reply_with(
        mut server: MemoryTransport,
        reply: &'static [u8],
    ) -> tokio::task::JoinHandle<Bytes> {
        tokio::spawn(async move {
            let request = server.recv().await.unwrap().unwrap();
            server.send(Bytes::from_static(reply)).await.unwrap();
            request
        })
    }

    #[tokio::test]
    async fn start_round_trip() {
        let (mut control, server) = control_with_server().await;
        let server = reply_with(
            server,
            b"\x00\x11\x00\x01\x00\x00\x04\xd1local:59001",
        );

        let resp = control.start(1233, 5).await.unwrap();
        assert_eq!(resp.flow_id, 1233);
        assert_eq!(resp.publisher_address, "local:59001");

        let request = server.await.unwrap();
        assert_eq!(
            &request[..],
            &[0x00, 0x0A, 0x00, 0x01, 0x00, 0x00, 0x04, 0xD1, 0x00, 0x00, 0x00, 0x05]
        );
    }

    #[tokio::test]
    async fn msg_error_is_a_flow_error() {
        let (mut control, server) = control_with_server().await;
        let _server = reply_with(server, b"\x00\x0e\x00\x09\x00\x00\x04\xd1bad flow");

        match control.stop(1233).await {
            Err(FlowError::Flow { flow_id, message }) => {
                assert_eq!(flow_id, 1233);
                assert_eq!(message, "bad flow");
            }
            other => panic!("expected flow error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reply_for_another_command_is_rejected() {
        let (mut control, server) = control_with_server().await;
        let _server = reply_with(server, b"\x00\x06\x00\x02\x00\x00\x04\xd1");

        let err = control.get_info(1233).await.unwrap_err();
        assert!(matches!(
            err,
            FlowError::UnexpectedResponse {
                expected: CommandCode::GetInfo,
                actual: CommandCode::Stop,
            }
        ));
    }

    #[tokio::test]
    async fn shutdown_accepts_any_non_error_reply() {
        let (mut control, server) = control_with_server().await;
        let server = reply_with(server, b"\x00\x02\x00\x03");
        control.shutdown().await.unwrap();
        assert_eq!(&server.await.unwrap()[..], &[0x00, 0x02, 0x00, 0x03]);
    }

    #[tokio::test]
    async fn shutdown_reports_server_error() {
        let (mut control, server) = control_with_server().await;
        let _server = reply_with(server, b"\x00\x06\x00\x08busy");
        assert!(matches!(
            control.shutdown().await,
            Err(FlowError::Server { message }) if message == "busy"
        ));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let (mut control, _server) = control_with_server().await;
        let err = control.stop(1).await.unwrap_err();
        assert!(matches!(err, FlowError::Timeout(_)));
        assert!(err.is_retryable());
    }
}
