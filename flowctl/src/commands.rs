//! Subcommands and their execution.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use clap::Subcommand;
use serde_json::{Value, json};
use tracing::{info, warn};

use flowctl_core::codec::HexDump;
use flowctl_core::transport::{Dialer, dial_with_retry};
use flowctl_core::{
    CommandCode, Endpoint, FlowControl, FlowError, FrameHandler, Listener, RequestDocument,
    SessionClient, TcpDialer, TransportKind, Tunnel, ZmqSubDialer, decode,
};

use crate::config::FlowctlConfig;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a flow and report its metrics publisher address.
    Start {
        flow_id: u32,
        /// Metrics reporting interval in seconds.
        #[arg(short, long, default_value_t = 5)]
        interval: u32,
    },
    /// Stop a flow.
    Stop { flow_id: u32 },
    /// Add tunnels to a flow.
    AddTunnels {
        flow_id: u32,
        /// TEID_IN:TEID_OUT:UE_IP:SERVER_IP, repeatable.
        #[arg(short, long = "tunnel", value_parser = parse_tunnel, required = true)]
        tunnels: Vec<Tunnel>,
    },
    /// Remove tunnels from a flow by incoming TEID.
    DelTunnels {
        flow_id: u32,
        #[arg(required = true)]
        teids: Vec<u32>,
    },
    /// Remove every tunnel of a flow.
    DelAllTunnels { flow_id: u32 },
    /// Query service information for a flow.
    GetInfo { flow_id: u32 },
    /// Ask the service to exit.
    Shutdown,
    /// Send a request described by a JSON document.
    Send { file: PathBuf },
    /// Print frames pushed by a publisher until Ctrl-C.
    Listen {
        /// Publisher address; defaults to the configured service endpoint.
        endpoint: Option<Endpoint>,
    },
}

/// Parses `TEID_IN:TEID_OUT:UE_IP:SERVER_IP`.
pub fn parse_tunnel(s: &str) -> Result<Tunnel, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let &[teid_in, teid_out, ue, server] = parts.as_slice() else {
        return Err(format!("expected TEID_IN:TEID_OUT:UE_IP:SERVER_IP, got {s:?}"));
    };
    let teid = |v: &str| v.parse::<u32>().map_err(|e| format!("bad teid {v:?}: {e}"));
    let addr = |v: &str| v.parse::<Ipv4Addr>().map_err(|e| format!("bad address {v:?}: {e}"));
    Ok(Tunnel::new(
        teid(teid_in)?,
        teid(teid_out)?,
        addr(ue)?,
        addr(server)?,
    ))
}

/// Runs one subcommand and returns what to print.
pub async fn run(command: Command, config: &FlowctlConfig) -> Result<Value, FlowError> {
    if let Command::Listen { endpoint } = command {
        let endpoint = endpoint.unwrap_or_else(|| config.network.endpoint());
        return listen(endpoint, config).await;
    }

    match config.network.transport {
        TransportKind::Zmq => one_shot(FlowControl::new(config.network.clone()), command).await,
        TransportKind::Framed => {
            let session = SessionClient::with_dialer(config.network.clone(), TcpDialer);
            one_shot(FlowControl::with_session(session), command).await
        }
    }
}

async fn one_shot<D: Dialer>(
    mut control: FlowControl<D>,
    command: Command,
) -> Result<Value, FlowError> {
    control.connect().await?;
    let result = request(&mut control, command).await;
    if let Err(e) = control.close().await {
        warn!("close failed: {e}");
    }
    result
}

async fn request<D: Dialer>(
    control: &mut FlowControl<D>,
    command: Command,
) -> Result<Value, FlowError> {
    let value = match command {
        Command::Start { flow_id, interval } => to_json(&control.start(flow_id, interval).await?),
        Command::Stop { flow_id } => to_json(&control.stop(flow_id).await?),
        Command::AddTunnels { flow_id, tunnels } => {
            to_json(&control.add_tunnels(flow_id, tunnels).await?)
        }
        Command::DelTunnels { flow_id, teids } => {
            to_json(&control.del_tunnels(flow_id, teids).await?)
        }
        Command::DelAllTunnels { flow_id } => to_json(&control.del_all_tunnels(flow_id).await?),
        Command::GetInfo { flow_id } => to_json(&control.get_info(flow_id).await?),
        Command::Shutdown => {
            control.shutdown().await?;
            json!({ "shutdown": "acknowledged" })
        }
        Command::Send { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .map_err(|e| FlowError::InvalidInput(format!("{}: {e}", file.display())))?;
            let message = RequestDocument::from_json(&text)?.into_message();
            if message.command() == CommandCode::Shutdown {
                control.shutdown().await?;
                json!({ "shutdown": "acknowledged" })
            } else {
                to_json(&control.execute(&message).await?)
            }
        }
        Command::Listen { .. } => {
            return Err(FlowError::InvalidInput("listen is not a request".into()));
        }
    };
    Ok(value)
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// ── Listen ───────────────────────────────────────────────────────

/// Prints each pushed frame as one JSON line.
struct PrintFrames;

#[async_trait]
impl FrameHandler for PrintFrames {
    async fn handle(&self, frame: Bytes) -> Result<(), FlowError> {
        match decode(&frame) {
            Ok(msg) => {
                println!("{}", to_json(&msg));
                Ok(())
            }
            Err(e) => {
                warn!(frame = %HexDump(&frame), "undecodable frame");
                Err(e)
            }
        }
    }
}

async fn listen(endpoint: Endpoint, config: &FlowctlConfig) -> Result<Value, FlowError> {
    match config.network.transport {
        TransportKind::Zmq => listen_on(&ZmqSubDialer::default(), endpoint, config).await,
        TransportKind::Framed => listen_on(&TcpDialer, endpoint, config).await,
    }
}

async fn listen_on<D: Dialer>(
    dialer: &D,
    endpoint: Endpoint,
    config: &FlowctlConfig,
) -> Result<Value, FlowError> {
    let net = &config.network;
    let transport: D::Transport =
        dial_with_retry(dialer, &endpoint, net.connect_timeout(), net.dial_backoff()).await?;
    info!(%endpoint, transport = ?net.transport, "listening");

    let listener = Listener::spawn(transport, Arc::new(PrintFrames), &config.listener);
    let stop = listener.stop_token();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, stopping listener"),
        _ = stop.cancelled() => {}
        _ = wait_finished(&listener) => info!("publisher closed the connection"),
    }

    let stats = listener.shutdown().await;
    Ok(to_json(&stats))
}

async fn wait_finished(listener: &Listener) {
    while !listener.is_finished() {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tunnel_argument() {
        let tunnel = parse_tunnel("1:1001:10.0.0.1:192.168.1.1").unwrap();
        assert_eq!(tunnel.teid_in, 1);
        assert_eq!(tunnel.teid_out, 1001);
        assert_eq!(tunnel.ue_ipv4(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(tunnel.server_ipv4(), Ipv4Addr::new(192, 168, 1, 1));
    }

    #[test]
    fn malformed_tunnel_argument() {
        assert!(parse_tunnel("1:1001:10.0.0.1").is_err());
        assert!(parse_tunnel("x:1001:10.0.0.1:192.168.1.1").is_err());
        assert!(parse_tunnel("1:1001:10.0.0.256:192.168.1.1").is_err());
    }

    #[test]
    fn responses_render_as_json() {
        let value = to_json(&flowctl_core::TunnelResponse {
            flow_id: 7,
            tunnel_count: 2,
        });
        assert_eq!(value, json!({ "flow_id": 7, "tunnel_count": 2 }));
    }
}
