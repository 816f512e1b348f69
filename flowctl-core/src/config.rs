//! Client configuration shared by the library and the CLI.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::Endpoint;

/// How frames reach the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// ZeroMQ REQ socket for requests, SUB socket for `listen`.
    #[default]
    Zmq,
    /// Plain TCP with a 4-byte length prefix per frame.
    Framed,
}

/// Where the service lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Service host name or IP.
    pub host: String,
    /// Service request/reply port.
    pub port: u16,
    /// How long `connect` keeps re-dialing, in seconds.
    pub connect_timeout_secs: u64,
    /// How long a request waits for its reply, in seconds.
    pub reply_timeout_secs: u64,
    /// Pause between dial attempts, in milliseconds.
    pub dial_backoff_ms: u64,
    pub transport: TransportKind,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5555,
            connect_timeout_secs: 5,
            reply_timeout_secs: 5,
            dial_backoff_ms: 1000,
            transport: TransportKind::Zmq,
        }
    }
}

impl ClientOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::tcp(self.host.clone(), self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }

    pub fn dial_backoff(&self) -> Duration {
        Duration::from_millis(self.dial_backoff_ms)
    }
}

/// Push listener sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Frames buffered between the receive loop and the workers.
    pub queue_capacity: usize,
    /// Concurrent handler invocations.
    pub workers: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            workers: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = ClientOptions::default();
        assert_eq!(opts.endpoint().to_string(), "tcp://127.0.0.1:5555");
        assert_eq!(opts.dial_backoff(), Duration::from_secs(1));
        assert_eq!(opts.reply_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let opts: ClientOptions = serde_json::from_str(r#"{"host":"10.1.2.3"}"#).unwrap();
        assert_eq!(opts.host, "10.1.2.3");
        assert_eq!(opts.port, 5555);
        assert_eq!(opts.connect_timeout_secs, 5);
        assert_eq!(opts.transport, TransportKind::Zmq);
    }

    #[test]
    fn framed_transport_can_be_selected() {
        let opts: ClientOptions = serde_json::from_str(r#"{"transport":"framed"}"#).unwrap();
        assert_eq!(opts.transport, TransportKind::Framed);
        assert!(serde_json::from_str::<ClientOptions>(r#"{"transport":"udp"}"#).is_err());
    }
}
