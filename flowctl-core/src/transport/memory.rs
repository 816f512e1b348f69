//! In-process transport backed by channels, for tests and embedding.

use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::{Dialer, Endpoint, Transport};

/// One end of an in-memory frame pipe.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: Option<mpsc::Sender<Bytes>>,
    rx: mpsc::Receiver<Bytes>,
}

impl MemoryTransport {
    /// Creates two connected ends, each buffering up to `capacity` frames.
    pub fn pair(capacity: usize) -> (MemoryTransport, MemoryTransport) {
        let (a_tx, b_rx) = mpsc::channel(capacity);
        let (b_tx, a_rx) = mpsc::channel(capacity);
        (
            MemoryTransport {
                tx: Some(a_tx),
                rx: a_rx,
            },
            MemoryTransport {
                tx: Some(b_tx),
                rx: b_rx,
            },
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, frame: Bytes) -> io::Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "transport closed"))?;
        tx.send(frame)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer dropped"))
    }

    async fn recv(&mut self) -> io::Result<Option<Bytes>> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) -> io::Result<()> {
        self.tx = None;
        self.rx.close();
        Ok(())
    }
}

/// A dialer that hands out pre-built transports in order.
///
/// Each `dial` pops the next scripted outcome; once the script is empty
/// every attempt is refused.
#[derive(Debug, Default)]
pub struct MemoryDialer {
    script: Mutex<VecDeque<io::Result<MemoryTransport>>>,
    attempts: AtomicU32,
}

impl MemoryDialer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful dial.
    pub fn push(&self, transport: MemoryTransport) {
        self.lock().push_back(Ok(transport));
    }

    /// Queues a refused dial.
    pub fn push_refused(&self) {
        self.lock().push_back(Err(refused()));
    }

    /// Number of `dial` calls made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<io::Result<MemoryTransport>>> {
        // A poisoned script is still a valid queue.
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn refused() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionRefused, "no scripted transport")
}

#[async_trait]
impl Dialer for MemoryDialer {
    type Transport = MemoryTransport;

    async fn dial(&self, _endpoint: &Endpoint) -> io::Result<MemoryTransport> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.lock().pop_front().unwrap_or_else(|| Err(refused()))
    }
}
