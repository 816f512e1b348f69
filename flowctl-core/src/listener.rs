//! Push listener.
//!
//! A reader task pulls frames off a [`Transport`] and queues them on a
//! bounded channel; a fixed pool of workers hands each frame to a
//! [`FrameHandler`]. When the queue is full the reader stops receiving
//! until a worker catches up.
//!
//! ```text
//! transport ──recv──► reader ──mpsc(queue_capacity)──► worker × N ──► handler
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ListenerConfig;
use crate::error::FlowError;
use crate::transport::Transport;

/// Receives every frame the listener accepts.
#[async_trait]
pub trait FrameHandler: Send + Sync + 'static {
    async fn handle(&self, frame: Bytes) -> Result<(), FlowError>;
}

/// Frame counters, returned by [`Listener::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ListenerStats {
    /// Frames read from the transport.
    pub received: u64,
    /// Frames the handler accepted.
    pub handled: u64,
    /// Frames whose handler returned an error, or panicked in builds that
    /// unwind. The release profile aborts on panic.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    handled: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ListenerStats {
        ListenerStats {
            received: self.received.load(Ordering::SeqCst),
            handled: self.handled.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

pub struct Listener {
    stop: CancellationToken,
    reader: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl Listener {
    /// Starts the reader and `config.workers` workers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<T, H>(transport: T, handler: Arc<H>, config: &ListenerConfig) -> Self
    where
        T: Transport + 'static,
        H: FrameHandler,
    {
        let stop = CancellationToken::new();
        let counters = Arc::new(Counters::default());
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity.max(1));
        let queue_rx = Arc::new(Mutex::new(queue_rx));

        let reader = tokio::spawn(read_loop(
            transport,
            queue_tx,
            stop.clone(),
            Arc::clone(&counters),
        ));

        let workers = (0..config.workers.max(1))
            .map(|id| {
                tokio::spawn(work_loop(
                    id,
                    Arc::clone(&queue_rx),
                    Arc::clone(&handler),
                    Arc::clone(&counters),
                ))
            })
            .collect();

        info!(
            workers = config.workers.max(1),
            queue = config.queue_capacity.max(1),
            "listener started"
        );

        Self {
            stop,
            reader,
            workers,
            counters,
        }
    }

    /// Token that stops the reader when cancelled.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn stats(&self) -> ListenerStats {
        self.counters.snapshot()
    }

    /// `true` once the reader has stopped, either by request or because
    /// the transport closed.
    pub fn is_finished(&self) -> bool {
        self.reader.is_finished()
    }

    /// Stops receiving, lets the workers finish every queued frame, and
    /// waits for all tasks.
    pub async fn shutdown(self) -> ListenerStats {
        self.stop.cancel();

        if let Err(e) = self.reader.await {
            error!("listener reader task failed: {e}");
        }
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("listener worker task failed: {e}");
            }
        }

        let stats = self.counters.snapshot();
        info!(
            received = stats.received,
            handled = stats.handled,
            failed = stats.failed,
            "listener stopped"
        );
        stats
    }
}

async fn read_loop<T: Transport>(
    mut transport: T,
    queue: mpsc::Sender<Bytes>,
    stop: CancellationToken,
    counters: Arc<Counters>,
) {
    loop {
        if stop.is_cancelled() {
            break;
        }

        let frame = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            r = transport.recv() => r,
        };

        match frame {
            Ok(Some(frame)) => {
                counters.received.fetch_add(1, Ordering::SeqCst);
                if queue.send(frame).await.is_err() {
                    warn!("listener queue closed, stopping reader");
                    break;
                }
            }
            Ok(None) => {
                info!("listener transport closed by peer");
                break;
            }
            Err(e) => {
                warn!("listener receive error: {e}");
                break;
            }
        }
    }

    if let Err(e) = transport.close().await {
        debug!("closing listener transport: {e}");
    }
}

async fn work_loop<H: FrameHandler>(
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Bytes>>>,
    handler: Arc<H>,
    counters: Arc<Counters>,
) {
    loop {
        // Hold the lock only while waiting for the next frame.
        let frame = {
            let mut rx = queue.lock().await;
            rx.recv().await
        };
        let Some(frame) = frame else { break };

        let handler = Arc::clone(&handler);
        match tokio::spawn(async move { handler.handle(frame).await }).await {
            Ok(Ok(())) => {
                counters.handled.fetch_add(1, Ordering::SeqCst);
            }
            Ok(Err(e)) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                warn!(worker = id, "handler failed: {e}");
            }
            // Only reachable with `panic = "unwind"`.
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                error!(worker = id, "handler panicked: {e}");
            }
        }
    }
    debug!(worker = id, "listener worker exiting");
}
