//! In-memory transport used by the client behavior tests.

use super::{TransportEvent, TransportEvents, TransportFactory, TransportSink};
use crate::types::{ClientError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};
use url::Url;

/// Scripted transport factory. Counts every `open` and can be told to fail the
/// next N attempts; each successful open hands the test a [`MockConnection`]
/// for injecting inbound events and observing outbound frames.
pub struct MockFactory {
    opens: AtomicUsize,
    failures_remaining: AtomicUsize,
    break_next_sends: AtomicBool,
    gate: Mutex<Option<Arc<Semaphore>>>,
    conn_tx: mpsc::UnboundedSender<MockConnection>,
}

impl MockFactory {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockConnection>) {
        let (conn_tx, conn_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                opens: AtomicUsize::new(0),
                failures_remaining: AtomicUsize::new(0),
                break_next_sends: AtomicBool::new(false),
                gate: Mutex::new(None),
                conn_tx,
            }),
            conn_rx,
        )
    }

    /// Make the next `n` open attempts fail with a connection error
    pub fn fail_next(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Make the next opened connection reject every `send`, simulating a
    /// transport that drops right after the handshake
    pub fn break_next(&self) {
        self.break_next_sends.store(true, Ordering::SeqCst);
    }

    /// Hold the next open attempt mid-handshake until the returned semaphore
    /// gets a permit. `opens()` still counts the attempt while it is parked,
    /// so tests can interleave other calls with a suspended handshake.
    pub fn gate_next(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Total number of `open` calls so far
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportFactory for MockFactory {
    async fn open(&self, url: &Url) -> Result<(Box<dyn TransportSink>, TransportEvents)> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        // A real handshake suspends; give concurrent connect() calls a chance
        // to observe the in-flight attempt
        tokio::task::yield_now().await;

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }

        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ClientError::Connection("mock refused connection".into()));
        }

        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let reject_sends = Arc::new(AtomicBool::new(
            self.break_next_sends.swap(false, Ordering::SeqCst),
        ));
        let reject_close = Arc::new(AtomicBool::new(false));

        let connection = MockConnection {
            url: url.clone(),
            sent: sent_rx,
            events: event_tx,
            reject_sends: Arc::clone(&reject_sends),
            reject_close: Arc::clone(&reject_close),
        };
        // Receiver may be gone if the test does not care about connections
        let _ = self.conn_tx.send(connection);

        let events = futures::stream::unfold(event_rx, |mut rx| async move {
            rx.recv().await.map(|ev| (ev, rx))
        })
        .boxed();

        Ok((
            Box::new(MockSink {
                sent_tx,
                reject_sends,
                reject_close,
            }),
            events,
        ))
    }
}

/// Test-side handle to one opened mock transport.
pub struct MockConnection {
    pub url: Url,
    /// Frames the client transmitted, in order
    pub sent: mpsc::UnboundedReceiver<String>,
    /// Inject inbound transport events
    pub events: mpsc::UnboundedSender<TransportEvent>,
    reject_sends: Arc<AtomicBool>,
    reject_close: Arc<AtomicBool>,
}

impl MockConnection {
    /// Make every subsequent `send` on this transport fail, simulating a
    /// connection that dropped mid-flush.
    pub fn break_sends(&self) {
        self.reject_sends.store(true, Ordering::SeqCst);
    }

    /// Make the `close` handshake on this transport fail, simulating a peer
    /// that vanished before the close frame could be delivered.
    pub fn break_close(&self) {
        self.reject_close.store(true, Ordering::SeqCst);
    }
}

struct MockSink {
    sent_tx: mpsc::UnboundedSender<String>,
    reject_sends: Arc<AtomicBool>,
    reject_close: Arc<AtomicBool>,
}

#[async_trait]
impl TransportSink for MockSink {
    async fn send(&mut self, frame: String) -> Result<()> {
        if self.reject_sends.load(Ordering::SeqCst) {
            return Err(ClientError::Connection("mock transport is broken".into()));
        }
        self.sent_tx
            .send(frame)
            .map_err(|_| ClientError::Connection("mock transport dropped".into()))
    }

    async fn close(&mut self) -> Result<()> {
        if self.reject_close.load(Ordering::SeqCst) {
            return Err(ClientError::Connection("mock close handshake failed".into()));
        }
        Ok(())
    }
}
