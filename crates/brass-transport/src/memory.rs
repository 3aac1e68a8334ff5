//! In-memory transport.
//!
//! [`MemoryTransport`] replays a scripted queue of inbound lines and records
//! every line written to it. The paired [`MemoryHandle`] stays with the test
//! after the transport itself has been handed to the engine, so the test can
//! feed lines, inspect output and inject write failures while the engine runs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{TransportError, TransportResult};
use crate::observer::{Direction, SharedObserver, tracing_observer};
use crate::{LineTransport, prepare_outbound};

#[derive(Debug, Default)]
struct Shared {
    inbound: VecDeque<String>,
    sent: Vec<String>,
    fail_once: Vec<String>,
    fail_all: bool,
    remote_closed: bool,
    closed: bool,
    write_delay: Option<Duration>,
}

/// Scripted transport used by engine tests.
pub struct MemoryTransport {
    shared: Arc<Mutex<Shared>>,
    observer: SharedObserver,
}

/// Test-side handle onto a [`MemoryTransport`].
#[derive(Clone)]
pub struct MemoryHandle {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryTransport {
    /// Creates a connected transport and its handle.
    pub fn pair() -> (Self, MemoryHandle) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let transport = Self {
            shared: Arc::clone(&shared),
            observer: tracing_observer(),
        };
        (transport, MemoryHandle { shared })
    }

    /// Replaces the wire observer.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }
}

#[async_trait]
impl LineTransport for MemoryTransport {
    fn read_line(&mut self) -> TransportResult<Option<String>> {
        let mut shared = self.shared.lock();
        if shared.closed {
            return Err(TransportError::NotConnected);
        }
        let next = shared.inbound.pop_front();
        match next {
            Some(line) => {
                drop(shared);
                self.observer.observe(Direction::Inbound, &line);
                Ok(Some(line))
            }
            None if shared.remote_closed => Err(TransportError::ConnectionClosed {
                reason: "end of stream".to_string(),
            }),
            None => Ok(None),
        }
    }

    async fn write_line(&mut self, line: &str) -> TransportResult<()> {
        let line = prepare_outbound(line)?;
        self.observer.observe(Direction::Outbound, line);

        let delay = self.shared.lock().write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut shared = self.shared.lock();
        if shared.closed {
            return Err(TransportError::NotConnected);
        }
        if shared.fail_all {
            return Err(TransportError::SendFailed("injected failure".to_string()));
        }
        if let Some(pos) = shared.fail_once.iter().position(|n| line.contains(n.as_str())) {
            shared.fail_once.remove(pos);
            return Err(TransportError::SendFailed(format!(
                "injected failure for {line:?}"
            )));
        }
        shared.sent.push(line.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.shared.lock().closed
    }

    async fn close(&mut self) {
        self.shared.lock().closed = true;
    }

    fn peer(&self) -> String {
        "memory".to_string()
    }
}

impl MemoryHandle {
    /// Queues one inbound line.
    pub fn push(&self, line: impl Into<String>) {
        self.shared.lock().inbound.push_back(line.into());
    }

    /// Queues several inbound lines in order.
    pub fn push_all<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut shared = self.shared.lock();
        shared.inbound.extend(lines.into_iter().map(Into::into));
    }

    /// Number of inbound lines not yet read.
    pub fn pending_inbound(&self) -> usize {
        self.shared.lock().inbound.len()
    }

    /// Every line written so far, in order.
    pub fn sent(&self) -> Vec<String> {
        self.shared.lock().sent.clone()
    }

    /// Returns and clears the written lines.
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut self.shared.lock().sent)
    }

    /// Makes the next write whose line contains `needle` fail.
    pub fn fail_once(&self, needle: impl Into<String>) {
        self.shared.lock().fail_once.push(needle.into());
    }

    /// Makes every write fail (or succeed again).
    pub fn fail_all_writes(&self, fail: bool) {
        self.shared.lock().fail_all = fail;
    }

    /// Makes every write take `delay` to complete.
    pub fn delay_writes(&self, delay: Duration) {
        self.shared.lock().write_delay = Some(delay);
    }

    /// Simulates the server closing the connection once the queue drains.
    pub fn close_remote(&self) {
        self.shared.lock().remote_closed = true;
    }

    /// Returns `true` once the transport's owner has called `close`.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}
