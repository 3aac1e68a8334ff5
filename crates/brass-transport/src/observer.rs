//! Wire logging hook.
//!
//! Every line a transport reads or writes is reported to a [`WireObserver`].
//! Outbound lines are reported before the write is attempted, inbound lines
//! after they have been framed.

use std::sync::Arc;

use tracing::debug;

/// Direction of a line on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Server to bot.
    Inbound,
    /// Bot to server.
    Outbound,
}

impl Direction {
    /// Short arrow marker used in log output.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Inbound => "<<",
            Self::Outbound => ">>",
        }
    }
}

/// Receives every line that crosses the transport.
pub trait WireObserver: Send + Sync {
    /// Called once per line.
    fn observe(&self, direction: Direction, line: &str);
}

impl<F> WireObserver for F
where
    F: Fn(Direction, &str) + Send + Sync,
{
    fn observe(&self, direction: Direction, line: &str) {
        self(direction, line)
    }
}

/// Shared observer handle.
pub type SharedObserver = Arc<dyn WireObserver>;

/// Default observer: emits a `debug` event on the `brass::wire` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl WireObserver for TracingObserver {
    fn observe(&self, direction: Direction, line: &str) {
        debug!(target: "brass::wire", "{} {}", direction.marker(), line);
    }
}

/// Returns the default tracing observer as a shared handle.
pub fn tracing_observer() -> SharedObserver {
    Arc::new(TracingObserver)
}
