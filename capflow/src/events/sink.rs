//! Progress observer trait and implementations.

use crate::core::ProgressEvent;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, Level};

/// Receives progress events from pipeline runs.
///
/// Delivery is synchronous and best-effort: an `Err` or a panic is logged
/// by the reporter and never reaches the run.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressObserver: Send + Sync {
    /// Handles one progress event.
    fn on_event(&self, event: &ProgressEvent) -> anyhow::Result<()>;
}

/// An observer that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    /// The log level to use.
    level: Level,
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingObserver {
    /// Creates a new logging observer with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging observer.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging observer.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl ProgressObserver for LoggingObserver {
    fn on_event(&self, event: &ProgressEvent) -> anyhow::Result<()> {
        if self.level == Level::DEBUG {
            debug!(
                run_id = %event.run_id,
                sequence = event.sequence,
                stage = %event.stage,
                "Event: {}", event.event_type()
            );
        } else {
            info!(
                run_id = %event.run_id,
                sequence = event.sequence,
                stage = %event.stage,
                "Event: {}", event.event_type()
            );
        }
        Ok(())
    }
}

/// An observer that keeps every event it sees.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: RwLock<Vec<ProgressEvent>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns the status lines of the collected events.
    #[must_use]
    pub fn status_lines(&self) -> Vec<String> {
        self.events.read().iter().map(ProgressEvent::status_line).collect()
    }
}

impl ProgressObserver for CollectingObserver {
    fn on_event(&self, event: &ProgressEvent) -> anyhow::Result<()> {
        self.events.write().push(event.clone());
        Ok(())
    }
}

/// An observer that forwards events into a tokio channel.
///
/// Useful for streaming progress to a UI task.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelObserver {
    /// Creates an observer and the receiving end of its channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_event(&self, event: &ProgressEvent) -> anyhow::Result<()> {
        self.sender
            .send(event.clone())
            .map_err(|_| anyhow::anyhow!("progress receiver dropped"))
    }
}
