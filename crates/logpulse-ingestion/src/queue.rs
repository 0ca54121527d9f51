use logpulse_core::IngestionError;
use std::time::Duration;
use tokio::sync::mpsc;

/// Result of a single bounded wait on the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popped {
    Line(String),
    /// Nothing arrived within the timeout
    Empty,
    /// Every sender is gone and the queue is drained
    Closed,
}

/// Unbounded FIFO of raw log lines between ingestion and aggregation
pub struct LineQueue;

impl LineQueue {
    /// Create a new unbounded queue
    pub fn unbounded() -> (LineSender, LineReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (LineSender { inner: tx }, LineReceiver { inner: rx })
    }
}

/// Producer half. Cloning it adds another producer.
#[derive(Clone)]
pub struct LineSender {
    inner: mpsc::UnboundedSender<String>,
}

impl LineSender {
    /// Enqueue a line without blocking
    pub fn push(&self, line: String) -> Result<(), IngestionError> {
        self.inner.send(line).map_err(|_| IngestionError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Consumer half
pub struct LineReceiver {
    inner: mpsc::UnboundedReceiver<String>,
}

impl LineReceiver {
    /// Wait up to `timeout` for the next line
    pub async fn pop(&mut self, timeout: Duration) -> Popped {
        match tokio::time::timeout(timeout, self.inner.recv()).await {
            Ok(Some(line)) => Popped::Line(line),
            Ok(None) => Popped::Closed,
            Err(_) => Popped::Empty,
        }
    }

    /// Number of lines waiting
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
