use crate::stats::SharedStats;
use logpulse_core::PipelineError;
use logpulse_ingestion::{LineReceiver, Popped};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Single consumer of the line queue
///
/// Each line is parsed and folded into the shared statistics while holding
/// the stats lock, so a line is either fully accounted for or not at all
/// when the reporter looks.
pub struct Aggregator {
    stats: SharedStats,
    poll_timeout: Duration,
}

impl Aggregator {
    pub fn new(stats: SharedStats, poll_timeout: Duration) -> Self {
        Self {
            stats,
            poll_timeout,
        }
    }

    /// Process one line
    ///
    /// Parse failures are logged and never returned; only a poisoned lock
    /// is an error.
    pub fn ingest(&self, line: &str) -> Result<(), PipelineError> {
        let failure = {
            let mut stats = self.stats.lock().map_err(|_| PipelineError::LockPoisoned)?;
            stats.record(line)
        };

        if let Some(e) = failure {
            warn!(error = %e, line, "Timestamp not recorded");
        }
        Ok(())
    }

    /// Consume lines until the queue is closed and drained, or until
    /// cancelled. Cancellation does not drain the queue.
    ///
    /// Returns the number of lines processed.
    pub async fn run(
        self,
        mut receiver: LineReceiver,
        cancel: CancellationToken,
    ) -> Result<u64, PipelineError> {
        let mut processed: u64 = 0;

        info!(poll_timeout_ms = self.poll_timeout.as_millis() as u64, "Aggregator started");

        loop {
            let popped = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(processed, pending = receiver.len(), "Aggregator cancelled");
                    break;
                }
                popped = receiver.pop(self.poll_timeout) => popped,
            };

            match popped {
                Popped::Line(line) => match self.ingest(&line) {
                    Ok(()) => {
                        processed += 1;
                        debug!(processed, "Line aggregated");
                    }
                    Err(e) if e.is_fatal() => {
                        error!(error = %e, "fatal: aggregator cannot continue");
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to process line, continuing");
                    }
                },
                Popped::Empty => {
                    trace!("Queue idle");
                }
                Popped::Closed => {
                    info!(processed, "Queue closed and drained");
                    break;
                }
            }
        }

        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::RollingStats;
    use logpulse_core::Severity;
    use logpulse_ingestion::LineQueue;
    use std::sync::Arc;

    const POLL: Duration = Duration::from_millis(10);

    fn shared() -> SharedStats {
        RollingStats::with_capacities(100, 100).shared()
    }

    #[test]
    fn test_ingest_updates_counters() {
        let stats = shared();
        let aggregator = Aggregator::new(stats.clone(), POLL);

        aggregator.ingest("[2024-01-01T00:00:00Z] INFO hello").unwrap();
        aggregator.ingest("[garbage] DEBUG still counted").unwrap();

        let stats = stats.lock().unwrap();
        assert_eq!(stats.entries_processed(), 2);
        assert_eq!(stats.severity_count(Severity::Info), 1);
        assert_eq!(stats.severity_count(Severity::Debug), 1);
        assert_eq!(stats.recent_timestamps().len(), 1);
    }

    #[test]
    fn test_poisoned_lock_is_fatal() {
        let stats = shared();
        let poisoner = stats.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the stats lock");
        })
        .join();

        let aggregator = Aggregator::new(stats, POLL);
        let err = aggregator.ingest("INFO after poison").unwrap_err();
        assert!(matches!(err, PipelineError::LockPoisoned));
    }

    #[tokio::test]
    async fn test_drains_queue_until_closed() {
        let stats = shared();
        let (sender, receiver) = LineQueue::unbounded();
        for line in ["INFO a", "ERROR: b", "DEBUG c", "", "ERROR: b again"] {
            sender.push(line.to_string()).unwrap();
        }
        drop(sender);

        let processed = Aggregator::new(stats.clone(), POLL)
            .run(receiver, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(processed, 5);
        let stats = stats.lock().unwrap();
        assert_eq!(stats.entries_processed(), 5);
        assert_eq!(stats.severity_count(Severity::Error), 2);
        assert_eq!(stats.severity_count(Severity::Other), 1);
        assert_eq!(stats.error_pattern_count("b"), 2);
    }

    #[tokio::test]
    async fn test_idle_queue_is_retried() {
        let stats = shared();
        let (sender, receiver) = LineQueue::unbounded();
        let handle = tokio::spawn(Aggregator::new(stats.clone(), POLL).run(receiver, CancellationToken::new()));

        // Several poll timeouts elapse before the line shows up
        tokio::time::sleep(POLL * 5).await;
        sender.push("INFO late".to_string()).unwrap();
        drop(sender);

        assert_eq!(handle.await.unwrap().unwrap(), 1);
        assert_eq!(stats.lock().unwrap().entries_processed(), 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_without_draining() {
        let stats = shared();
        let (sender, receiver) = LineQueue::unbounded();
        sender.push("INFO never processed".to_string()).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let processed = Aggregator::new(Arc::clone(&stats), POLL)
            .run(receiver, cancel)
            .await
            .unwrap();

        assert_eq!(processed, 0);
        assert_eq!(stats.lock().unwrap().entries_processed(), 0);
        assert!(sender.is_closed());
    }
}
