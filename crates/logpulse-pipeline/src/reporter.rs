use crate::stats::SharedStats;
use logpulse_core::config::ReportConfig;
use logpulse_core::{PipelineError, ReportSink, StatsSnapshot};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reporting cadence and content
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub interval: Duration,
    pub top_errors: usize,
    pub sliding_window_seconds: u64,
}

impl From<&ReportConfig> for ReportSettings {
    fn from(config: &ReportConfig) -> Self {
        Self {
            interval: config.interval(),
            top_errors: config.top_errors,
            sliding_window_seconds: config.sliding_window_seconds,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

/// Periodically snapshots the shared statistics and hands them to a sink
pub struct Reporter<S> {
    stats: SharedStats,
    settings: ReportSettings,
    sink: S,
    reports_emitted: u64,
}

impl<S: ReportSink> Reporter<S> {
    pub fn new(stats: SharedStats, settings: ReportSettings, sink: S) -> Self {
        Self {
            stats,
            settings,
            sink,
            reports_emitted: 0,
        }
    }

    /// Recompute rates and copy the statistics, holding the lock only for
    /// that long
    pub fn take_snapshot(&self) -> Result<StatsSnapshot, PipelineError> {
        let mut stats = self.stats.lock().map_err(|_| PipelineError::LockPoisoned)?;
        stats.recalculate_rates();
        Ok(stats.snapshot(self.settings.top_errors, self.settings.sliding_window_seconds))
    }

    /// Take a snapshot and emit it. Sink failures are logged, not returned.
    pub async fn report_once(&mut self) -> Result<StatsSnapshot, PipelineError> {
        let snapshot = self.take_snapshot()?;

        match self.sink.emit(&snapshot).await {
            Ok(()) => {
                self.reports_emitted += 1;
                debug!(
                    sink = self.sink.name(),
                    entries = snapshot.entries_processed,
                    "Report emitted"
                );
            }
            Err(e) => {
                warn!(sink = self.sink.name(), error = %e, "Failed to emit report");
            }
        }

        Ok(snapshot)
    }

    /// Report every interval until cancelled. The first report comes one
    /// full interval after start.
    ///
    /// Hands the reporter back so the caller can emit a final report.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<Self, PipelineError> {
        let period = self.settings.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            sink = self.sink.name(),
            interval_ms = period.as_millis() as u64,
            "Reporter started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(reports = self.reports_emitted, "Reporter stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.report_once().await?;
                }
            }
        }

        Ok(self)
    }

    pub fn reports_emitted(&self) -> u64 {
        self.reports_emitted
    }
}
