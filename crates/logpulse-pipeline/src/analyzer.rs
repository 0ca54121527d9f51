use crate::aggregator::Aggregator;
use crate::reporter::{ReportSettings, Reporter};
use crate::stats::{RollingStats, SharedStats};
use logpulse_core::{Config, IngestionError, LogPulseError, PipelineError, ReportSink, StatsSnapshot};
use logpulse_ingestion::{LineQueue, LineReader};
use tokio::io::AsyncBufRead;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Input exhausted and every queued line aggregated
    EndOfInput,
    /// Cancelled from outside (Ctrl-C)
    Interrupted,
}

/// Outcome of a complete run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub reason: ShutdownReason,
    pub lines_read: usize,
    pub lines_processed: u64,
    /// Includes the final report
    pub reports_emitted: u64,
    pub final_snapshot: StatsSnapshot,
}

/// Wires ingestion, aggregation and reporting around one shared state
pub struct Analyzer {
    config: Config,
    stats: SharedStats,
}

impl Analyzer {
    pub fn new(config: Config) -> Self {
        let stats = RollingStats::new(&config.window).shared();
        Self { config, stats }
    }

    /// Handle on the shared statistics
    pub fn stats(&self) -> SharedStats {
        self.stats.clone()
    }

    /// Run the three units until input ends or `cancel` fires, then emit a
    /// final report.
    ///
    /// With `exit_on_eof` disabled, reporting continues after the input is
    /// exhausted until `cancel` fires.
    pub async fn run<R, S>(
        self,
        reader: LineReader<R>,
        sink: S,
        cancel: CancellationToken,
    ) -> Result<RunSummary, LogPulseError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        S: ReportSink + 'static,
    {
        // Any early return tears the other units down
        let _shutdown = cancel.clone().drop_guard();
        let report_cancel = cancel.child_token();

        let (sender, receiver) = LineQueue::unbounded();

        let ingestion = tokio::spawn(reader.run(sender, cancel.clone()));

        let aggregator = Aggregator::new(self.stats.clone(), self.config.aggregator.poll_timeout());
        let aggregation = tokio::spawn(aggregator.run(receiver, cancel.clone()));

        let reporter = Reporter::new(
            self.stats.clone(),
            ReportSettings::from(&self.config.report),
            sink,
        );
        let reporting = tokio::spawn(reporter.run(report_cancel.clone()));

        info!(instance = %self.config.general.instance_name, "Analyzer running");

        // A cancelled token means interrupted, even if the queue also drained
        let lines_processed = join_task("aggregator", aggregation.await)??;
        let reason = if cancel.is_cancelled() {
            info!("Interrupt received, shutting down");
            ShutdownReason::Interrupted
        } else {
            ShutdownReason::EndOfInput
        };

        if reason == ShutdownReason::EndOfInput && !self.config.general.exit_on_eof {
            info!("Input exhausted, reporting until interrupted");
            cancel.cancelled().await;
        }

        report_cancel.cancel();
        let mut reporter = join_task("reporter", reporting.await)??;
        let final_snapshot = reporter.report_once().await?;

        let lines_read = match join_task("ingestion", ingestion.await)? {
            Ok(count) => count,
            Err(IngestionError::ChannelClosed) => {
                warn!("Queue closed before input was fully read");
                lines_processed as usize
            }
            Err(e) => return Err(e.into()),
        };

        let summary = RunSummary {
            reason,
            lines_read,
            lines_processed,
            reports_emitted: reporter.reports_emitted(),
            final_snapshot,
        };
        info!(
            reason = ?summary.reason,
            lines_read = summary.lines_read,
            lines_processed = summary.lines_processed,
            reports = summary.reports_emitted,
            "Analyzer finished"
        );

        Ok(summary)
    }
}

fn join_task<T>(task: &'static str, joined: Result<T, JoinError>) -> Result<T, PipelineError> {
    joined.map_err(|e| PipelineError::Task {
        task,
        message: e.to_string(),
    })
}
