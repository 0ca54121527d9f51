use crate::error::OutputError;
use crate::snapshot::StatsSnapshot;
use async_trait::async_trait;

/// Destination for periodic statistics reports
///
/// The reporter takes a snapshot under the stats lock, releases it, and only
/// then hands the snapshot to the sink, so a slow sink never stalls
/// aggregation.
#[async_trait]
pub trait ReportSink: Send {
    /// Returns the name of the sink (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Render one snapshot
    async fn emit(&mut self, snapshot: &StatsSnapshot) -> Result<(), OutputError>;
}

/// A sink that discards every report
///
/// Useful when only the final run summary matters, and for testing
pub struct NullSink;

#[async_trait]
impl ReportSink for NullSink {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn emit(&mut self, _snapshot: &StatsSnapshot) -> Result<(), OutputError> {
        Ok(())
    }
}
