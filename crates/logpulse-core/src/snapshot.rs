use crate::log_line::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time copy of the rolling statistics, taken under the stats lock
/// and rendered after it is released.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub generated_at: DateTime<Utc>,

    pub entries_processed: u64,

    /// Entries per second over the timestamp window
    pub current_rate: f64,

    /// Highest `current_rate` seen so far
    pub peak_rate: f64,

    /// ERROR lines per second over the line window
    pub error_rate: f64,

    /// One entry per severity, in [`Severity::ALL`] order
    pub severities: Vec<SeverityShare>,

    /// Most frequent error patterns, most frequent first
    pub top_errors: Vec<ErrorPatternCount>,

    pub window: WindowOccupancy,

    pub sliding_window_seconds: u64,
}

impl StatsSnapshot {
    /// Share of a given severity (zeroed if absent)
    pub fn severity(&self, severity: Severity) -> SeverityShare {
        self.severities
            .iter()
            .find(|s| s.severity == severity)
            .cloned()
            .unwrap_or(SeverityShare {
                severity,
                count: 0,
                percentage: 0,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityShare {
    pub severity: Severity,
    pub count: u64,
    /// Rounded share of all processed entries
    pub percentage: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPatternCount {
    pub pattern: String,
    pub count: u64,
}

/// Current fill level of the rolling buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowOccupancy {
    pub timestamps: usize,
    pub lines: usize,
}

/// `count / total * 100`, rounded half away from zero; 0 when total is 0
pub fn percentage_of(count: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as u64
}
