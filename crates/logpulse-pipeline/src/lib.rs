//! LogPulse Pipeline
//!
//! Aggregation of queued log lines into rolling statistics, and the
//! periodic reporting loop reading them.

pub mod aggregator;
pub mod analyzer;
pub mod reporter;
pub mod stats;
pub mod window;

pub use aggregator::Aggregator;
pub use analyzer::{Analyzer, RunSummary, ShutdownReason};
pub use reporter::{ReportSettings, Reporter};
pub use stats::{RollingStats, SharedStats};
pub use window::RingBuffer;
