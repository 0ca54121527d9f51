//! LogPulse Core
//!
//! Core types, configuration, errors and traits for the LogPulse log stream analyzer.

pub mod config;
pub mod error;
pub mod log_line;
pub mod snapshot;
pub mod traits;

// Re-export commonly used types
pub use config::{Config, ReportFormat};
pub use error::{IngestionError, LogPulseError, OutputError, ParseError, PipelineError, Result};
pub use log_line::{ErrorPattern, ParsedLine, Severity, TimestampField, UNKNOWN_ERROR_PATTERN};
pub use snapshot::{ErrorPatternCount, SeverityShare, StatsSnapshot, WindowOccupancy};
pub use traits::{NullSink, ReportSink};
