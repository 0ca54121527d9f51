//! LogPulse Output
//!
//! Report sinks rendering statistics snapshots for the console.

pub mod report;

pub use report::{format_text, ReportWriter};
