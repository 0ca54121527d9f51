//! LogPulse Ingestion
//!
//! The line queue and the input readers feeding it.

pub mod queue;
pub mod reader;

pub use queue::{LineQueue, LineReceiver, LineSender, Popped};
pub use reader::LineReader;
