//! Worker log ingestion.
//!
//! The event bridge delivers log lines in newest-first batches. [`ingest`]
//! turns a batch into chronological [`LogEntry`] values and [`LogBuffer`]
//! accumulates them newest batch first.

mod buffer;
mod classifier;

pub use buffer::{LogBuffer, LogRecord};
pub use classifier::{LogEntry, LogLevel, classify, ingest, is_noise};
