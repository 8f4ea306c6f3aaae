//! Structured logging setup and ndjson output helpers.

mod format;

pub use format::StructuredLogger;
