//! # Log sinks.
//!
//! A [`LogSink`] is the append-only destination of journal lines. The journal calls
//! [`LogSink::clear`] once at the start of a run and [`LogSink::append`] once per line.
//!
//! ## Implementations
//! - [`FileSink`] appends to a file on disk (tokio::fs), flushing every line
//! - [`MemorySink`] keeps lines in memory (tests, embedding)
//!
//! ## Rules
//! - Implementations serialize concurrent callers: a line is never interleaved with another.
//! - Errors are returned, not swallowed; the journal reports them and keeps going.

mod file;
mod memory;

use std::io;

use async_trait::async_trait;

pub use file::FileSink;
pub use memory::MemorySink;

/// Append-only destination for journal lines.
#[async_trait]
pub trait LogSink: Send + Sync + 'static {
    /// Truncates the log.
    async fn clear(&self) -> io::Result<()>;

    /// Appends one line (without trailing newline).
    async fn append(&self, line: &str) -> io::Result<()>;
}
