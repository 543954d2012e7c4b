//! Port for opening the destination of an export.

use crate::domain::errors::Result;
use std::io::Write;
use std::path::Path;

/// A writable destination that must be explicitly finished.
pub trait OutputSink: Write + Send {
    /// Flushes buffered data, writes any trailer and releases the handle.
    fn finish(self: Box<Self>) -> std::io::Result<()>;
}

/// Creates writable sinks for output paths.
pub trait OutputPort: Send + Sync {
    /// Opens `path` for writing, truncating anything already there.
    fn create(&self, path: &Path) -> Result<Box<dyn OutputSink>>;
}
