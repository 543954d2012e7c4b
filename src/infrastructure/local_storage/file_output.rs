//! Infrastructure adapter for writing export files to the local filesystem.

use crate::domain::errors::{ExportError, Result};
use crate::ports::output_port::{OutputPort, OutputSink};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const WRITE_BUFFER_BYTES: usize = 128 * 1024;

/// Concrete implementation of `OutputPort` for local storage.
///
/// Missing parent directories are created. Files are created (or
/// truncated) and written through a 128 KiB buffer, optionally wrapped in a
/// Gzip encoder.
#[derive(Debug, Clone, Default)]
pub struct LocalFileOutput {
    compress: bool,
}

impl LocalFileOutput {
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }
}

impl OutputPort for LocalFileOutput {
    fn create(&self, path: &Path) -> Result<Box<dyn OutputSink>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
        }

        let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
        let buf_writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, file);
        debug!(
            "Opened {} for writing (gzip: {})",
            path.display(),
            self.compress
        );

        if self.compress {
            Ok(Box::new(GzipSink(GzEncoder::new(
                buf_writer,
                Compression::fast(),
            ))))
        } else {
            Ok(Box::new(PlainSink(buf_writer)))
        }
    }
}

struct PlainSink(BufWriter<File>);

impl Write for PlainSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl OutputSink for PlainSink {
    fn finish(self: Box<Self>) -> std::io::Result<()> {
        let PlainSink(buf_writer) = *self;
        let file = buf_writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

struct GzipSink(GzEncoder<BufWriter<File>>);

impl Write for GzipSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl OutputSink for GzipSink {
    fn finish(self: Box<Self>) -> std::io::Result<()> {
        let GzipSink(encoder) = *self;
        let buf_writer = encoder.finish()?;
        let file = buf_writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}
