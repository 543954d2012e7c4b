//! # Table Exporter
//!
//! Handles the "Extract and Save" operation for a single table.
//!
//! - **Streaming**: rows are fetched from the cursor in fixed-size chunks and
//!   written immediately, so memory stays bounded by the chunk size.
//! - **Minimal quoting**: fields are quoted only when they contain the
//!   delimiter, a quote or a line break; embedded quotes are doubled.
//! - **Ordering**: rows are written in cursor order. No sort is added.

use crate::config::{ExportConfig, DEFAULT_FETCH_SIZE, DEFAULT_PROGRESS_INTERVAL};
use crate::domain::entities::{ExportJob, TaskResult};
use crate::domain::errors::{ExportError, Result};
use crate::ports::output_port::OutputPort;
use crate::ports::source_port::TableSource;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared flag checked between chunk fetches.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tunables for one exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub fetch_size: usize,
    pub progress_interval: u64,
    pub delimiter: u8,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            fetch_size: DEFAULT_FETCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            delimiter: b',',
        }
    }
}

impl ExportSettings {
    /// Takes the tunables from an already validated `export` section.
    pub fn from_config(config: &ExportConfig, delimiter: u8) -> Self {
        Self {
            fetch_size: config.fetch_size,
            progress_interval: config.progress_interval,
            delimiter,
        }
    }
}

#[cfg(windows)]
const LINE_TERMINATOR: Terminator = Terminator::CRLF;
#[cfg(not(windows))]
const LINE_TERMINATOR: Terminator = Terminator::Any(b'\n');

/// Exports one table per call into a delimited file.
pub struct TableExporter {
    output: Arc<dyn OutputPort>,
    settings: ExportSettings,
    cancel: CancelFlag,
}

impl TableExporter {
    pub fn new(output: Arc<dyn OutputPort>, settings: ExportSettings) -> Self {
        Self {
            output,
            settings,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Streams every row selected by `job` from `source` into
    /// `job.output_file` and returns the number of data lines written.
    ///
    /// On error the output file is left truncated or partially written and
    /// must not be used.
    pub fn export(&self, source: &mut dyn TableSource, job: &ExportJob) -> Result<TaskResult> {
        job.validate()?;
        let result = self.run(source, job);
        if let Err(e) = &result {
            error!("Export of {} failed: {}", job.table, e);
        }
        result
    }

    fn run(&self, source: &mut dyn TableSource, job: &ExportJob) -> Result<TaskResult> {
        let start_time = Instant::now();
        info!("Starting export of table: {}", job.table);

        // 1. Row estimate (for progress only, a failed count is not fatal)
        let estimated = match source.count_rows(job) {
            Ok(counted) => {
                let estimated = job.limit.map_or(counted, |l| counted.min(l));
                info!("Table {}: {} rows to export", job.table, estimated);
                Some(estimated)
            }
            Err(e @ ExportError::ConnectionError(_)) => return Err(e),
            Err(e) => {
                warn!(
                    "Table {}: row count unavailable, continuing without an estimate: {}",
                    job.table, e
                );
                None
            }
        };
        let total = estimated.map_or_else(|| "?".to_string(), |n| n.to_string());

        // 2. Open cursor and read the column schema
        let mut cursor = source.open_cursor(job)?;
        let columns = cursor.columns().clone();
        info!("Table {} columns: {:?}", job.table, columns.names);

        // 3. Open output and write the header
        let path = job.output_file.as_path();
        let sink = self.output.create(path)?;
        let mut wtr = WriterBuilder::new()
            .delimiter(self.settings.delimiter)
            .quote_style(QuoteStyle::Necessary)
            .double_quote(true)
            .terminator(LINE_TERMINATOR)
            .from_writer(sink);

        wtr.write_record(&columns.names)
            .map_err(|e| ExportError::csv(path, e))?;
        info!("CSV header written for {}", job.table);

        // 4. Stream chunks
        let fetch_size = self.settings.fetch_size.max(1);
        let interval = self.settings.progress_interval.max(1);
        let mut rows_exported: u64 = 0;
        let mut bytes: u64 = 0;
        loop {
            if self.cancel.is_cancelled() {
                info!(
                    "Export of {} cancelled after {} rows",
                    job.table, rows_exported
                );
                return Err(ExportError::Cancelled {
                    table: job.table.clone(),
                    rows: rows_exported,
                });
            }

            let chunk = cursor.fetch_many(fetch_size)?;
            if chunk.is_empty() {
                break;
            }

            for row in &chunk {
                if row.len() != columns.len() {
                    return Err(ExportError::query(
                        &job.table,
                        format!(
                            "row {} has {} values but the header has {} columns",
                            rows_exported + 1,
                            row.len(),
                            columns.len()
                        ),
                    ));
                }
                let fields: Vec<_> = row.iter().map(|v| v.to_field()).collect();
                bytes += fields.iter().map(|f| f.len() as u64).sum::<u64>();
                wtr.write_record(fields.iter().map(|f| f.as_bytes()))
                    .map_err(|e| ExportError::csv(path, e))?;
                rows_exported += 1;
            }

            if rows_exported / interval > (rows_exported - chunk.len() as u64) / interval {
                info!(
                    "Table {}: {}/{} rows exported",
                    job.table, rows_exported, total
                );
            }
        }
        drop(cursor);

        // 5. Flush and release the file
        let sink = wtr.into_inner().map_err(|e| {
            let err = e.error();
            ExportError::io(path, std::io::Error::new(err.kind(), err.to_string()))
        })?;
        sink.finish().map_err(|e| ExportError::io(path, e))?;

        info!(
            "Table {}: Export completed - {} rows written to {}",
            job.table,
            rows_exported,
            path.display()
        );

        Ok(TaskResult::success(
            job,
            rows_exported,
            estimated.unwrap_or(0),
            bytes,
            start_time.elapsed().as_secs_f64(),
        ))
    }
}
