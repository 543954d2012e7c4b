//! The application logic that owns the database session and runs jobs.
//!
//! `ExportSession` holds at most one connection at a time. It is opened on
//! demand, reused across every job of a batch, and released by `disconnect`
//! or when the session is dropped, so early returns never leak it.

use crate::application::exporter::TableExporter;
use crate::domain::entities::{BatchPolicy, BatchReport, ExportJob, TaskResult};
use crate::domain::errors::{ExportError, Result};
use crate::ports::source_port::{SourceConnector, TableSource};
use log::{error, info, warn};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Exports tables over one exclusively owned connection.
pub struct ExportSession {
    connector: Arc<dyn SourceConnector>,
    exporter: TableExporter,
    policy: BatchPolicy,
    source: Option<Box<dyn TableSource>>,
}

impl ExportSession {
    pub fn new(connector: Arc<dyn SourceConnector>, exporter: TableExporter) -> Self {
        Self {
            connector,
            exporter,
            policy: BatchPolicy::FailFast,
            source: None,
        }
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }

    /// Opens the connection unless one is already held.
    pub fn connect(&mut self) -> Result<()> {
        if self.source.is_none() {
            self.source = Some(self.connector.connect()?);
        }
        Ok(())
    }

    /// Releases the connection. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        if let Some(source) = self.source.take() {
            drop(source);
            info!("Disconnected from {}", self.connector.describe());
        }
    }

    /// Exports a single job, connecting first if needed.
    ///
    /// A connection error, or a result set abandoned mid-way, drops the
    /// session so the next call reconnects.
    pub fn export(&mut self, job: &ExportJob) -> Result<TaskResult> {
        self.connect()?;
        let Some(source) = self.source.as_deref_mut() else {
            return Err(ExportError::ConnectionError("no open connection".to_string()));
        };

        let result = self.exporter.export(source, job);
        let broken = matches!(result, Err(ExportError::ConnectionError(_)));
        if broken || !source.is_reusable() {
            warn!(
                "Dropping unusable connection to {}",
                self.connector.describe()
            );
            self.disconnect();
        }
        result
    }

    /// Runs `jobs` in order on one connection.
    ///
    /// Under `FailFast` the first error is returned and later jobs are not
    /// attempted. Under `BestEffort` failures are logged, recorded in the
    /// report and the batch moves on.
    pub fn export_batch(&mut self, jobs: &[ExportJob]) -> Result<BatchReport> {
        let start_time = Instant::now();
        info!(
            "Starting batch of {} tables (on error: {})",
            jobs.len(),
            self.policy
        );

        let mut report = BatchReport::default();
        for job in jobs {
            match self.export(job) {
                Ok(result) => report.results.push(result),
                Err(e) => match self.policy {
                    BatchPolicy::FailFast => {
                        error!("Batch aborted at table {}: {}", job.table, e);
                        return Err(e);
                    }
                    BatchPolicy::BestEffort => {
                        warn!("Table {} failed, continuing: {}", job.table, e);
                        report.results.push(TaskResult::failure(job, &e));
                    }
                },
            }
        }
        report.duration = start_time.elapsed().as_secs_f64();

        info!(
            "Batch finished. {}/{} tables successful, {} rows written.",
            report.succeeded(),
            report.results.len(),
            report.total_rows()
        );
        Ok(report)
    }
}

impl Drop for ExportSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Writes `report_<timestamp>.json` into `output_dir` and returns its path.
pub fn write_report(report: &BatchReport, output_dir: &Path) -> Result<PathBuf> {
    let duration = report.duration;
    let total_bytes = report.total_bytes();
    let summary = json!({
        "summary": {
            "total_tasks": report.results.len(),
            "success": report.succeeded(),
            "failed": report.failed(),
            "total_rows": report.total_rows(),
            "total_bytes": total_bytes,
            "total_duration_seconds": duration,
            "total_mb_per_sec": if duration > 0.0 { (total_bytes as f64 / 1024.0 / 1024.0) / duration } else { 0.0 }
        },
        "details": report.results
    });

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let report_path = output_dir.join(format!("report_{}.json", timestamp));

    std::fs::create_dir_all(output_dir).map_err(|e| ExportError::io(output_dir, e))?;
    let file =
        std::fs::File::create(&report_path).map_err(|e| ExportError::io(&report_path, e))?;
    serde_json::to_writer_pretty(file, &summary).map_err(|e| {
        ExportError::io(
            &report_path,
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        )
    })?;

    info!("Report written to {}", report_path.display());
    Ok(report_path)
}
