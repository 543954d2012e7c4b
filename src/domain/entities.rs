//! # Domain Entities
//!
//! Entities are the "Nouns" of the exporter: the job describing one table to
//! export, the column schema and rows read from the database, and the
//! results reported back to the caller.
//!
//! We use the `serde` crate (Serialize/Deserialize) so jobs can come straight
//! from YAML/JSON configuration and results can be written into the report.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

use crate::domain::errors::{ExportError, Result};

/// `ExportJob` is one unit of work: a table, a destination file, and an
/// optional row filter and limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    /// Table to read, optionally qualified as `database.table`.
    pub table: String,
    /// Where to write the delimited output. Existing files are truncated.
    pub output_file: PathBuf,
    /// Raw predicate appended after `WHERE`.
    ///
    /// The predicate is inserted into the SQL text unmodified. Never build it
    /// from untrusted input.
    pub filter: Option<String>,
    /// Maximum number of rows to export. `None` exports everything.
    pub limit: Option<u64>,
}

impl ExportJob {
    pub fn new(table: impl Into<String>, output_file: impl Into<PathBuf>) -> Self {
        Self {
            table: table.into(),
            output_file: output_file.into(),
            filter: None,
            limit: None,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks the job before any SQL is built from it.
    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(ExportError::ConfigError(
                "table name must not be empty".to_string(),
            ));
        }
        if self.table.split('.').any(|part| part.trim().is_empty()) {
            return Err(ExportError::ConfigError(format!(
                "invalid table identifier '{}'",
                self.table
            )));
        }
        if self.output_file.as_os_str().is_empty() {
            return Err(ExportError::ConfigError(format!(
                "output file for table '{}' must not be empty",
                self.table
            )));
        }
        if let Some(filter) = &self.filter {
            if filter.contains(';') {
                return Err(ExportError::ConfigError(format!(
                    "filter for table '{}' must be a single predicate (found ';')",
                    self.table
                )));
            }
        }
        if self.limit == Some(0) {
            return Err(ExportError::ConfigError(format!(
                "limit for table '{}' must be a positive integer",
                self.table
            )));
        }
        Ok(())
    }
}

/// Ordered column names taken from the result-set metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub names: Vec<String>,
}

impl ColumnSchema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A single scalar value read from the database.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Raw bytes that are not valid UTF-8 (BLOB/BINARY columns).
    Bytes(Vec<u8>),
}

impl CellValue {
    /// Renders the value as a single CSV field.
    ///
    /// NULL becomes an empty field and binary data is Base64 encoded.
    pub fn to_field(&self) -> Cow<'_, str> {
        match self {
            CellValue::Null => Cow::Borrowed(""),
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Int(v) => Cow::Owned(v.to_string()),
            CellValue::UInt(v) => Cow::Owned(v.to_string()),
            CellValue::Float(v) => Cow::Owned(v.to_string()),
            CellValue::Bytes(b) => Cow::Owned(general_purpose::STANDARD.encode(b)),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

/// One row of values, in column order.
pub type Row = Vec<CellValue>;

/// What to do with the remaining jobs of a batch once one of them fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Stop at the first failure and return its error.
    #[default]
    FailFast,
    /// Log the failure, record it in the report and continue.
    BestEffort,
}

impl fmt::Display for BatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchPolicy::FailFast => write!(f, "fail_fast"),
            BatchPolicy::BestEffort => write!(f, "best_effort"),
        }
    }
}

/// Outcome of a single job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Success,
    Failed,
}

/// `TaskResult` is the "Report Card" for an `ExportJob`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub table: String,
    pub output_file: String,
    /// Rows written after the header line.
    pub rows: u64,
    /// The `COUNT(*)` estimate taken before the select.
    pub estimated_rows: u64,
    /// Bytes of field data written (before compression).
    pub bytes: u64,
    /// Duration in seconds.
    pub duration: f64,
    pub status: TaskStatus,
    pub error: Option<String>,
}

impl TaskResult {
    pub fn success(
        job: &ExportJob,
        rows: u64,
        estimated_rows: u64,
        bytes: u64,
        duration: f64,
    ) -> Self {
        Self {
            table: job.table.clone(),
            output_file: job.output_file.display().to_string(),
            rows,
            estimated_rows,
            bytes,
            duration,
            status: TaskStatus::Success,
            error: None,
        }
    }

    pub fn failure(job: &ExportJob, error: &ExportError) -> Self {
        Self {
            table: job.table.clone(),
            output_file: job.output_file.display().to_string(),
            rows: 0,
            estimated_rows: 0,
            bytes: 0,
            duration: 0.0,
            status: TaskStatus::Failed,
            error: Some(format!("[{}] {}", error.kind(), error)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}

/// Results of a batch, in the order the jobs were attempted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<TaskResult>,
    pub duration: f64,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn total_rows(&self) -> u64 {
        self.results.iter().map(|r| r.rows).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.results.iter().map(|r| r.bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_validation() {
        assert!(ExportJob::new("Categories", "categories.csv")
            .validate()
            .is_ok());
        assert!(ExportJob::new("Northwind.Orders", "orders.csv")
            .with_filter("OrderID > 10")
            .with_limit(5)
            .validate()
            .is_ok());

        let bad = [
            ExportJob::new("", "x.csv"),
            ExportJob::new("db.", "x.csv"),
            ExportJob::new("Orders", ""),
            ExportJob::new("Orders", "x.csv").with_limit(0),
            ExportJob::new("Orders", "x.csv").with_filter("1=1; DROP TABLE Orders"),
        ];
        for job in bad {
            assert!(
                matches!(job.validate(), Err(ExportError::ConfigError(_))),
                "{job:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(CellValue::Null.to_field(), "");
        assert_eq!(CellValue::from("Smith, John").to_field(), "Smith, John");
        assert_eq!(CellValue::Int(-42).to_field(), "-42");
        assert_eq!(CellValue::UInt(7).to_field(), "7");
        assert_eq!(CellValue::Float(2.5).to_field(), "2.5");
        assert_eq!(CellValue::Bytes(vec![0xff, 0x00, 0x10]).to_field(), "/wAQ");
    }

    #[test]
    fn test_batch_policy_serde() {
        let p: BatchPolicy = serde_yaml::from_str("best_effort").unwrap();
        assert_eq!(p, BatchPolicy::BestEffort);
        assert_eq!(BatchPolicy::default(), BatchPolicy::FailFast);
    }
}
