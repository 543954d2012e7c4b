//! # MySQL CSV Exporter
//!
//! Streams MySQL tables into delimited text files, one file per table, with a
//! header row and bounded memory use regardless of table size.
//!
//! The crate follows the **Hexagonal Architecture** (Ports and Adapters):
//! the exporter only knows the [`ports`] traits, while [`infrastructure`]
//! provides the MySQL and local filesystem adapters.
//!
//! ```rust,no_run
//! use mysql_csv_exporter::application::exporter::{ExportSettings, TableExporter};
//! use mysql_csv_exporter::application::orchestrator::ExportSession;
//! use mysql_csv_exporter::domain::entities::ExportJob;
//! use mysql_csv_exporter::infrastructure::local_storage::file_output::LocalFileOutput;
//! use mysql_csv_exporter::infrastructure::mysql::MysqlConnector;
//! use std::sync::Arc;
//!
//! # fn main() -> mysql_csv_exporter::Result<()> {
//! let connector = MysqlConnector::new("localhost", 3306, "root", "", "Northwind");
//! let exporter = TableExporter::new(Arc::new(LocalFileOutput::new(false)), ExportSettings::default());
//! let mut session = ExportSession::new(Arc::new(connector), exporter);
//!
//! let result = session.export(&ExportJob::new("Categories", "categories.csv"))?;
//! println!("{} rows written", result.rows);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

pub use domain::entities::{BatchPolicy, BatchReport, ExportJob, TaskResult};
pub use domain::errors::{ErrorKind, ExportError, Result};
