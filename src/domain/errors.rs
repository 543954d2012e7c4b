// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Core error definitions for the MySQL CSV exporter.
//!
//! This module provides a centralized `ExportError` enum and a `Result` type
//! used throughout the application. Every failure falls into one of three
//! kinds (connection, query, I/O) plus configuration and cancellation.

use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Error types encountered during the export process.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query failed for {table}: {reason}")]
    QueryError { table: String, reason: String },

    #[error("I/O error on {path}: {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Export of {table} cancelled after {rows} rows")]
    Cancelled { table: String, rows: u64 },
}

/// Coarse classification used by callers deciding on retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Connection,
    Query,
    Io,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Config => "CONFIG",
            ErrorKind::Connection => "CONNECTION",
            ErrorKind::Query => "QUERY",
            ErrorKind::Io => "IO",
            ErrorKind::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

impl ExportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::ConfigError(_) => ErrorKind::Config,
            ExportError::ConnectionError(_) => ErrorKind::Connection,
            ExportError::QueryError { .. } => ErrorKind::Query,
            ExportError::IoError { .. } => ErrorKind::Io,
            ExportError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Creates a `QueryError` for a table.
    pub fn query(table: impl Into<String>, reason: impl ToString) -> Self {
        ExportError::QueryError {
            table: table.into(),
            reason: reason.to_string(),
        }
    }

    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ExportError::IoError {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Converts a `csv` writer error into an `IoError`.
    ///
    /// The writer is only ever fed string records of a checked width, so any
    /// non-I/O kind is reported with its debug form.
    pub fn csv(path: impl AsRef<Path>, err: csv::Error) -> Self {
        let source = match err.into_kind() {
            csv::ErrorKind::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", other)),
        };
        ExportError::io(path, source)
    }
}

/// A specialized Result type for the exporter.
pub type Result<T> = std::result::Result<T, ExportError>;
