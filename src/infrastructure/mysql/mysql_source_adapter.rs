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

//! # MySQL Source Adapter
//!
//! Concrete implementation of the source port on top of the blocking `mysql`
//! driver. Each session owns exactly one `Conn`; the select is issued over
//! the text protocol and rows are pulled off the socket as the cursor is
//! advanced, so only the rows of the current chunk are held in memory.

use crate::config::DatabaseConfig;
use crate::domain::entities::{CellValue, ColumnSchema, ExportJob, Row};
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::mysql::sql_utils::{build_count_sql, build_select_sql};
use crate::ports::source_port::{RowCursor, SourceConnector, TableSource};
use log::{debug, error, info, warn};
use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, QueryResult, Text, Value};
use std::time::Duration;

/// All sessions talk utf8mb4 so four-byte characters survive the export.
const SESSION_CHARSET: &str = "utf8mb4";

/// Opens `MysqlSession`s from connection parameters.
#[derive(Debug, Clone)]
pub struct MysqlConnector {
    host: String,
    port: u16,
    user: String,
    password: String,
    database: String,
    connect_timeout: Option<Duration>,
}

impl MysqlConnector {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database: database.into(),
            connect_timeout: None,
        }
    }

    /// Builds a connector from the `database` config section.
    ///
    /// The password comes from the config or, failing that, `MYSQL_PASSWORD`.
    pub fn from_config(config: &DatabaseConfig) -> Self {
        let mut connector = Self::new(
            config.host.clone(),
            config.port,
            config.user.clone(),
            config.resolve_password(),
            config.database.clone(),
        );
        connector.connect_timeout = config.connect_timeout_secs.map(Duration::from_secs);
        connector
    }

    fn opts(&self) -> OptsBuilder {
        OptsBuilder::new()
            .ip_or_hostname(Some(self.host.clone()))
            .tcp_port(self.port)
            .user(Some(self.user.clone()))
            .pass(Some(self.password.clone()))
            .db_name(Some(self.database.clone()))
            .tcp_connect_timeout(self.connect_timeout)
            .init(vec![format!("SET NAMES {}", SESSION_CHARSET)])
    }
}

impl SourceConnector for MysqlConnector {
    fn connect(&self) -> Result<Box<dyn TableSource>> {
        info!("Connecting to MySQL database: {}:{}", self.host, self.port);
        match Conn::new(self.opts()) {
            Ok(conn) => {
                info!("Successfully connected to MySQL database");
                Ok(Box::new(MysqlSession {
                    conn,
                    abandoned: false,
                }))
            }
            Err(e) => {
                error!("Failed to connect to MySQL: {}", e);
                Err(ExportError::ConnectionError(format!(
                    "failed to connect to {}: {}",
                    self.describe(),
                    e
                )))
            }
        }
    }

    fn describe(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Upper bound on the rows reserved up front for one chunk.
const MAX_PREALLOCATED_ROWS: usize = 4096;

/// One exclusive MySQL connection. Closed when dropped.
pub struct MysqlSession {
    conn: Conn,
    /// Set when a cursor was dropped with rows still pending on the socket.
    abandoned: bool,
}

/// Maps a driver error onto the export taxonomy.
///
/// Errors reported by the server (unknown table, syntax, privileges) are
/// query errors; socket and protocol failures mean the session is gone.
fn classify(table: &str, err: mysql::Error) -> ExportError {
    match err {
        mysql::Error::MySqlError(e) => ExportError::query(table, e),
        mysql::Error::IoError(e) => ExportError::ConnectionError(format!(
            "lost connection while reading {}: {}",
            table, e
        )),
        mysql::Error::DriverError(e) => ExportError::ConnectionError(format!(
            "driver failure while reading {}: {}",
            table, e
        )),
        other => ExportError::query(table, other),
    }
}

impl TableSource for MysqlSession {
    fn count_rows(&mut self, job: &ExportJob) -> Result<u64> {
        let sql = build_count_sql(job);
        debug!("Executing count query: {}", sql);
        let count: Option<u64> = self
            .conn
            .query_first(&sql)
            .map_err(|e| classify(&job.table, e))?;
        Ok(count.unwrap_or(0))
    }

    fn open_cursor<'a>(&'a mut self, job: &ExportJob) -> Result<Box<dyn RowCursor + 'a>> {
        let sql = build_select_sql(job);
        info!("Executing query: {}", sql);
        let MysqlSession { conn, abandoned } = self;
        let result = conn
            .query_iter(&sql)
            .map_err(|e| classify(&job.table, e))?;

        let columns = ColumnSchema::new(
            result
                .columns()
                .as_ref()
                .iter()
                .map(|c| c.name_str().into_owned()),
        );

        Ok(Box::new(MysqlCursor {
            result: ResultGuard::new(result, abandoned),
            columns,
            table: job.table.clone(),
        }))
    }

    fn is_reusable(&self) -> bool {
        !self.abandoned
    }
}

/// Owns a driver result set and decides what happens to it on drop.
///
/// Dropping a `mysql::QueryResult` reads every remaining row off the socket.
/// A result set released before its end is leaked instead and the session
/// is flagged, so the connection gets closed rather than drained.
struct ResultGuard<'a, R> {
    inner: Option<R>,
    finished: bool,
    abandoned: &'a mut bool,
}

impl<'a, R> ResultGuard<'a, R> {
    fn new(inner: R, abandoned: &'a mut bool) -> Self {
        Self {
            inner: Some(inner),
            finished: false,
            abandoned,
        }
    }

    fn get_mut(&mut self) -> Option<&mut R> {
        self.inner.as_mut()
    }

    fn mark_finished(&mut self) {
        self.finished = true;
    }
}

impl<R> Drop for ResultGuard<'_, R> {
    fn drop(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        if self.finished {
            drop(inner);
        } else {
            warn!("Result set abandoned before its end; the connection will be closed");
            std::mem::forget(inner);
            *self.abandoned = true;
        }
    }
}

struct MysqlCursor<'a> {
    result: ResultGuard<'a, QueryResult<'a, 'a, 'a, Text>>,
    columns: ColumnSchema,
    table: String,
}

fn chunk_capacity(max_rows: usize) -> usize {
    max_rows.min(MAX_PREALLOCATED_ROWS)
}

impl RowCursor for MysqlCursor<'_> {
    fn columns(&self) -> &ColumnSchema {
        &self.columns
    }

    fn fetch_many(&mut self, max_rows: usize) -> Result<Vec<Row>> {
        let mut rows = Vec::with_capacity(chunk_capacity(max_rows));
        let Some(result) = self.result.get_mut() else {
            return Ok(rows);
        };
        while rows.len() < max_rows {
            match result.next() {
                Some(row) => {
                    let row = row.map_err(|e| classify(&self.table, e))?;
                    rows.push(row.unwrap().into_iter().map(to_cell).collect());
                }
                None => {
                    self.result.mark_finished();
                    break;
                }
            }
        }
        Ok(rows)
    }
}

/// Converts a driver value into a `CellValue`.
///
/// The text protocol delivers almost everything as bytes; the typed arms
/// cover values produced by the binary protocol.
fn to_cell(value: Value) -> CellValue {
    match value {
        Value::NULL => CellValue::Null,
        Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => CellValue::Text(s),
            Err(e) => CellValue::Bytes(e.into_bytes()),
        },
        Value::Int(v) => CellValue::Int(v),
        Value::UInt(v) => CellValue::UInt(v),
        Value::Float(v) => CellValue::Float(v as f64),
        Value::Double(v) => CellValue::Float(v),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            CellValue::Text(format_date(year, month, day, hour, minute, second, micros))
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            CellValue::Text(format_time(negative, days, hours, minutes, seconds, micros))
        }
    }
}

/// `YYYY-MM-DD`, or `YYYY-MM-DD HH:MM:SS[.ffffff]` when a time part is set.
fn format_date(
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    micros: u32,
) -> String {
    let date = format!("{:04}-{:02}-{:02}", year, month, day);
    if hour == 0 && minute == 0 && second == 0 && micros == 0 {
        return date;
    }
    let mut s = format!("{} {:02}:{:02}:{:02}", date, hour, minute, second);
    if micros > 0 {
        s.push_str(&format!(".{:06}", micros));
    }
    s
}

/// `[-]HH:MM:SS[.ffffff]` with days folded into the hour count.
fn format_time(
    negative: bool,
    days: u32,
    hours: u8,
    minutes: u8,
    seconds: u8,
    micros: u32,
) -> String {
    let total_hours = days * 24 + hours as u32;
    let mut s = format!(
        "{}{:02}:{:02}:{:02}",
        if negative { "-" } else { "" },
        total_hours,
        minutes,
        seconds
    );
    if micros > 0 {
        s.push_str(&format!(".{:06}", micros));
    }
    s
}
