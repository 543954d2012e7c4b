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

//! # Source Port
//!
//! This Port defines what it means to "read a table" from a database.
//! It doesn't care IF the database is MySQL, MariaDB, or an in-memory fake
//! for testing. The exporter only talks to these traits.
//!
//! A connection is modelled as an owned value (`Box<dyn TableSource>`): it is
//! released when dropped, whichever way the export ends.

use crate::domain::entities::{ColumnSchema, ExportJob, Row};
use crate::domain::errors::Result;

/// Opens exclusive database sessions.
pub trait SourceConnector: Send + Sync {
    /// Establishes a new session. Fails with `ConnectionError`.
    fn connect(&self) -> Result<Box<dyn TableSource>>;

    /// Human readable target (e.g. `localhost:3306/Northwind`) for log lines.
    fn describe(&self) -> String;
}

/// One open database session.
pub trait TableSource: Send {
    /// Counts the rows matching the job's filter (the limit is ignored).
    fn count_rows(&mut self, job: &ExportJob) -> Result<u64>;

    /// Issues the select for `job` and returns a cursor positioned before
    /// the first row. The cursor borrows the session until it is dropped.
    fn open_cursor<'a>(&'a mut self, job: &ExportJob) -> Result<Box<dyn RowCursor + 'a>>;

    /// False once a cursor was dropped before the end of its result set and
    /// the session can no longer run queries. The caller drops it instead.
    fn is_reusable(&self) -> bool {
        true
    }
}

/// A forward-only cursor over a result set.
pub trait RowCursor {
    /// Column names from the result-set metadata.
    fn columns(&self) -> &ColumnSchema;

    /// Returns up to `max_rows` rows. An empty vector means end of results.
    fn fetch_many(&mut self, max_rows: usize) -> Result<Vec<Row>>;
}
