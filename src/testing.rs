//! In-memory fakes for the ports, shared by the unit tests.

use crate::domain::entities::{CellValue, ColumnSchema, ExportJob, Row};
use crate::domain::errors::{ExportError, Result};
use crate::ports::output_port::{OutputPort, OutputSink};
use crate::ports::source_port::{RowCursor, SourceConnector, TableSource};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub columns: ColumnSchema,
    pub rows: Vec<Row>,
}

impl MemoryTable {
    pub fn new<const N: usize>(columns: [&str; N], rows: Vec<Row>) -> Self {
        Self {
            columns: ColumnSchema::new(columns),
            rows,
        }
    }
}

/// Northwind's `Categories`, reduced to id and name.
pub fn categories_table() -> MemoryTable {
    let names = [
        "Beverages",
        "Condiments",
        "Confections",
        "Dairy Products",
        "Grains/Cereals",
        "Meat/Poultry",
        "Produce",
        "Seafood",
    ];
    MemoryTable::new(
        ["CategoryID", "CategoryName"],
        names
            .iter()
            .enumerate()
            .map(|(i, n)| vec![CellValue::Int(i as i64 + 1), CellValue::from(*n)])
            .collect(),
    )
}

/// A `TableSource` over in-memory tables.
///
/// Filters are limited to `<column> <op> <literal>` with `=`, `!=`, `<`,
/// `<=`, `>`, `>=` and integer or single-quoted literals.
///
/// Like the MySQL session, a cursor dropped before its last row leaves the
/// source not reusable.
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: HashMap<String, MemoryTable>,
    fetch_calls: usize,
    abandoned: bool,
    failing_count: bool,
    lost_connection: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, table: MemoryTable) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }

    /// `count_rows` fails with a server error; the select still works.
    pub fn with_failing_count(mut self) -> Self {
        self.failing_count = true;
        self
    }

    /// Every `fetch_many` fails as if the socket had been closed.
    pub fn with_lost_connection(mut self) -> Self {
        self.lost_connection = true;
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls
    }

    fn select(&self, job: &ExportJob) -> Result<(ColumnSchema, Vec<Row>)> {
        let table = self.tables.get(&job.table).ok_or_else(|| {
            ExportError::query(&job.table, format!("Table '{}' doesn't exist", job.table))
        })?;
        let predicate = match job.filter.as_deref() {
            Some(f) => Some(Predicate::parse(f, &table.columns).ok_or_else(|| {
                ExportError::query(&job.table, format!("unsupported filter '{}'", f))
            })?),
            None => None,
        };
        let rows = table
            .rows
            .iter()
            .filter(|r| predicate.as_ref().map_or(true, |p| p.matches(r)))
            .cloned()
            .collect();
        Ok((table.columns.clone(), rows))
    }
}

impl TableSource for MemorySource {
    fn count_rows(&mut self, job: &ExportJob) -> Result<u64> {
        if self.failing_count {
            return Err(ExportError::query(
                &job.table,
                "Expression #1 of ORDER BY clause is not in GROUP BY clause",
            ));
        }
        let (_, rows) = self.select(job)?;
        Ok(rows.len() as u64)
    }

    fn open_cursor<'a>(&'a mut self, job: &ExportJob) -> Result<Box<dyn RowCursor + 'a>> {
        let (columns, mut rows) = self.select(job)?;
        if let Some(limit) = job.limit {
            rows.truncate(limit as usize);
        }
        let MemorySource {
            fetch_calls,
            abandoned,
            lost_connection,
            ..
        } = self;
        Ok(Box::new(MemoryCursor {
            columns,
            rows: rows.into_iter(),
            finished: false,
            lost_connection: *lost_connection,
            fetch_calls,
            abandoned,
        }))
    }

    fn is_reusable(&self) -> bool {
        !self.abandoned
    }
}

struct MemoryCursor<'a> {
    columns: ColumnSchema,
    rows: std::vec::IntoIter<Row>,
    finished: bool,
    lost_connection: bool,
    fetch_calls: &'a mut usize,
    abandoned: &'a mut bool,
}

impl RowCursor for MemoryCursor<'_> {
    fn columns(&self) -> &ColumnSchema {
        &self.columns
    }

    fn fetch_many(&mut self, max_rows: usize) -> Result<Vec<Row>> {
        *self.fetch_calls += 1;
        if self.lost_connection {
            return Err(ExportError::ConnectionError(
                "Lost connection to MySQL server during query".to_string(),
            ));
        }
        let chunk: Vec<Row> = self.rows.by_ref().take(max_rows).collect();
        if chunk.is_empty() {
            self.finished = true;
        }
        Ok(chunk)
    }
}

impl Drop for MemoryCursor<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.abandoned = true;
        }
    }
}

struct Predicate {
    column: usize,
    op: &'static str,
    literal: CellValue,
}

impl Predicate {
    fn parse(filter: &str, columns: &ColumnSchema) -> Option<Self> {
        const OPS: [&str; 6] = ["!=", "<=", ">=", "=", "<", ">"];
        let op = OPS.into_iter().find(|op| filter.contains(op))?;
        let (lhs, rhs) = filter.split_once(op)?;
        let column = columns.names.iter().position(|c| c == lhs.trim())?;
        let rhs = rhs.trim();
        let literal = if let Some(s) = rhs.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
            CellValue::Text(s.to_string())
        } else {
            CellValue::Int(rhs.parse().ok()?)
        };
        Some(Self {
            column,
            op,
            literal,
        })
    }

    fn matches(&self, row: &Row) -> bool {
        let ord = match (&row[self.column], &self.literal) {
            (CellValue::Int(a), CellValue::Int(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            _ => return false,
        };
        match self.op {
            "=" => ord == Ordering::Equal,
            "!=" => ord != Ordering::Equal,
            "<" => ord == Ordering::Less,
            "<=" => ord != Ordering::Greater,
            ">" => ord == Ordering::Greater,
            ">=" => ord != Ordering::Less,
            _ => false,
        }
    }
}

/// Hands out `MemorySource` sessions over a shared set of tables.
#[derive(Default)]
pub struct MemoryConnector {
    tables: Vec<(String, MemoryTable)>,
    connects: Arc<AtomicUsize>,
    refuse: bool,
    lose_first_session: bool,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, table: MemoryTable) -> Self {
        self.tables.push((name.to_string(), table));
        self
    }

    /// Every `connect` fails with `ConnectionError`.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// The first session loses its connection on the first fetch; later
    /// sessions are healthy.
    pub fn losing_first_session(mut self) -> Self {
        self.lose_first_session = true;
        self
    }

    pub fn connect_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.connects)
    }
}

impl SourceConnector for MemoryConnector {
    fn connect(&self) -> Result<Box<dyn TableSource>> {
        if self.refuse {
            return Err(ExportError::ConnectionError(
                "Access denied for user 'root'@'localhost'".to_string(),
            ));
        }
        let previous = self.connects.fetch_add(1, AtomicOrdering::SeqCst);
        let mut source = self
            .tables
            .iter()
            .fold(MemorySource::new(), |s, (name, t)| s.with_table(name, t.clone()));
        if self.lose_first_session && previous == 0 {
            source = source.with_lost_connection();
        }
        Ok(Box::new(source))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Writes to the real file, then fails once `limit` bytes have gone through.
pub struct FailingOutput {
    limit: usize,
}

impl FailingOutput {
    pub fn after_bytes(limit: usize) -> Self {
        Self { limit }
    }
}

impl OutputPort for FailingOutput {
    fn create(&self, path: &Path) -> Result<Box<dyn OutputSink>> {
        let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
        Ok(Box::new(FailingSink {
            file,
            written: 0,
            limit: self.limit,
        }))
    }
}

struct FailingSink {
    file: File,
    written: usize,
    limit: usize,
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.written >= self.limit {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "No space left on device",
            ));
        }
        let n = buf.len().min(self.limit - self.written);
        self.file.write_all(&buf[..n])?;
        self.written += n;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl OutputSink for FailingSink {
    fn finish(mut self: Box<Self>) -> std::io::Result<()> {
        self.flush()
    }
}
