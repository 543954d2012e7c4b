//! Utility functions for generating MySQL statements.
//!
//! This module builds the two statements an export issues: the `COUNT(*)`
//! estimate and the streaming `SELECT *`. Table identifiers are quoted;
//! the filter predicate is appended verbatim.

use crate::domain::entities::ExportJob;

/// Quotes a possibly qualified identifier (`db.table`) with backticks.
///
/// Embedded backticks are escaped by doubling them.
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("`{}`", part.trim().replace('`', "``")))
        .collect::<Vec<_>>()
        .join(".")
}

fn where_clause(filter: Option<&str>) -> String {
    match filter.map(str::trim) {
        Some(f) if !f.is_empty() => format!(" WHERE {}", f),
        _ => String::new(),
    }
}

/// `SELECT COUNT(*) FROM <table> [WHERE <filter>]`
///
/// The limit is deliberately left out; the caller caps the estimate.
pub fn build_count_sql(job: &ExportJob) -> String {
    format!(
        "SELECT COUNT(*) FROM {}{}",
        quote_ident(&job.table),
        where_clause(job.filter.as_deref())
    )
}

/// `SELECT * FROM <table> [WHERE <filter>] [LIMIT <limit>]`
pub fn build_select_sql(job: &ExportJob) -> String {
    let mut sql = format!(
        "SELECT * FROM {}{}",
        quote_ident(&job.table),
        where_clause(job.filter.as_deref())
    );
    if let Some(limit) = job.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    sql
}
