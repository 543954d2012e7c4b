//! MySQL/MariaDB source driver.
//!
//! - [`MysqlConnector`]: opens exclusive sessions
//! - [`MysqlSession`]: count and streaming select for one table at a time
//!
//! Connection parameters follow the `database` config section; every
//! session uses the utf8mb4 character set.

pub mod mysql_source_adapter;
pub mod sql_utils;

pub use mysql_source_adapter::{MysqlConnector, MysqlSession};
