//! Configuration loading.
//!
//! Settings come from a YAML (or `.json`) file and are then overridden by
//! command line arguments, so ad-hoc single-table runs need no file at all.

use crate::domain::entities::{BatchPolicy, ExportJob};
use crate::domain::errors::{ExportError, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_FETCH_SIZE: usize = 1000;
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 5000;
pub const PASSWORD_ENV: &str = "MYSQL_PASSWORD";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub tables: Vec<TableJobConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub connect_timeout_secs: Option<u64>,
}

impl DatabaseConfig {
    /// Config password, then `MYSQL_PASSWORD`, then empty.
    pub fn resolve_password(&self) -> String {
        self.password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Base directory for relative output paths (and the run report).
    pub output_dir: String,
    /// Rows pulled from the cursor per round trip.
    pub fetch_size: usize,
    /// Emit a progress line every time this many more rows are written.
    pub progress_interval: u64,
    pub delimiter: String,
    /// Gzip the output files.
    pub compress: bool,
    pub on_error: BatchPolicy,
    /// Write `report_<timestamp>.json` into `output_dir` after the batch.
    pub write_report: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
            fetch_size: DEFAULT_FETCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            delimiter: ",".to_string(),
            compress: false,
            on_error: BatchPolicy::FailFast,
            write_report: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TableJobConfig {
    pub table: String,
    pub output: Option<String>,
    #[serde(alias = "where")]
    pub filter: Option<String>,
    pub limit: Option<u64>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(short, long)]
    pub user: Option<String>,
    /// Falls back to the MYSQL_PASSWORD environment variable
    #[arg(long)]
    pub password: Option<String>,
    #[arg(short, long)]
    pub database: Option<String>,

    /// Export only this table (replaces the configured table list)
    #[arg(short, long)]
    pub table: Option<String>,
    /// Output file for --table
    #[arg(short, long)]
    pub output: Option<String>,
    /// Raw WHERE predicate for --table (trusted input only)
    #[arg(long = "where")]
    pub query_where: Option<String>,
    /// Maximum rows to export for --table
    #[arg(long)]
    pub limit: Option<u64>,

    #[arg(long)]
    pub output_dir: Option<String>,
    #[arg(long)]
    pub fetch_size: Option<usize>,
    /// Continue with the next table when one fails
    #[arg(long)]
    pub best_effort: bool,
    /// Gzip the output files
    #[arg(long)]
    pub compress: bool,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ExportError::io(path, e))?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)
                .map_err(|e| ExportError::ConfigError(format!("{}: {}", path, e)))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| ExportError::ConfigError(format!("{}: {}", path, e)))?
        };

        Ok(config)
    }

    /// Builds a config purely from the command line.
    pub fn default_from_cli(args: &CliArgs) -> Self {
        Self {
            database: DatabaseConfig {
                host: args.host.clone().unwrap_or_else(|| "localhost".to_string()),
                port: args.port.unwrap_or(DEFAULT_PORT),
                user: args.user.clone().unwrap_or_default(),
                password: args.password.clone(),
                database: args.database.clone().unwrap_or_default(),
                connect_timeout_secs: None,
            },
            export: ExportConfig::default(),
            tables: Vec::new(),
        }
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(h) = &args.host { self.database.host = h.clone(); }
        if let Some(p) = args.port { self.database.port = p; }
        if let Some(u) = &args.user { self.database.user = u.clone(); }
        if let Some(p) = &args.password { self.database.password = Some(p.clone()); }
        if let Some(d) = &args.database { self.database.database = d.clone(); }
        if let Some(o) = &args.output_dir { self.export.output_dir = o.clone(); }
        if let Some(f) = args.fetch_size { self.export.fetch_size = f; }
        if args.best_effort { self.export.on_error = BatchPolicy::BestEffort; }
        if args.compress { self.export.compress = true; }

        if let Some(t) = &args.table {
            self.tables = vec![TableJobConfig {
                table: t.clone(),
                output: args.output.clone(),
                filter: args.query_where.clone(),
                limit: args.limit,
            }];
        }
    }

    pub fn validate(&self) -> Result<()> {
        let db = &self.database;
        for (name, value) in [("host", &db.host), ("user", &db.user), ("database", &db.database)] {
            if value.trim().is_empty() {
                return Err(ExportError::ConfigError(format!(
                    "database.{} is required",
                    name
                )));
            }
        }
        if self.export.fetch_size == 0 {
            return Err(ExportError::ConfigError(
                "export.fetch_size must be greater than zero".to_string(),
            ));
        }
        if self.export.progress_interval == 0 {
            return Err(ExportError::ConfigError(
                "export.progress_interval must be greater than zero".to_string(),
            ));
        }
        self.delimiter_byte()?;
        if self.tables.is_empty() {
            return Err(ExportError::ConfigError(
                "no tables to export (configure `tables` or pass --table)".to_string(),
            ));
        }
        for job in self.jobs() {
            job.validate()?;
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.export.delimiter.as_bytes() {
            [b] if *b != b'"' && *b != b'\n' && *b != b'\r' => Ok(*b),
            _ => Err(ExportError::ConfigError(format!(
                "export.delimiter must be a single byte other than quote or newline, got {:?}",
                self.export.delimiter
            ))),
        }
    }

    /// Expands the table list into export jobs, in configured order.
    pub fn jobs(&self) -> Vec<ExportJob> {
        self.tables
            .iter()
            .map(|t| {
                let output = t
                    .output
                    .clone()
                    .unwrap_or_else(|| self.default_output_name(&t.table));
                ExportJob {
                    table: t.table.clone(),
                    output_file: self.resolve_output(&output),
                    filter: t.filter.clone(),
                    limit: t.limit,
                }
            })
            .collect()
    }

    /// `Categories` -> `categories.csv`, `db.Orders` -> `orders.csv`.
    fn default_output_name(&self, table: &str) -> String {
        let base = table.rsplit('.').next().unwrap_or(table).to_lowercase();
        if self.export.compress {
            format!("{}.csv.gz", base)
        } else {
            format!("{}.csv", base)
        }
    }

    fn resolve_output(&self, output: &str) -> PathBuf {
        let path = Path::new(output);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.export.output_dir).join(path)
        }
    }
}
