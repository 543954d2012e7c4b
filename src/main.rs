//! # MySQL CSV Exporter
//!
//! Command line entry point: loads configuration, opens one MySQL session
//! and exports the configured tables in order.
//!
//! No signal handler is installed. Ctrl-C terminates the process at once and
//! the file being written must be discarded; `CancelFlag` is only available
//! to library callers.

use clap::Parser;
use log::{error, info};
use mysql_csv_exporter::application::exporter::{ExportSettings, TableExporter};
use mysql_csv_exporter::application::orchestrator::{write_report, ExportSession};
use mysql_csv_exporter::config::{AppConfig, CliArgs};
use mysql_csv_exporter::infrastructure::local_storage::file_output::LocalFileOutput;
use mysql_csv_exporter::infrastructure::mysql::MysqlConnector;
use std::path::Path;
use std::process;
use std::sync::Arc;

fn main() {
    // 1. Initialize Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    // 3. Load Config
    let mut config = if let Some(config_path) = &args.config {
        match AppConfig::from_file(config_path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load config: {}", e);
                process::exit(1);
            }
        }
    } else {
        AppConfig::default_from_cli(&args)
    };

    // Merge CLI overrides
    config.merge_cli(&args);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    // 4. Wire components
    let delimiter = match config.delimiter_byte() {
        Ok(d) => d,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    let output = Arc::new(LocalFileOutput::new(config.export.compress));
    let exporter = TableExporter::new(
        output,
        ExportSettings::from_config(&config.export, delimiter),
    );
    let connector = Arc::new(MysqlConnector::from_config(&config.database));
    let mut session = ExportSession::new(connector, exporter).with_policy(config.export.on_error);

    // 5. Run
    let jobs = config.jobs();
    info!("Starting export of {} tables...", jobs.len());
    let outcome = session.export_batch(&jobs);
    session.disconnect();

    match outcome {
        Ok(report) => {
            if config.export.write_report {
                if let Err(e) = write_report(&report, Path::new(&config.export.output_dir)) {
                    error!("Failed to write report: {}", e);
                }
            }
            for result in &report.results {
                info!("  {} -> {} ({} rows)", result.table, result.output_file, result.rows);
            }
            if report.failed() > 0 {
                error!(
                    "Export finished with failures. {}/{} tables successful.",
                    report.succeeded(),
                    report.results.len()
                );
                process::exit(1);
            }
            info!("All tables exported successfully!");
        }
        Err(e) => {
            error!("Export failed [{}]: {}", e.kind(), e);
            process::exit(1);
        }
    }
}
