mod cli;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands};
use colored::*;
use dotenv::dotenv;
use shelf_life::actions::{BackupExecutor, CommandArchiver, CommandBackup};
use shelf_life::notice::{LogNotifier, Notifier};
use shelf_life::{balance, discovery, inspect, lock, logging};
use shelf_life::{AppConfig, RecordStore, ScanEngine};
use std::path::Path;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Cli::parse();
    let config = AppConfig::load(&args.config)
        .with_context(|| format!("can not load config {}", args.config.display()))?;

    match args.command {
        Some(Commands::Inspect) => {
            let _guard = logging::init(None);
            let store = open_store(&config)?;
            let report = inspect::inspect(&store)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Some(Commands::LoadBalance) => {
            let _guard = logging::init(None);
            let store = open_store(&config)?;
            info!("start load balance");
            let count = balance::load_balance(&store, &config, Utc::now())?;
            info!("finish load balance, {count} records redistributed");
            Ok(())
        }
        Some(Commands::Run) | None => run(&config),
    }
}

fn open_store(config: &AppConfig) -> anyhow::Result<RecordStore> {
    RecordStore::open(Path::new(&config.db))
        .with_context(|| format!("can not open record store {}", config.db))
}

fn run(config: &AppConfig) -> anyhow::Result<()> {
    let log_folder = (!config.log_folder.is_empty()).then(|| Path::new(&config.log_folder));
    let _guard = logging::init(log_folder);

    // Hold the instance lock for the whole pass; two concurrent passes
    // would race each other on the same datasets.
    let _lock = if config.pid_file.is_empty() {
        None
    } else {
        Some(
            lock::try_lock(Path::new(&config.pid_file))
                .context("another shelf-life process may be running")?,
        )
    };

    let store = open_store(config)?;

    info!("start archive pass");
    discovery::scan_folders(&store, config).context("dataset discovery failed")?;

    let archiver = CommandArchiver::new(config.archive_command.clone());
    let backup_command = (!config.backup_command.is_empty())
        .then(|| CommandBackup::new(config.backup_command.clone()));
    let backup = backup_command.as_ref().map(|b| b as &dyn BackupExecutor);

    let engine = ScanEngine::new(&store, config, &archiver, backup);
    let report = engine.scan_records()?;

    if let Err(e) = LogNotifier::new(&config.server_name).notify(&report) {
        error!("failed to deliver report: {e}");
    }

    info!(
        "finish archive pass: {} archived, {} notices, {} errors",
        report.archived.len().to_string().green(),
        report.notices.len().to_string().yellow(),
        report.errors.len().to_string().red(),
    );
    Ok(())
}
