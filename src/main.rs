mod error;

use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use exn::ResultExt;
use serde::Serialize;
use shoebox_catalog::{Database, KeyValueStore, Repository};
use shoebox_config::Config;
use shoebox_library::{Library, LibraryScanStatus, ScanState};
use shoebox_process::Pipeline;
use shoebox_storage::Scanner;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "shoebox=info,shoebox_library=info,shoebox_catalog=info,shoebox_process=warn,shoebox_storage=warn";

#[derive(Parser, Debug)]
#[command(name = "shoebox", version, about = "Self-hosted media backup server")]
struct Cli {
    /// Config file (TOML, YAML or JSON); defaults to the user config directory
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the catalog with the media directories
    Scan,
    /// Print cataloged media as JSON
    List {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Print the server identity
    Info,
    /// Change the server's display name
    Rename { name: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:?}");
            return ExitCode::FAILURE;
        },
    };
    init_tracing(config.log.filter.as_deref());
    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "Command failed");
            ExitCode::FAILURE
        },
    }
}

/// `RUST_LOG` first, then the configured filter, then the default.
fn init_tracing(configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(command: Command, config: &Config) -> Result<()> {
    let db = Database::connect(config.library.catalog_path()).await.or_raise(|| ErrorKind::Catalog)?;
    let server = KeyValueStore::from(&db);
    server.init_server_info().await.or_raise(|| ErrorKind::Catalog)?;

    let result = match command {
        Command::Scan => scan(&open_library(&db, config)?).await,
        Command::List { limit, offset } => {
            let records = open_library(&db, config)?.list_media(limit, offset).await.or_raise(|| ErrorKind::Library)?;
            print_json(&records)
        },
        Command::Info => print_json(&server.server_info().await.or_raise(|| ErrorKind::Catalog)?),
        Command::Rename { name } => print_json(&server.rename_server(name).await.or_raise(|| ErrorKind::Catalog)?),
    };
    db.close().await;
    result
}

fn open_library(db: &Database, config: &Config) -> Result<Library> {
    let scanner = Scanner::new(config.library.scan_roots(), config.scanner.extensions())
        .excluding(config.library.meta_dir.clone());
    let mut pipeline =
        Pipeline::new(config.library.thumbs_dir()).with_thumbnail_size(config.processing.thumbnail_size);
    if let Some(filename_date) = config.processing.filename_date().or_raise(|| ErrorKind::Config)? {
        pipeline = pipeline.with_filename_date(filename_date);
    }
    if let Some(ffmpeg) = &config.processing.ffmpeg {
        pipeline = pipeline.with_ffmpeg(ffmpeg.clone());
    }
    Ok(Library::new(
        Arc::new(Repository::from(db)),
        scanner,
        Arc::new(pipeline),
        config.library.uploads_dir.clone(),
    ))
}

async fn scan(library: &Library) -> Result<()> {
    let progress = tokio::spawn(report_progress(library.subscribe()));
    library.scan_library();
    let finished = tokio::select! {
        finished = library.wait_for_scan() => finished.or_raise(|| ErrorKind::Library)?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; the next scan picks up where this one stopped");
            None
        },
    };
    progress.abort();
    match finished {
        Some(status) => print_json(&status),
        None => Ok(()),
    }
}

/// Log each phase change, and every file count at debug level.
async fn report_progress(mut updates: watch::Receiver<Option<LibraryScanStatus>>) {
    let mut phase: Option<ScanState> = None;
    while updates.changed().await.is_ok() {
        let Some(status) = updates.borrow_and_update().clone() else {
            continue;
        };
        if phase != Some(status.state) {
            phase = Some(status.state);
            tracing::info!(
                state = %status.state,
                detected = status.media_files_detected,
                to_process = status.files_to_process,
                "Scan phase"
            );
        } else {
            tracing::debug!(
                detected = status.media_files_detected,
                new = status.new_files,
                moved = status.files_moved,
                processed = status.files_processed,
                "Scan progress"
            );
        }
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).or_raise(|| ErrorKind::Output)?;
    println!("{json}");
    Ok(())
}
