// crashlog-sleuth - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. Logging initialisation (debug mode support)
// 3. Config file resolution
// 4. Path expansion, batch scan dispatch, report-to-file writing

pub use crashlog_sleuth::app;
pub use crashlog_sleuth::core;
pub use crashlog_sleuth::platform;
pub use crashlog_sleuth::util;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use app::batch::process_batch;
use app::config::ConfigStore;
use core::discovery::{discover_files, DiscoveryConfig};
use core::model::{ScanOptions, ScanStatus};

/// crashlog-sleuth - crash-log analyzer for Creation Engine games.
#[derive(Parser, Debug)]
#[command(name = "crashlog-sleuth", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan one or more crash logs (or directories containing them) and
    /// write a diagnostic report for each.
    Scan {
        /// Crash log files or directories to scan.
        paths: Vec<PathBuf>,

        /// Maximum number of logs processed concurrently.
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Disable the Result Cache.
        #[arg(long)]
        no_cache: bool,

        /// Enable File Integrity / FCX checks.
        #[arg(long)]
        fcx: bool,

        /// Print a progress line as each log completes.
        #[arg(long)]
        progress: bool,

        /// Explicit config file to load instead of the platform default.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Enable debug logging (equivalent to RUST_LOG=debug).
        #[arg(short = 'd', long)]
        debug: bool,

        /// Directory to write `<log-stem>-AUTOSCAN.md` reports into.
        /// Defaults to alongside each input log.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

/// Expand a CLI path argument into concrete log file paths: a directory is
/// expanded to its matching children via `core::discovery`; a file is
/// passed through unchanged.
fn expand_path(path: &Path) -> Result<Vec<PathBuf>, String> {
    if path.is_dir() {
        let config = DiscoveryConfig::default();
        let (files, warnings) = discover_files(path, &config, |_, _| {})
            .map_err(|e| format!("failed to expand directory '{}': {e}", path.display()))?;
        for warning in &warnings {
            tracing::warn!(%warning, "discovery warning");
        }
        Ok(files.into_iter().map(|f| f.path).collect())
    } else {
        Ok(vec![path.to_path_buf()])
    }
}

fn report_file_path(log_path: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = log_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "crash".to_string());
    let file_name = format!("{stem}-AUTOSCAN.md");
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => log_path.with_file_name(file_name),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Command::Scan {
        paths,
        max_concurrency,
        no_cache,
        fcx,
        progress,
        config,
        debug,
        output_dir,
    } = cli.command;

    util::logging::init(debug, None, None);

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug,
        "crashlog-sleuth starting"
    );

    if paths.is_empty() {
        eprintln!("Error: at least one path is required");
        return ExitCode::from(3);
    }

    let platform_paths = platform::config::PlatformPaths::resolve();
    let config_store = match &config {
        Some(path) => match ConfigStore::load(path) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Error: failed to load config '{}': {e}", path.display());
                return ExitCode::from(3);
            }
        },
        None => {
            let default_path = platform_paths.config_dir.join("crashlog-sleuth.toml");
            if default_path.exists() {
                match ConfigStore::load(&default_path) {
                    Ok(store) => store,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to load default config, using empty store");
                        ConfigStore::from_value(toml::Value::Table(Default::default()))
                    }
                }
            } else {
                ConfigStore::from_value(toml::Value::Table(Default::default()))
            }
        }
    };
    config_store.prefetch_all();

    let mut expanded_paths = Vec::new();
    for path in &paths {
        match expand_path(path) {
            Ok(mut files) => expanded_paths.append(&mut files),
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::from(3);
            }
        }
    }

    if expanded_paths.is_empty() {
        eprintln!("Error: no matching log files found");
        return ExitCode::from(3);
    }

    let options = ScanOptions {
        max_concurrency: max_concurrency
            .unwrap_or_else(|| ScanOptions::default().max_concurrency),
        queue_capacity: util::constants::DEFAULT_QUEUE_CAPACITY,
        use_cache: !no_cache,
        fcx_mode: fcx,
    };

    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_for_signal.cancel();
        }
    });

    let mut any_failed = false;
    let mut any_cancelled = false;
    let output_dir_ref = output_dir.as_deref();

    process_batch(
        expanded_paths,
        &options,
        &config_store,
        |result| {
            match result.status {
                ScanStatus::Failed => any_failed = true,
                ScanStatus::Cancelled => any_cancelled = true,
                _ => {}
            }

            println!(
                "{}: {:?}{}",
                result.log_path.display(),
                result.status,
                if result.has_errors { " (with errors)" } else { "" }
            );

            if !result.report.is_empty() {
                let report_path = report_file_path(&result.log_path, output_dir_ref);
                if let Err(e) = std::fs::write(&report_path, &result.report) {
                    tracing::warn!(
                        path = %report_path.display(),
                        error = %e,
                        "failed to write report file"
                    );
                }
            }
        },
        |snapshot| {
            if progress {
                eprintln!(
                    "progress: {}/{} (failed={}, eta={:?})",
                    snapshot.processed,
                    snapshot.total,
                    snapshot.failed,
                    snapshot.estimated_remaining
                );
            }
        },
        cancel.clone(),
    )
    .await;

    if any_cancelled || cancel.is_cancelled() {
        ExitCode::from(2)
    } else if any_failed {
        ExitCode::from(1)
    } else {
        ExitCode::from(0)
    }
}
