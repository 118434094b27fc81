// crashlog-sleuth - app/batch.rs
//
// Batch Driver: bounded producer -> worker pool -> merger for many
// logs. Deduplicates paths case-insensitively, streams results to the
// caller as they complete (not in path order), and reports progress with
// an ETA.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::app::config::ConfigStore;
use crate::core::cache::ResultCache;
use crate::core::executor::ResilientExecutor;
use crate::core::model::{BatchProgress, ScanOptions, ScanResult, ScanStatus};
use crate::core::pipeline::process_one;

/// Deduplicate `paths` case-insensitively, keeping the first occurrence's
/// original casing.
fn dedup_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for path in paths {
        let key = path.to_string_lossy().to_lowercase();
        if seen.insert(key) {
            result.push(path);
        }
    }
    result
}

/// Run the Scan Pipeline over every path in `paths`, streaming each
/// `ScanResult` to `on_result` as it completes and `on_progress` once per
/// completed path. Cancellation is honored at the queue, semaphore, and
/// pipeline suspension points.
///
/// Producer, workers, and merger are driven as a single locally-joined
/// future tree rather than spawned tasks, so this function can borrow
/// `config` for its whole lifetime without requiring `'static` bounds.
pub async fn process_batch<F, P>(
    paths: Vec<PathBuf>,
    options: &ScanOptions,
    config: &ConfigStore,
    mut on_result: F,
    mut on_progress: P,
    cancel: CancellationToken,
) where
    F: FnMut(ScanResult),
    P: FnMut(&BatchProgress),
{
    let paths = dedup_paths(paths);
    let total = paths.len();
    let start = Instant::now();
    let mut progress = BatchProgress::new(total);

    let queue_capacity = options.queue_capacity.max(1);
    let (path_tx, path_rx) = mpsc::channel::<PathBuf>(queue_capacity);
    let path_rx = Mutex::new(path_rx);

    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<ScanResult>();

    let semaphore = Semaphore::new(options.max_concurrency.max(1));
    let cache = if options.use_cache {
        ResultCache::default()
    } else {
        ResultCache::new(1)
    };
    let executor = ResilientExecutor::default();

    let producer_cancel = cancel.clone();
    let producer = async move {
        for path in paths {
            tokio::select! {
                send_result = path_tx.send(path) => {
                    if send_result.is_err() {
                        break;
                    }
                }
                _ = producer_cancel.cancelled() => break,
            }
        }
        // `path_tx` is owned by this future and drops when it returns,
        // which is what lets workers' `recv()` see the queue close.
    };

    let worker_count = options.max_concurrency.max(1);
    let worker = |worker_result_tx: mpsc::UnboundedSender<ScanResult>| async move {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let path = path_rx.lock().await.recv().await;
            let Some(path) = path else { break };

            let permit = tokio::select! {
                permit = semaphore.acquire() => permit,
                _ = cancel.cancelled() => break,
            };
            let Ok(_permit) = permit else { break };

            let result = process_one(&path, config, &cache, &executor, &cancel).await;
            drop(_permit);
            if worker_result_tx.send(result).is_err() {
                break;
            }
        }
    };

    let worker_senders: Vec<_> = (0..worker_count).map(|_| result_tx.clone()).collect();
    drop(result_tx);
    let workers = worker_senders.into_iter().map(worker);

    let merger = async {
        while let Some(result) = result_rx.recv().await {
            progress.processed += 1;
            match result.status {
                ScanStatus::Completed => progress.successful += 1,
                ScanStatus::CompletedWithErrors => {
                    progress.successful += 1;
                    progress.incomplete += 1;
                }
                ScanStatus::Failed => progress.failed += 1,
                ScanStatus::Cancelled => {}
            }
            progress.current = Some(result.log_path.clone());
            progress.elapsed = start.elapsed();
            progress.recompute_eta();
            on_progress(&progress);
            on_result(result);
        }
    };

    futures::join!(producer, futures::future::join_all(workers), merger);
}
