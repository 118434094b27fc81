// crashlog-sleuth - core/pipeline.rs
//
// Scan Pipeline: parses one log, runs its analyzers in priority
// order (serial-only inline, parallel-safe concurrently via a join set),
// and collates the result.

use std::path::Path;
use std::time::Instant;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::app::config::ConfigStore;
use crate::core::analyzer::{partition_serial_parallel, sort_by_priority, Analyzer};
use crate::core::analyzers::default_analyzers;
use crate::core::cache::ResultCache;
use crate::core::executor::ResilientExecutor;
use crate::core::model::{AnalysisResult, CrashLog, ScanResult, ScanStatus};
use crate::core::parser::{self, ParseConfig};
use crate::core::report;

/// Parse `path`, run the full analyzer set, and collate a `ScanResult`.
/// Mirrors `process_one`: parse, sort analyzers, partition
/// serial/parallel, dispatch, await, collate in sorted order, drop large
/// fields, emit the report.
pub async fn process_one(
    path: &Path,
    config: &ConfigStore,
    cache: &ResultCache,
    executor: &ResilientExecutor,
    cancel: &CancellationToken,
) -> ScanResult {
    let start = Instant::now();

    if cancel.is_cancelled() {
        return ScanResult::cancelled(path.to_path_buf(), start.elapsed());
    }

    let mut crash_log = match parser::parse_path(path, &ParseConfig::default(), cancel).await {
        Ok(log) => log,
        Err(e) => {
            return ScanResult::failed(path.to_path_buf(), e.to_string(), start.elapsed());
        }
    };

    let analyzers = default_analyzers(config);
    let results = run_analyzers(analyzers, &crash_log, cache, executor, cancel).await;

    if cancel.is_cancelled() {
        return ScanResult::cancelled(path.to_path_buf(), start.elapsed());
    }

    let has_errors = results.iter().any(|r| !r.success());
    let status = if has_errors {
        ScanStatus::CompletedWithErrors
    } else {
        ScanStatus::Completed
    };

    let report_text = report::write_report(&results);

    crash_log.release_large_fields();

    ScanResult {
        log_path: path.to_path_buf(),
        status,
        crash_log: Some(crash_log),
        analysis_results: results,
        processing_time: start.elapsed(),
        has_errors,
        report: report_text,
        error_message: None,
    }
}

async fn run_analyzers<'a>(
    mut analyzers: Vec<Box<dyn Analyzer + 'a>>,
    crash_log: &CrashLog,
    cache: &ResultCache,
    executor: &ResilientExecutor,
    cancel: &CancellationToken,
) -> Vec<AnalysisResult> {
    sort_by_priority(&mut analyzers);
    let sorted_names: Vec<String> = analyzers.iter().map(|a| a.name().to_string()).collect();
    let (serial, parallel) = partition_serial_parallel(analyzers);

    let mut by_name = std::collections::HashMap::new();

    for analyzer in serial {
        let name = analyzer.name().to_string();
        let result = run_one(analyzer.as_ref(), crash_log, cache, executor, cancel).await;
        by_name.insert(name, result);
    }

    // Parallel-safe analyzers run concurrently on this task via a joined
    // future set (not OS threads); I/O-free CPU work dominates here.
    let parallel_futures = parallel
        .iter()
        .map(|analyzer| run_one(analyzer.as_ref(), crash_log, cache, executor, cancel));
    let parallel_results = join_all(parallel_futures).await;

    for (analyzer, result) in parallel.iter().zip(parallel_results) {
        by_name.insert(analyzer.name().to_string(), result);
    }

    sorted_names
        .into_iter()
        .filter_map(|name| by_name.remove(&name))
        .collect()
}

async fn run_one(
    analyzer: &(dyn Analyzer + '_),
    crash_log: &CrashLog,
    cache: &ResultCache,
    executor: &ResilientExecutor,
    cancel: &CancellationToken,
) -> AnalysisResult {
    let name = analyzer.name().to_string();
    let key = crate::core::cache::CacheKey {
        log_fingerprint: crash_log.content_fingerprint.clone(),
        analyzer_name: name.clone(),
        analyzer_input_version: 1,
    };

    let computed = cache
        .get_or_compute(key, || async {
            Ok(executor
                .execute(&name, cancel, || analyzer.analyze(crash_log, cancel))
                .await)
        })
        .await;

    match computed {
        Ok(result) => result,
        Err(e) => AnalysisResult::failed(analyzer.name(), e.to_string()),
    }
}
