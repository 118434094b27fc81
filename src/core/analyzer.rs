// crashlog-sleuth - core/analyzer.rs
//
// Analyzer contract shared by every concrete analyzer. Analyzers are
// registered as a sorted collection rather than a class hierarchy; the
// trait is the only seam.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::model::{AnalysisResult, CrashLog};
use crate::util::error::AnalyzerError;

/// One unit of crash-log analysis.
///
/// Implementations must not mutate `CrashLog`, must tolerate missing
/// segments (emitting `has_findings=false` rather than failing), and must
/// honor `cancel` at least once before returning a result.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Stable name used for cache keys, ordering ties, and report headers.
    fn name(&self) -> &str;

    /// Dispatch order; lower runs earlier. Ties are broken by `name` asc.
    fn priority(&self) -> i32;

    /// Whether the pipeline may run this analyzer concurrently with other
    /// parallel-safe analyzers. Serial-only analyzers (e.g. Settings) run
    /// inline, strictly before any later-priority analyzer.
    fn parallel_safe(&self) -> bool;

    async fn analyze(
        &self,
        crash_log: &CrashLog,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AnalyzerError>;
}

/// Sort a set of analyzers by `(priority asc, name asc)`, the order the
/// Scan Pipeline dispatches and collates results in.
pub fn sort_by_priority<'a>(analyzers: &mut [Box<dyn Analyzer + 'a>]) {
    analyzers.sort_by(|a, b| a.priority().cmp(&b.priority()).then_with(|| a.name().cmp(b.name())));
}

/// Split a priority-sorted analyzer list into (serial, parallel) sublists,
/// preserving their relative order within each sublist.
pub fn partition_serial_parallel<'a>(
    analyzers: Vec<Box<dyn Analyzer + 'a>>,
) -> (Vec<Box<dyn Analyzer + 'a>>, Vec<Box<dyn Analyzer + 'a>>) {
    let mut serial = Vec::new();
    let mut parallel = Vec::new();
    for analyzer in analyzers {
        if analyzer.parallel_safe() {
            parallel.push(analyzer);
        } else {
            serial.push(analyzer);
        }
    }
    (serial, parallel)
}
