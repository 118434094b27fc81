// crashlog-sleuth - core/model.rs
//
// Supporting data model shared across the parser, analyzers, and report
// writer. `CrashLog` is immutable after construction; `AnalysisResult`
// is produced by exactly one analyzer and consumed only by the collator.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// A named section of a crash log, e.g. `[Compatibility]` or `MODULES:`.
///
/// `start_index`/`end_index` are zero-based character offsets into the
/// original content and satisfy `start_index <= end_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub start_index: usize,
    pub end_index: usize,
    pub lines: Vec<String>,
}

/// The optional header block: `<GameName> v<version>` followed by
/// `<CrashGenName> v<version>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrashLogHeader {
    pub game_version: Option<String>,
    pub crashgen_name: Option<String>,
    pub crashgen_version: Option<String>,
}

/// Origin of a `Plugin` entry: parsed from the crash log itself, or
/// substituted from an external `load_order.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginOrigin {
    CrashLog,
    LoadOrderFile,
}

/// A single plugin reference with its load-order token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    pub file_name: String,
    pub load_order_token: String,
    pub origin: PluginOrigin,
}

/// A crashgen setting value. Replaces a dynamic/heterogeneous dictionary
/// with an explicit sum type the Settings analyzer pattern-matches on
///.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Scalar {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Scalar::Bool(false))
    }
}

/// Structured representation of one crash-log file, produced by the Log
/// Parser and never mutated afterward. Shared immutably across every
/// analyzer in a single pipeline run; no locking required.
#[derive(Debug, Clone)]
pub struct CrashLog {
    pub path: PathBuf,
    pub header: CrashLogHeader,
    pub main_error: Option<String>,
    pub segments: Vec<Segment>,
    pub call_stack: Vec<String>,
    pub modules: Vec<String>,
    pub xse_modules: std::collections::HashSet<String>,
    pub plugins: Vec<Plugin>,
    pub crashgen_settings: HashMap<String, Scalar>,
    pub game_type: Option<String>,
    pub game_path: Option<PathBuf>,
    pub is_valid: bool,
    pub error_message: Option<String>,
    /// SHA-256 fingerprint of the whole raw log file, computed once at parse
    /// time. The Result Cache keys on this, not on any individual segment,
    /// so two logs that happen to share a call stack but differ elsewhere
    /// (plugins, settings, version, GPU info) never collide.
    pub content_fingerprint: String,
}

impl CrashLog {
    /// The `PROBABLE CALL STACK` segment body joined with newlines, the
    /// shape most analyzers want to substring-match against.
    pub fn call_stack_joined(&self) -> String {
        self.call_stack.join("\n")
    }

    /// Find a segment by its normalized (uppercased, trimmed) name.
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        let target = name.trim().to_uppercase();
        self.segments.iter().find(|s| s.name == target)
    }

    /// Drop the large owned buffers once analysis has completed, per the
    /// `original_lines` retention design note: the parser keeps them
    /// alive only for the duration of one pipeline run.
    pub fn release_large_fields(&mut self) {
        self.call_stack = Vec::new();
        self.modules = Vec::new();
        for segment in &mut self.segments {
            segment.lines = Vec::new();
        }
    }
}

/// Outcome of running one analyzer against one `CrashLog`.
#[derive(Debug, Clone)]
pub enum AnalysisResult {
    Generic {
        analyzer_name: String,
        success: bool,
        has_findings: bool,
        report_lines: Vec<String>,
        data: HashMap<String, serde_json::Value>,
        errors: Vec<String>,
    },
    Plugin {
        analyzer_name: String,
        success: bool,
        has_findings: bool,
        report_lines: Vec<String>,
        plugins: Vec<Plugin>,
        errors: Vec<String>,
    },
    Suspect {
        analyzer_name: String,
        success: bool,
        has_findings: bool,
        report_lines: Vec<String>,
        error_matches: Vec<String>,
        stack_matches: Vec<String>,
        match_descriptions: Vec<String>,
        errors: Vec<String>,
    },
    Documents {
        analyzer_name: String,
        success: bool,
        has_findings: bool,
        report_lines: Vec<String>,
        one_drive_detected: bool,
        ini_results: Vec<IniValidationResult>,
        documents_path: Option<PathBuf>,
        errors: Vec<String>,
    },
    Fcx {
        analyzer_name: String,
        success: bool,
        has_findings: bool,
        report_lines: Vec<String>,
        game_status: GameStatus,
        file_checks: Vec<FileCheckResult>,
        hash_validations: Vec<HashValidationResult>,
        version_warnings: Vec<String>,
        recommended_fixes: Vec<String>,
        errors: Vec<String>,
    },
}

impl AnalysisResult {
    pub fn analyzer_name(&self) -> &str {
        match self {
            AnalysisResult::Generic { analyzer_name, .. }
            | AnalysisResult::Plugin { analyzer_name, .. }
            | AnalysisResult::Suspect { analyzer_name, .. }
            | AnalysisResult::Documents { analyzer_name, .. }
            | AnalysisResult::Fcx { analyzer_name, .. } => analyzer_name,
        }
    }

    pub fn success(&self) -> bool {
        match self {
            AnalysisResult::Generic { success, .. }
            | AnalysisResult::Plugin { success, .. }
            | AnalysisResult::Suspect { success, .. }
            | AnalysisResult::Documents { success, .. }
            | AnalysisResult::Fcx { success, .. } => *success,
        }
    }

    pub fn has_findings(&self) -> bool {
        match self {
            AnalysisResult::Generic { has_findings, .. }
            | AnalysisResult::Plugin { has_findings, .. }
            | AnalysisResult::Suspect { has_findings, .. }
            | AnalysisResult::Documents { has_findings, .. }
            | AnalysisResult::Fcx { has_findings, .. } => *has_findings,
        }
    }

    pub fn report_lines(&self) -> &[String] {
        match self {
            AnalysisResult::Generic { report_lines, .. }
            | AnalysisResult::Plugin { report_lines, .. }
            | AnalysisResult::Suspect { report_lines, .. }
            | AnalysisResult::Documents { report_lines, .. }
            | AnalysisResult::Fcx { report_lines, .. } => report_lines,
        }
    }

    pub fn errors(&self) -> &[String] {
        match self {
            AnalysisResult::Generic { errors, .. }
            | AnalysisResult::Plugin { errors, .. }
            | AnalysisResult::Suspect { errors, .. }
            | AnalysisResult::Documents { errors, .. }
            | AnalysisResult::Fcx { errors, .. } => errors,
        }
    }

    /// Build a failed `Generic` result, the canonical conversion target for
    /// any analyzer error.
    pub fn failed(analyzer_name: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisResult::Generic {
            analyzer_name: analyzer_name.into(),
            success: false,
            has_findings: false,
            report_lines: Vec::new(),
            data: HashMap::new(),
            errors: vec![message.into()],
        }
    }
}

/// Per-INI-file validation outcome (Documents Validation Analyzer, ).
#[derive(Debug, Clone, Default)]
pub struct IniValidationResult {
    pub file_name: String,
    pub exists: bool,
    pub is_valid: bool,
    pub is_read_only: bool,
    pub has_archive_invalidation: bool,
    pub issues: Vec<String>,
}

/// Overall game-installation health as determined by the File Integrity
/// analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Good,
    Warning,
    Critical,
    Invalid,
}

/// One core-mod-file presence/metadata check.
#[derive(Debug, Clone)]
pub struct FileCheckResult {
    pub file_name: String,
    pub exists: bool,
    pub size_bytes: Option<u64>,
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// Outcome of hashing the game executable and comparing against a known
/// table. Some table entries are documented placeholders; `is_known` is false for those until real hashes are sourced.
#[derive(Debug, Clone)]
pub struct HashValidationResult {
    pub file_name: String,
    pub computed_hash: String,
    pub is_known: bool,
    pub version_label: Option<String>,
}

/// Status of one completed (or failed) scan of a single log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Completed,
    CompletedWithErrors,
    Failed,
    Cancelled,
}

/// The aggregate outcome of running the Scan Pipeline against one log.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub log_path: PathBuf,
    pub status: ScanStatus,
    pub crash_log: Option<CrashLog>,
    pub analysis_results: Vec<AnalysisResult>,
    pub processing_time: Duration,
    pub has_errors: bool,
    pub report: String,
    pub error_message: Option<String>,
}

impl ScanResult {
    pub fn failed(log_path: PathBuf, message: impl Into<String>, elapsed: Duration) -> Self {
        let message = message.into();
        ScanResult {
            log_path,
            status: ScanStatus::Failed,
            crash_log: None,
            analysis_results: Vec::new(),
            processing_time: elapsed,
            has_errors: true,
            report: String::new(),
            error_message: Some(message),
        }
    }

    pub fn cancelled(log_path: PathBuf, elapsed: Duration) -> Self {
        ScanResult {
            log_path,
            status: ScanStatus::Cancelled,
            crash_log: None,
            analysis_results: Vec::new(),
            processing_time: elapsed,
            has_errors: false,
            report: String::new(),
            error_message: None,
        }
    }
}

/// One file found while expanding a CLI directory argument. Metadata only; contents are read later by the parser.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<chrono::DateTime<chrono::Utc>>,
    pub is_large: bool,
}

/// Caller-facing options threaded through the Scan Pipeline and Batch
/// Driver.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_concurrency: usize,
    pub queue_capacity: usize,
    pub use_cache: bool,
    pub fcx_mode: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            max_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            queue_capacity: crate::util::constants::DEFAULT_QUEUE_CAPACITY,
            use_cache: true,
            fcx_mode: false,
        }
    }
}

/// Snapshot of batch progress, delivered to the caller-supplied sink once
/// per completed path.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub incomplete: usize,
    pub current: Option<PathBuf>,
    pub elapsed: Duration,
    pub estimated_remaining: Option<Duration>,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        BatchProgress {
            total,
            processed: 0,
            successful: 0,
            failed: 0,
            incomplete: 0,
            current: None,
            elapsed: Duration::ZERO,
            estimated_remaining: None,
        }
    }

    /// Recompute the ETA given elapsed time and remaining file count.
    /// `filesPerSecond = processed/elapsed`; `etaSeconds = remaining/filesPerSecond`.
    pub fn recompute_eta(&mut self) {
        if self.processed == 0 || self.elapsed.as_secs_f64() <= 0.0 {
            self.estimated_remaining = None;
            return;
        }
        let files_per_second = self.processed as f64 / self.elapsed.as_secs_f64();
        if files_per_second <= 0.0 {
            self.estimated_remaining = None;
            return;
        }
        let remaining = self.total.saturating_sub(self.processed) as f64;
        let eta_seconds = remaining / files_per_second;
        self.estimated_remaining = Some(Duration::from_secs_f64(eta_seconds.max(0.0)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_is_false_only_matches_bool_false() {
        assert!(Scalar::Bool(false).is_false());
        assert!(!Scalar::Bool(true).is_false());
        assert!(!Scalar::Int(0).is_false());
        assert!(!Scalar::Str("false".into()).is_false());
    }

    #[test]
    fn batch_progress_eta_is_none_before_any_progress() {
        let progress = BatchProgress::new(10);
        assert!(progress.estimated_remaining.is_none());
    }

    #[test]
    fn batch_progress_recomputes_eta_from_rate() {
        let mut progress = BatchProgress::new(10);
        progress.processed = 5;
        progress.elapsed = Duration::from_secs(5);
        progress.recompute_eta();
        // rate = 1/s, remaining = 5 => eta = 5s
        assert_eq!(progress.estimated_remaining, Some(Duration::from_secs(5)));
    }

    #[test]
    fn crash_log_release_large_fields_clears_buffers() {
        let mut log = CrashLog {
            path: PathBuf::from("test.log"),
            header: CrashLogHeader::default(),
            main_error: None,
            segments: vec![Segment {
                name: "MODULES".into(),
                start_index: 0,
                end_index: 10,
                lines: vec!["a.dll".into()],
            }],
            call_stack: vec!["frame 1".into()],
            modules: vec!["a.dll".into()],
            xse_modules: Default::default(),
            plugins: Vec::new(),
            crashgen_settings: HashMap::new(),
            game_type: None,
            game_path: None,
            is_valid: true,
            error_message: None,
            content_fingerprint: "deadbeef".to_string(),
        };
        log.release_large_fields();
        assert_eq!(log.content_fingerprint, "deadbeef");
        assert!(log.call_stack.is_empty());
        assert!(log.modules.is_empty());
        assert!(log.segments[0].lines.is_empty());
    }
}
