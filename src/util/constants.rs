// crashlog-sleuth - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "CrashLog Sleuth";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "CrashLogSleuth";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Discovery limits (directory expansion of CLI path arguments)
// =============================================================================

/// Maximum directory recursion depth when a CLI path argument is a directory.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Hard upper bound on max depth (prevents infinite traversal).
pub const ABSOLUTE_MAX_DEPTH: usize = 50;

/// Maximum number of files discovered from a single directory argument.
pub const DEFAULT_MAX_FILES: usize = 500;

/// Hard upper bound on max files (prevents configuration mistakes).
pub const ABSOLUTE_MAX_FILES: usize = 10_000;

/// Default include glob patterns for crash-log discovery.
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &["*.log", "*.txt"];

/// Default exclude glob patterns for crash-log discovery.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] =
    &["*.gz", "*.zip", "*.bak", "*.tmp", ".git"];

// =============================================================================
// Parsing limits
// =============================================================================

/// Maximum number of leading non-blank lines scanned for the header
/// (game-version / crashgen-version lines).
pub const MAX_HEADER_SCAN_LINES: usize = 8;

/// Hard upper bound on the number of call-stack lines retained relative to
/// the modules segment length, guarding against pathological logs.
pub const CALL_STACK_MODULES_SLACK: usize = 10_000;

/// Read chunk size in bytes for streaming file reads.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024; // 64 KB

/// File size threshold in bytes above which a log is treated as unusually
/// large for logging/progress-reporting purposes.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 20 * 1024 * 1024; // 20 MB

// =============================================================================
// Result Cache
// =============================================================================

/// Default maximum number of entries retained by the Result Cache's LRU.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1_024;

/// Minimum user-configurable cache size.
pub const MIN_CACHE_MAX_ENTRIES: usize = 16;

/// Hard upper bound on cache size (prevents configuration mistakes from
/// exhausting memory).
pub const ABSOLUTE_MAX_CACHE_ENTRIES: usize = 1_000_000;

// =============================================================================
// Resilient Executor
// =============================================================================

/// Maximum retry attempts for `Transient` analyzer failures.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base backoff delay before the first retry.
pub const RETRY_BASE_DELAY_MS: u64 = 100;

/// Exponential backoff multiplier applied per retry attempt.
pub const RETRY_BACKOFF_FACTOR: u32 = 2;

/// Jitter applied to each backoff delay, as a fraction of the computed delay
/// (±20%), to avoid synchronized retry storms across concurrent analyzers.
pub const RETRY_JITTER_FRACTION: f64 = 0.20;

// =============================================================================
// Scan Pipeline / Batch Driver (C8, C9)
// =============================================================================

/// Capacity of the bounded path queue between the batch producer and its
/// worker consumers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Minimum user-configurable queue capacity.
pub const MIN_QUEUE_CAPACITY: usize = 1;

/// Hard upper bound on queue capacity.
pub const ABSOLUTE_MAX_QUEUE_CAPACITY: usize = 10_000;

/// Minimum user-configurable concurrency.
pub const MIN_MAX_CONCURRENCY: usize = 1;

/// Hard upper bound on concurrency (prevents runaway semaphore sizing on
/// machines with pathological logical-core counts).
pub const ABSOLUTE_MAX_CONCURRENCY: usize = 1_024;

// =============================================================================
// Settings / Suspect / Plugin / Record analyzer limits
// =============================================================================

/// Width that suspect descriptions are padded to (with `.`) before the
/// " SUSPECT FOUND!" suffix, matching the fixed-width report layout.
pub const SUSPECT_DESCRIPTION_PAD_WIDTH: usize = 44;

/// Plugin-count threshold above which the File Integrity analyzer flags an
/// excessive light-master-inclusive plugin count (254 is the historical
/// hard load-order limit for this family of games).
pub const MAX_RECOMMENDED_PLUGIN_COUNT: usize = 254;

/// Minimum length a call-stack line must have before the `[RSP+` offset
/// trim (Record Analyzer, ) is applied.
pub const RECORD_LINE_RSP_TRIM_MIN_LEN: usize = 30;

/// Byte offset at which the `[RSP+` trim starts a call-stack line.
pub const RECORD_LINE_RSP_TRIM_OFFSET: usize = 30;

// =============================================================================
// Configuration Store
// =============================================================================

/// Default configuration file name, relative to the current working
/// directory unless overridden by `--config`.
pub const CONFIG_FILE_NAME: &str = "classic.toml";

/// Maximum size of a configuration TOML file in bytes.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024; // 1 MB

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Report Writer / CLI
// =============================================================================

/// Suffix appended to the input log's stem when writing the generated
/// report file next to it.
pub const REPORT_FILE_SUFFIX: &str = "-AUTOSCAN.md";
