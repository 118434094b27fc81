// crashlog-sleuth - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation. All errors preserve the causal
// chain for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all crashlog-sleuth operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum CrashLogError {
    /// Log file parsing failed outright; the log cannot be analyzed.
    Parse(ParseError),

    /// One analyzer failed; contained within its `AnalysisResult` and never
    /// propagated past the pipeline.
    Analyzer(AnalyzerError),

    /// Configuration loading or typed-read failed.
    Config(ConfigError),

    /// Result Cache operation failed.
    Cache(CacheError),

    /// Batch driver-level failure (initialization only; per-log failures are
    /// carried in `ScanResult`, not raised here).
    Batch(BatchError),

    /// Cancellation was observed at a suspension point.
    Cancelled,

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for CrashLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "Parse error: {e}"),
            Self::Analyzer(e) => write!(f, "Analyzer error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Cache(e) => write!(f, "Cache error: {e}"),
            Self::Batch(e) => write!(f, "Batch error: {e}"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for CrashLogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Analyzer(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Cache(e) => Some(e),
            Self::Batch(e) => Some(e),
            Self::Cancelled => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Errors related to crash-log parsing.
#[derive(Debug)]
pub enum ParseError {
    /// The log could not be read or classified at all.
    Malformed { path: PathBuf, detail: String },

    /// Parsing completed but the required `MODULES`/`PLUGINS` segments were
    /// never seen before EOF. Not fatal: the resulting `CrashLog` is still
    /// valid, but callers should surface this as `CompletedWithErrors`.
    IncompleteLog { path: PathBuf, detail: String },

    /// File is not valid UTF-8.
    InvalidEncoding {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },

    /// I/O error while reading a log file.
    Io { path: PathBuf, source: io::Error },

    /// Cancellation observed mid-parse.
    Cancelled { path: PathBuf },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { path, detail } => {
                write!(f, "'{}': malformed log: {detail}", path.display())
            }
            Self::IncompleteLog { path, detail } => {
                write!(f, "'{}': incomplete log: {detail}", path.display())
            }
            Self::InvalidEncoding { path, source } => {
                write!(f, "'{}': invalid UTF-8 encoding: {source}", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "'{}': I/O error: {source}", path.display())
            }
            Self::Cancelled { path } => {
                write!(f, "'{}': parse cancelled", path.display())
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidEncoding { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ParseError> for CrashLogError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Analyzer errors
// ---------------------------------------------------------------------------

/// Errors related to a single analyzer invocation. Always contained within
/// the pipeline; converted to a `Generic` `AnalysisResult` with
/// `success=false` rather than propagated.
#[derive(Debug)]
pub enum AnalyzerError {
    /// The analyzer itself reported a failure.
    Failed { analyzer_name: String, message: String },

    /// The analyzer was cancelled mid-execution.
    Cancelled { analyzer_name: String },

    /// A configuration read the analyzer depended on returned no value.
    ConfigurationUnavailable {
        analyzer_name: String,
        key: String,
    },
}

impl fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed {
                analyzer_name,
                message,
            } => write!(f, "analyzer '{analyzer_name}' failed: {message}"),
            Self::Cancelled { analyzer_name } => {
                write!(f, "analyzer '{analyzer_name}' cancelled")
            }
            Self::ConfigurationUnavailable { analyzer_name, key } => write!(
                f,
                "analyzer '{analyzer_name}': configuration key '{key}' unavailable"
            ),
        }
    }
}

impl std::error::Error for AnalyzerError {}

impl From<AnalyzerError> for CrashLogError {
    fn from(e: AnalyzerError) -> Self {
        Self::Analyzer(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value could not be coerced to the requested type.
    TypeMismatch {
        key: String,
        expected: &'static str,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "config parse error '{}': {source}", path.display())
            }
            Self::TypeMismatch { key, expected } => {
                write!(f, "config key '{key}' is not a valid {expected}")
            }
            Self::Io { path, source } => {
                write!(f, "config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for CrashLogError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Cache errors
// ---------------------------------------------------------------------------

/// Errors related to the Result Cache.
#[derive(Debug)]
pub enum CacheError {
    /// The in-flight computation for this key panicked or was dropped
    /// without completing; waiters cannot receive a result.
    ComputationLost { key: String },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ComputationLost { key } => {
                write!(f, "cache computation for key '{key}' was lost")
            }
        }
    }
}

impl std::error::Error for CacheError {}

impl From<CacheError> for CrashLogError {
    fn from(e: CacheError) -> Self {
        Self::Cache(e)
    }
}

// ---------------------------------------------------------------------------
// Batch errors
// ---------------------------------------------------------------------------

/// Errors that abort an entire batch (as opposed to a single log).
#[derive(Debug)]
pub enum BatchError {
    /// The work queue could not be constructed (e.g. zero concurrency).
    InvalidConcurrency { requested: usize },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConcurrency { requested } => {
                write!(f, "invalid max_concurrency: {requested}")
            }
        }
    }
}

impl std::error::Error for BatchError {}

impl From<BatchError> for CrashLogError {
    fn from(e: BatchError) -> Self {
        Self::Batch(e)
    }
}

// ---------------------------------------------------------------------------
// Discovery errors (CLI directory expansion)
// ---------------------------------------------------------------------------

/// Errors related to expanding a directory CLI argument into log files.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The root path does not exist.
    RootNotFound { path: PathBuf },

    /// The root path exists but is not a directory.
    NotADirectory { path: PathBuf },

    /// More matching files were found than `max_files` allows.
    MaxFilesExceeded { max: usize },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "'{}': path does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "'{}': not a directory", path.display())
            }
            Self::MaxFilesExceeded { max } => {
                write!(f, "more than {max} matching files found")
            }
        }
    }
}

impl std::error::Error for DiscoveryError {}

/// Convenience type alias for crashlog-sleuth results.
pub type Result<T> = std::result::Result<T, CrashLogError>;
