// crashlog-sleuth - core/parser.rs
//
// Reads a crash-log file and classifies its header, main error, and
// segments into a structured `CrashLog`. The async entry point
// checks for cancellation at least once per segment.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tokio_util::sync::CancellationToken;

use super::model::{CrashLog, CrashLogHeader, Plugin, PluginOrigin, Scalar, Segment};
use crate::util::constants::{DEFAULT_LARGE_FILE_THRESHOLD, MAX_HEADER_SCAN_LINES};
use crate::util::error::ParseError;

/// Tunable limits for one parse invocation.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    pub max_header_scan_lines: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            max_header_scan_lines: MAX_HEADER_SCAN_LINES,
        }
    }
}

fn segment_header_bracket_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[(.+)\]$").expect("bracket header regex is valid"))
}

fn segment_header_colon_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z][A-Z0-9 ]+):$").expect("colon header regex is valid"))
}

fn game_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^.+?\s+v(\d+\.\d+\.\d+(?:\.\d+)?)$").expect("game version regex is valid")
    })
}

fn crashgen_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?)\s+(v\S+)$").expect("crashgen header regex is valid"))
}

fn unhandled_exception_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"Unhandled exception "[^"]+" at 0x[0-9A-Fa-f]+"#)
            .expect("unhandled exception regex is valid")
    })
}

fn plugin_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\s*\[(FE:([0-9A-F]{3})|[0-9A-F]{2})\]\s*(.+?(?:\.(?:es[pml]|dll))+)")
            .expect("plugin line regex is valid")
    })
}

/// Split `content` into named segments (C3's `extract_segments`). Pure and
/// side-effect-free; used both by the full parser and directly by callers
/// (e.g. tests) that only need segmentation.
pub fn extract_segments(content: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Option<(String, usize, Vec<String>)> = None;
    let mut offset = 0usize;

    for line in content.split_inclusive('\n') {
        let trimmed_line = line.trim_end_matches(['\n', '\r']);
        let header_name = header_name_of(trimmed_line);

        if let Some(name) = header_name {
            if let Some((prev_name, prev_start, prev_lines)) = current.take() {
                segments.push(build_segment(prev_name, prev_start, offset, prev_lines));
            }
            current = Some((name, offset + line.len(), Vec::new()));
        } else if let Some((_, _, lines)) = current.as_mut() {
            lines.push(trimmed_line.to_string());
        }

        offset += line.len();
    }

    if let Some((name, start, lines)) = current.take() {
        segments.push(build_segment(name, start, offset, lines));
    }

    segments
}

fn header_name_of(line: &str) -> Option<String> {
    if let Some(caps) = segment_header_bracket_re().captures(line) {
        return Some(normalize_segment_name(&caps[1]));
    }
    if let Some(caps) = segment_header_colon_re().captures(line) {
        return Some(normalize_segment_name(&caps[1]));
    }
    None
}

fn normalize_segment_name(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn build_segment(name: String, start: usize, end: usize, mut lines: Vec<String>) -> Segment {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    Segment {
        name,
        start_index: start,
        end_index: end,
        lines,
    }
}

fn extract_header(lines: &[&str], max_scan: usize) -> CrashLogHeader {
    let mut header = CrashLogHeader::default();
    let mut scanned = 0usize;
    let mut idx = 0usize;

    while idx < lines.len() && scanned < max_scan {
        let line = lines[idx].trim();
        idx += 1;
        if line.is_empty() {
            continue;
        }
        scanned += 1;

        if header.game_version.is_none() {
            if let Some(caps) = game_version_re().captures(line) {
                header.game_version = Some(caps[1].to_string());
                continue;
            }
        } else if header.crashgen_name.is_none() {
            if let Some(caps) = crashgen_header_re().captures(line) {
                header.crashgen_name = Some(caps[1].to_string());
                header.crashgen_version = Some(caps[2].to_string());
                break;
            }
        }
    }

    header
}

fn extract_main_error(lines: &[&str]) -> Option<String> {
    for line in lines {
        if unhandled_exception_re().is_match(line) || line.contains("EXCEPTION_") {
            return Some(line.trim().to_string());
        }
    }
    None
}

fn parse_plugins_segment(segment: &Segment) -> Vec<Plugin> {
    let mut plugins = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for line in &segment.lines {
        if line.to_lowercase().contains(".dll+") {
            let name = line.trim().to_string();
            let key = name.to_lowercase();
            if seen.insert(key) {
                plugins.push(Plugin {
                    file_name: name,
                    load_order_token: "DLL".to_string(),
                    origin: PluginOrigin::CrashLog,
                });
            }
            continue;
        }

        if let Some(caps) = plugin_line_re().captures(line) {
            let token = caps
                .get(1)
                .map(|m| m.as_str().to_uppercase())
                .unwrap_or_default();
            let name = caps
                .get(3)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            let key = name.to_lowercase();
            if seen.insert(key) {
                plugins.push(Plugin {
                    file_name: name,
                    load_order_token: token,
                    origin: PluginOrigin::CrashLog,
                });
            }
            continue;
        }

        let lowered = line.to_lowercase();
        let looks_like_plugin =
            lowered.ends_with(".esp") || lowered.ends_with(".esm") || lowered.ends_with(".esl");
        if looks_like_plugin {
            let name = line.trim().to_string();
            let key = name.to_lowercase();
            if !name.is_empty() && seen.insert(key) {
                plugins.push(Plugin {
                    file_name: name,
                    load_order_token: "???".to_string(),
                    origin: PluginOrigin::CrashLog,
                });
            }
        }
    }

    plugins
}

fn dll_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)[\w.\-]+\.dll").expect("dll regex is valid"))
}

/// Every distinct `*.dll`-shaped token in `text`, lowercased. Shared by the
/// XSE modules segment parser and the Plugin Analyzer's no-plugin-list
/// fallback scan.
pub fn extract_dll_tokens(text: &str) -> Vec<String> {
    dll_token_re()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

fn parse_xse_modules_segment(segment: &Segment) -> HashSet<String> {
    let mut modules = HashSet::new();
    for line in &segment.lines {
        for m in dll_token_re().find_iter(line) {
            modules.insert(m.as_str().to_lowercase());
        }
    }
    modules
}

fn parse_settings_segment(segment: &Segment) -> HashMap<String, Scalar> {
    let mut settings = HashMap::new();
    for line in &segment.lines {
        let Some((key, value)) = line.split_once(':').or_else(|| line.split_once('=')) else {
            continue;
        };
        let key = key.trim().to_string();
        let value = value.trim();
        if key.is_empty() {
            continue;
        }
        let scalar = if let Ok(b) = value.parse::<bool>() {
            Scalar::Bool(b)
        } else if let Ok(i) = value.parse::<i64>() {
            Scalar::Int(i)
        } else {
            Scalar::Str(value.to_string())
        };
        settings.insert(key, scalar);
    }
    settings
}

/// Parse already-read `content` into a `CrashLog`. Synchronous and pure;
/// the async `parse_path` wraps this with file I/O and cancellation.
pub fn parse_content(
    content: &str,
    path: &Path,
    config: &ParseConfig,
) -> Result<CrashLog, ParseError> {
    let lines: Vec<&str> = content.lines().collect();
    let segments = extract_segments(content);

    let header = extract_header(&lines, config.max_header_scan_lines);
    let main_error = extract_main_error(&lines);

    let modules = segments
        .iter()
        .find(|s| s.name == "MODULES")
        .map(|s| s.lines.clone())
        .unwrap_or_default();

    let plugins_segment = segments.iter().find(|s| s.name == "PLUGINS");
    let plugins = plugins_segment.map(parse_plugins_segment).unwrap_or_default();

    let xse_modules = segments
        .iter()
        .find(|s| s.name.contains("XSE") || s.name.contains("F4SE") || s.name.contains("SKSE"))
        .map(parse_xse_modules_segment)
        .unwrap_or_default();

    let call_stack = segments
        .iter()
        .find(|s| s.name.contains("CALL STACK"))
        .map(|s| s.lines.clone())
        .unwrap_or_default();

    let crashgen_settings = segments
        .iter()
        .find(|s| s.name.contains("SETTINGS"))
        .map(parse_settings_segment)
        .unwrap_or_default();

    let has_modules = segments.iter().any(|s| s.name == "MODULES");
    let has_plugins = segments.iter().any(|s| s.name == "PLUGINS");

    let (is_valid, error_message) = if !has_modules && !has_plugins {
        (
            true,
            Some("incomplete: MODULES and PLUGINS segments not found".to_string()),
        )
    } else {
        (true, None)
    };

    let content_fingerprint = crate::core::cache::fingerprint(content);

    Ok(CrashLog {
        path: path.to_path_buf(),
        header,
        main_error,
        segments,
        call_stack,
        modules,
        xse_modules,
        plugins,
        crashgen_settings,
        game_type: None,
        game_path: None,
        is_valid,
        error_message,
        content_fingerprint,
    })
}

/// Read a log file's contents, memory-mapping files at or above the
/// large-file threshold instead of buffering the whole thing through
/// `tokio::fs::read_to_string`. Non-UTF-8 bytes are lossily replaced either
/// way, matching crash logs produced by a crashed, possibly-truncated write.
async fn read_log_content(path: &Path) -> std::io::Result<String> {
    let meta = tokio::fs::metadata(path).await?;
    if meta.len() < DEFAULT_LARGE_FILE_THRESHOLD {
        return tokio::fs::read_to_string(path).await;
    }

    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_mmap_lossy(&owned))
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?
}

fn read_mmap_lossy(path: &Path) -> std::io::Result<String> {
    let file = std::fs::File::open(path)?;
    // Safe as long as nothing truncates the file out from under the map;
    // a log file being actively overwritten is the one case this can't
    // protect against, same exposure as a buffered read racing a writer.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    Ok(String::from_utf8_lossy(&mmap).into_owned())
}

/// Read `path` and parse it into a `CrashLog`, checking for cancellation
/// before the read and once more after segmentation.
pub async fn parse_path(
    path: &Path,
    config: &ParseConfig,
    cancel: &CancellationToken,
) -> Result<CrashLog, ParseError> {
    if cancel.is_cancelled() {
        return Err(ParseError::Cancelled {
            path: path.to_path_buf(),
        });
    }

    let content = read_log_content(path)
        .await
        .map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    if cancel.is_cancelled() {
        return Err(ParseError::Cancelled {
            path: path.to_path_buf(),
        });
    }

    let owned_path: PathBuf = path.to_path_buf();
    let log = parse_content(&content, &owned_path, config)?;

    for _ in &log.segments {
        if cancel.is_cancelled() {
            return Err(ParseError::Cancelled { path: owned_path });
        }
    }

    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_extraction_scenario() {
        let content = "\
[Compatibility]
line one
line two

SYSTEM SPECS:
CPU: Ryzen

MODULES:
a.dll
b.dll

PLUGINS:
[00] Fallout4.esm
";
        let segments = extract_segments(content);
        let names: Vec<&str> = segments.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["COMPATIBILITY", "SYSTEM SPECS", "MODULES", "PLUGINS"]
        );
    }

    #[test]
    fn segments_partition_offsets_monotonically() {
        let content = "[A]\nx\ny\n[B]\nz\n";
        let segments = extract_segments(content);
        for window in segments.windows(2) {
            assert!(window[0].start_index <= window[0].end_index);
            assert!(window[0].end_index <= window[1].start_index);
        }
    }

    #[test]
    fn incomplete_log_missing_modules_and_plugins() {
        let content = "Fallout4 v1.10.163\nBuffout 4 v1.26.2\n[Compatibility]\nfoo\n";
        let log =
            parse_content(content, Path::new("crash.log"), &ParseConfig::default()).unwrap();
        assert!(log.is_valid);
        assert!(log
            .error_message
            .as_deref()
            .unwrap_or_default()
            .contains("incomplete"));
    }

    #[test]
    fn empty_log_parses_with_incomplete_marker() {
        let log = parse_content("", Path::new("empty.log"), &ParseConfig::default()).unwrap();
        assert!(log.segments.is_empty());
        assert!(log.header.game_version.is_none());
        assert!(log.is_valid);
        assert!(log
            .error_message
            .as_deref()
            .unwrap_or_default()
            .contains("incomplete"));
    }

    #[test]
    fn header_extraction_finds_game_and_crashgen_versions() {
        let content = "Fallout4 v1.10.163\nBuffout 4 v1.26.2\n[Compatibility]\nfoo\n";
        let log =
            parse_content(content, Path::new("crash.log"), &ParseConfig::default()).unwrap();
        assert_eq!(log.header.game_version.as_deref(), Some("1.10.163"));
        assert_eq!(log.header.crashgen_name.as_deref(), Some("Buffout 4"));
        assert_eq!(log.header.crashgen_version.as_deref(), Some("v1.26.2"));
    }

    #[test]
    fn main_error_extraction_matches_exception_token() {
        let content =
            "Fallout4 v1.10.163\nUnhandled exception \"EXCEPTION_ACCESS_VIOLATION\" at 0x1234ABCD\n";
        let log =
            parse_content(content, Path::new("crash.log"), &ParseConfig::default()).unwrap();
        assert!(log
            .main_error
            .as_deref()
            .unwrap_or_default()
            .contains("EXCEPTION_ACCESS_VIOLATION"));
    }

    #[test]
    fn plugin_matching_scenario() {
        let content = "PLUGINS:\n[FE:003] MyPlugin.esp\n[00] Fallout4.esm\n";
        let log =
            parse_content(content, Path::new("crash.log"), &ParseConfig::default()).unwrap();
        assert_eq!(log.plugins.len(), 2);
        assert_eq!(log.plugins[0].file_name, "MyPlugin.esp");
        assert_eq!(log.plugins[0].load_order_token, "FE:003");
        assert_eq!(log.plugins[1].file_name, "Fallout4.esm");
        assert_eq!(log.plugins[1].load_order_token, "00");
    }

    #[test]
    fn plugin_first_occurrence_wins_on_duplicates() {
        let content = "PLUGINS:\n[00] Fallout4.esm\n[01] Fallout4.esm\n";
        let log =
            parse_content(content, Path::new("crash.log"), &ParseConfig::default()).unwrap();
        assert_eq!(log.plugins.len(), 1);
        assert_eq!(log.plugins[0].load_order_token, "00");
    }

    #[test]
    fn absurdly_tall_plugin_indices_parse_without_error() {
        let content = "PLUGINS:\n[FE:FFF] HighIndex.esp\n";
        let log =
            parse_content(content, Path::new("crash.log"), &ParseConfig::default()).unwrap();
        assert_eq!(log.plugins.len(), 1);
        assert_eq!(log.plugins[0].load_order_token, "FE:FFF");
    }

    #[tokio::test]
    async fn parse_path_honors_pre_cancelled_token() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("crash.log");
        std::fs::write(&file_path, "PLUGINS:\n[00] a.esp\n").unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = parse_path(&file_path, &ParseConfig::default(), &cancel).await;
        assert!(matches!(result, Err(ParseError::Cancelled { .. })));
    }

    #[test]
    fn mmap_lossy_read_matches_plain_utf8_content() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("crash.log");
        std::fs::write(&file_path, "PLUGINS:\n[00] a.esp\n").unwrap();

        let content = read_mmap_lossy(&file_path).unwrap();
        assert_eq!(content, "PLUGINS:\n[00] a.esp\n");
    }

    #[tokio::test]
    async fn read_log_content_below_threshold_uses_plain_read() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("crash.log");
        std::fs::write(&file_path, "PLUGINS:\n[00] a.esp\n").unwrap();

        let content = read_log_content(&file_path).await.unwrap();
        assert_eq!(content, "PLUGINS:\n[00] a.esp\n");
    }
}
