// crashlog-sleuth - core/analyzers/documents.rs
//
// Documents Validation Analyzer. Gated on `FcxMode`; validates the
// game's Documents-folder INI triplet and flags a OneDrive-hosted
// documents folder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::app::config::ConfigStore;
use crate::core::analyzer::Analyzer;
use crate::core::model::{AnalysisResult, CrashLog, IniValidationResult};
use crate::platform::fs::read_file_lossy;
use crate::platform::paths::game_documents_path;
use crate::util::error::AnalyzerError;

const PRIORITY: i32 = 60;
const DISABLED_LINE: &str = "FCX Mode is disabled, Documents Validation was skipped\n";
const DEFAULT_ONE_DRIVE_WARNING: &str =
    "NOTICE: Your Documents folder is hosted on OneDrive; this is a known source of instability\n";

/// A minimal `[Section]\nkey=value` INI parse, comments `;`/`#`.
fn parse_ini(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current = String::new();

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = name.trim().to_string();
            sections.entry(current.clone()).or_default();
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    sections
}

fn validate_ini_file(path: &Path, file_name: &str, check_archive_invalidation: bool) -> IniValidationResult {
    let mut result = IniValidationResult {
        file_name: file_name.to_string(),
        ..Default::default()
    };

    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(_) => {
            result.exists = false;
            result.issues.push(format!("{file_name} was not found"));
            return result;
        }
    };
    result.exists = true;
    result.is_read_only = metadata.permissions().readonly();
    if result.is_read_only {
        result
            .issues
            .push(format!("{file_name} is marked read-only"));
    }

    let content = match read_file_lossy(path) {
        Ok(c) => c,
        Err(_) => {
            result.issues.push(format!("{file_name} could not be read"));
            return result;
        }
    };

    if content.trim().is_empty() {
        result.issues.push(format!("{file_name} is empty"));
        return result;
    }

    let sections = parse_ini(&content);
    result.is_valid = true;

    if check_archive_invalidation {
        let archive = sections.get("Archive");
        let invalidation_ok = archive
            .and_then(|s| s.get("bInvalidateOlderFiles"))
            .map(|v| v.trim() == "1")
            .unwrap_or(false);
        let resource_dirs_blank = archive
            .and_then(|s| s.get("sResourceDataDirsFinal"))
            .map(|v| v.trim().is_empty())
            .unwrap_or(true);

        result.has_archive_invalidation = invalidation_ok && resource_dirs_blank;
        if !invalidation_ok {
            result.issues.push(
                "[Archive] bInvalidateOlderFiles is not set to 1; archive invalidation is off"
                    .to_string(),
            );
        }
        if !resource_dirs_blank {
            result.issues.push(
                "[Archive] sResourceDataDirsFinal is not blank".to_string(),
            );
        }
    }

    result
}

pub struct DocumentsAnalyzer<'a> {
    config: &'a ConfigStore,
}

impl<'a> DocumentsAnalyzer<'a> {
    pub fn new(config: &'a ConfigStore) -> Self {
        DocumentsAnalyzer { config }
    }
}

#[async_trait]
impl<'a> Analyzer for DocumentsAnalyzer<'a> {
    fn name(&self) -> &str {
        "Documents"
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn parallel_safe(&self) -> bool {
        true
    }

    async fn analyze(
        &self,
        crash_log: &CrashLog,
        _cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AnalyzerError> {
        let fcx_mode: bool = self.config.get("FcxMode", false);
        if !fcx_mode {
            return Ok(AnalysisResult::Documents {
                analyzer_name: self.name().to_string(),
                success: true,
                has_findings: false,
                report_lines: vec![DISABLED_LINE.to_string()],
                one_drive_detected: false,
                ini_results: Vec::new(),
                documents_path: None,
                errors: Vec::new(),
            });
        }

        let game_type = crash_log.game_type.clone().unwrap_or_else(|| "Fallout4".to_string());
        let documents_path: Option<PathBuf> = game_documents_path(&game_type);

        let mut report_lines = Vec::new();
        let mut has_findings = false;

        let one_drive_detected = documents_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_lowercase().contains("onedrive"))
            .unwrap_or(false);

        if one_drive_detected {
            let warning: String = self
                .config
                .get("OneDrive_Warning", DEFAULT_ONE_DRIVE_WARNING.to_string());
            report_lines.push(warning);
            has_findings = true;
        }

        let mut ini_results = Vec::new();
        if let Some(documents_path) = &documents_path {
            for (suffix, check_archive) in [
                (format!("{game_type}.ini"), false),
                (format!("{game_type}Custom.ini"), true),
                (format!("{game_type}Prefs.ini"), false),
            ] {
                let ini_path = documents_path.join(&suffix);
                let result = validate_ini_file(&ini_path, &suffix, check_archive);
                if !result.issues.is_empty() {
                    has_findings = true;
                    for issue in &result.issues {
                        report_lines.push(format!("# {issue} #\n"));
                    }
                }
                ini_results.push(result);
            }
        } else {
            report_lines.push("NOTICE: Could not determine the Documents folder path\n".to_string());
        }

        Ok(AnalysisResult::Documents {
            analyzer_name: self.name().to_string(),
            success: true,
            has_findings,
            report_lines,
            one_drive_detected,
            ini_results,
            documents_path,
            errors: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn empty_log() -> CrashLog {
        CrashLog {
            path: PathBuf::from("crash.log"),
            header: Default::default(),
            main_error: None,
            segments: Vec::new(),
            call_stack: Vec::new(),
            modules: Vec::new(),
            xse_modules: Default::default(),
            plugins: Vec::new(),
            crashgen_settings: Default::default(),
            game_type: Some("Fallout4".to_string()),
            game_path: None,
            is_valid: true,
            error_message: None,
            content_fingerprint: String::new(),
        }
    }

    #[tokio::test]
    async fn skips_entirely_when_fcx_mode_disabled() {
        let config = ConfigStore::from_value(toml::Value::Table(Default::default()));
        let analyzer = DocumentsAnalyzer::new(&config);
        let cancel = CancellationToken::new();

        let result = analyzer.analyze(&empty_log(), &cancel).await.unwrap();
        assert!(!result.has_findings());
        assert!(result.report_lines().join("").contains("FCX Mode is disabled"));
    }

    #[test]
    fn parses_archive_section_for_invalidation_flags() {
        let content = "[Archive]\nbInvalidateOlderFiles=1\nsResourceDataDirsFinal=\n";
        let sections = parse_ini(content);
        assert_eq!(
            sections.get("Archive").and_then(|s| s.get("bInvalidateOlderFiles")),
            Some(&"1".to_string())
        );
    }

    #[test]
    fn validate_ini_file_reports_missing_file() {
        let result = validate_ini_file(Path::new("/nonexistent/Fallout4.ini"), "Fallout4.ini", false);
        assert!(!result.exists);
        assert!(!result.issues.is_empty());
    }

    #[test]
    fn validate_ini_file_flags_missing_archive_invalidation() {
        let tmp = tempfile::tempdir().unwrap();
        let ini_path = tmp.path().join("Fallout4Custom.ini");
        std::fs::write(&ini_path, "[Archive]\nbInvalidateOlderFiles=0\n").unwrap();

        let result = validate_ini_file(&ini_path, "Fallout4Custom.ini", true);
        assert!(result.exists);
        assert!(!result.has_archive_invalidation);
        assert!(!result.issues.is_empty());
    }
}
