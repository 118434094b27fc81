// crashlog-sleuth - core/analyzers/fcx.rs
//
// File Integrity Analyzer. Gated on `FcxMode`; hashes the game
// executable, checks XSE loader presence, and probes core mod files.
// Mod-manager integration is a no-op probe until a real integration
// is wired in.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::app::config::ConfigStore;
use crate::core::analyzer::Analyzer;
use crate::core::model::{AnalysisResult, CrashLog, FileCheckResult, GameStatus, HashValidationResult};
use crate::platform::hash::{hash_file, lookup_version};
use crate::util::constants::MAX_RECOMMENDED_PLUGIN_COUNT;
use crate::util::error::AnalyzerError;

const PRIORITY: i32 = 70;
const DISABLED_LINE: &str = "FCX Mode is disabled, File Integrity checks were skipped\n";

const CORE_MOD_FILES: &[&str] = &["Buffout4.toml", "Buffout4.dll", "f4se_loader.exe"];
const XSE_LOADER_CANDIDATES: &[&str] = &["f4se_loader.exe", "f4se_loader_1_37_0.exe"];

/// Probes an external mod manager for staging folder and enabled-mod
/// count. The default implementation finds nothing; a concrete manager
/// integration implements this trait separately.
pub trait ModManagerProbe: Send + Sync {
    fn staging_folder(&self) -> Option<PathBuf> {
        None
    }
    fn enabled_plugin_count(&self) -> Option<usize> {
        None
    }
}

pub struct NoopModManagerProbe;
impl ModManagerProbe for NoopModManagerProbe {}

pub struct FcxAnalyzer<'a> {
    config: &'a ConfigStore,
    probe: Box<dyn ModManagerProbe>,
}

impl<'a> FcxAnalyzer<'a> {
    pub fn new(config: &'a ConfigStore) -> Self {
        FcxAnalyzer {
            config,
            probe: Box::new(NoopModManagerProbe),
        }
    }

    pub fn with_probe(config: &'a ConfigStore, probe: Box<dyn ModManagerProbe>) -> Self {
        FcxAnalyzer { config, probe }
    }

    fn classify_platform(&self, game_path: &Path) -> &'static str {
        let text = game_path.to_string_lossy().to_lowercase();
        if text.contains("steamapps") {
            "Steam"
        } else if text.contains("gog") {
            "GOG"
        } else {
            "Unknown"
        }
    }
}

#[async_trait]
impl<'a> Analyzer for FcxAnalyzer<'a> {
    fn name(&self) -> &str {
        "FileIntegrity"
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
            return Ok(AnalysisResult::Fcx {
                analyzer_name: self.name().to_string(),
                success: true,
                has_findings: false,
                report_lines: vec![DISABLED_LINE.to_string()],
                game_status: GameStatus::Good,
                file_checks: Vec::new(),
                hash_validations: Vec::new(),
                version_warnings: Vec::new(),
                recommended_fixes: Vec::new(),
                errors: Vec::new(),
            });
        }

        let mut report_lines = Vec::new();
        let mut version_warnings = Vec::new();
        let mut recommended_fixes = Vec::new();
        let mut hash_validations = Vec::new();
        let mut any_non_exe_failure = false;

        let game_path = match &crash_log.game_path {
            Some(p) => p.clone(),
            None => {
                report_lines.push("CRITICAL: Could not locate the game installation\n".to_string());
                return Ok(AnalysisResult::Fcx {
                    analyzer_name: self.name().to_string(),
                    success: true,
                    has_findings: true,
                    report_lines,
                    game_status: GameStatus::Critical,
                    file_checks: Vec::new(),
                    hash_validations: Vec::new(),
                    version_warnings: Vec::new(),
                    recommended_fixes: Vec::new(),
                    errors: Vec::new(),
                });
            }
        };

        let platform = self.classify_platform(&game_path);
        report_lines.push(format!("Detected platform: {platform}\n"));

        let game_type = crash_log.game_type.clone().unwrap_or_else(|| "Fallout4".to_string());
        let exe_path = game_path.join(format!("{game_type}.exe"));
        let exe_status = match hash_file(&exe_path) {
            Ok(computed_hash) => {
                let version_label = lookup_version(&computed_hash).map(str::to_string);
                if version_label.is_none() {
                    version_warnings.push(format!(
                        "Executable hash does not match any known {game_type} version"
                    ));
                }
                hash_validations.push(HashValidationResult {
                    file_name: format!("{game_type}.exe"),
                    computed_hash,
                    is_known: version_label.is_some(),
                    version_label,
                });
                true
            }
            Err(_) => {
                report_lines.push(format!("CRITICAL: {game_type}.exe could not be hashed or is missing\n"));
                false
            }
        };

        let loader_found = XSE_LOADER_CANDIDATES
            .iter()
            .any(|name| game_path.join(name).exists());
        if !loader_found {
            any_non_exe_failure = true;
            recommended_fixes.push("Install the script extender loader for this game version".to_string());
        }

        let mut file_checks = Vec::new();
        for file_name in CORE_MOD_FILES {
            let path = game_path.join(file_name);
            let metadata = std::fs::metadata(&path).ok();
            let exists = metadata.is_some();
            if !exists {
                any_non_exe_failure = true;
            }
            file_checks.push(FileCheckResult {
                file_name: file_name.to_string(),
                exists,
                size_bytes: metadata.as_ref().map(|m| m.len()),
                last_modified: metadata
                    .as_ref()
                    .and_then(|m| m.modified().ok())
                    .map(chrono::DateTime::<chrono::Utc>::from),
            });
        }

        if let Some(count) = self.probe.enabled_plugin_count() {
            if count > MAX_RECOMMENDED_PLUGIN_COUNT {
                any_non_exe_failure = true;
                report_lines.push(format!(
                    "WARNING: {count} enabled plugins exceeds the recommended limit of {MAX_RECOMMENDED_PLUGIN_COUNT}\n"
                ));
            }
        }

        for warning in &version_warnings {
            report_lines.push(format!("WARNING: {warning}\n"));
        }

        let game_status = if !exe_status {
            GameStatus::Critical
        } else if any_non_exe_failure || !version_warnings.is_empty() {
            GameStatus::Warning
        } else {
            GameStatus::Good
        };

        let has_findings = game_status != GameStatus::Good;

        Ok(AnalysisResult::Fcx {
            analyzer_name: self.name().to_string(),
            success: true,
            has_findings,
            report_lines,
            game_status,
            file_checks,
            hash_validations,
            version_warnings,
            recommended_fixes,
            errors: Vec::new(),
        })
    }
}
