// crashlog-sleuth - core/analyzers/settings.rs
//
// Settings Analyzer: the single writer for cross-setting messages.
// Runs serially, before the Plugin/Record analyzers, at the lowest
// priority in the pipeline.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::app::config::ConfigStore;
use crate::core::analyzer::Analyzer;
use crate::core::model::{AnalysisResult, CrashLog, Scalar};
use crate::util::error::AnalyzerError;

const PRIORITY: i32 = 0;

const XCELL_DLLS: &[&str] = &["x-cell-fo4.dll", "x-cell-og.dll", "x-cell-ng2.dll"];
const BAKA_SCRAP_HEAP_DLL: &str = "bakascrapheap.dll";
const LOOKS_MENU_DLL: &str = "f4ee.dll";

fn has_any(xse_modules: &std::collections::HashSet<String>, names: &[&str]) -> bool {
    names.iter().any(|n| xse_modules.contains(*n))
}

pub struct SettingsAnalyzer<'a> {
    config: &'a ConfigStore,
}

impl<'a> SettingsAnalyzer<'a> {
    pub fn new(config: &'a ConfigStore) -> Self {
        SettingsAnalyzer { config }
    }

    fn ignore_list(&self) -> std::collections::HashSet<String> {
        let list: Vec<String> = self.config.get("Settings_Ignore", Vec::new());
        list.into_iter().map(|s| s.to_lowercase()).collect()
    }
}

#[async_trait]
impl<'a> Analyzer for SettingsAnalyzer<'a> {
    fn name(&self) -> &str {
        "Settings"
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn parallel_safe(&self) -> bool {
        false
    }

    async fn analyze(
        &self,
        crash_log: &CrashLog,
        _cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AnalyzerError> {
        let mut report_lines = Vec::new();
        let mut has_findings = false;

        let xcell_detected = has_any(&crash_log.xse_modules, XCELL_DLLS);
        let baka_detected = crash_log.xse_modules.contains(BAKA_SCRAP_HEAP_DLL);
        let achievements_detected = crash_log
            .crashgen_settings
            .get("Achievements")
            .and_then(Scalar::as_bool)
            .unwrap_or(false);
        let survival_mode_detected = crash_log
            .crashgen_settings
            .get("UnlimitedSurvivalMode")
            .and_then(Scalar::as_bool)
            .unwrap_or(false);
        let f4ee_detected = crash_log.xse_modules.contains(LOOKS_MENU_DLL);

        report_lines.push(if achievements_detected {
            "# Achievements mod detected, in-game achievements will not unlock #\n".to_string()
        } else {
            "Achievements parameter looks correctly configured\n".to_string()
        });

        if xcell_detected && baka_detected {
            report_lines.push(
                "# X-Cell and Baka ScrapHeap are both installed; this causes conflicts #\n"
                    .to_string(),
            );
            has_findings = true;
        } else if xcell_detected {
            report_lines.push("X-Cell is managing memory allocation\n".to_string());
        } else if baka_detected {
            report_lines.push("Baka ScrapHeap is managing memory allocation\n".to_string());
        } else {
            report_lines.push("Memory Manager parameter looks correctly configured\n".to_string());
        }

        let archive_limit = crash_log
            .crashgen_settings
            .get("ArchiveLimit")
            .and_then(Scalar::as_bool)
            .unwrap_or(false);
        report_lines.push(if archive_limit {
            "# ArchiveLimit is enabled, this can cause instability #\n".to_string()
        } else {
            "ArchiveLimit parameter looks correctly configured\n".to_string()
        });

        if f4ee_detected {
            report_lines.push("Looks Menu (F4EE) is installed\n".to_string());
        }

        if xcell_detected {
            for setting in [
                "MemoryManager",
                "HavokMemorySystem",
                "BSTextureStreamerLocalHeap",
                "ScaleformAllocator",
            ] {
                let enabled = crash_log
                    .crashgen_settings
                    .get(setting)
                    .and_then(Scalar::as_bool)
                    .unwrap_or(true);
                report_lines.push(if enabled {
                    format!("{setting} (X-Cell) parameter looks correctly configured\n")
                } else {
                    format!("# {setting} (X-Cell) is disabled #\n")
                });
            }
        }

        if survival_mode_detected {
            report_lines.push("Unlimited Survival Mode is enabled\n".to_string());
        }

        let ignore = self.ignore_list();
        let mut disabled: Vec<&String> = crash_log
            .crashgen_settings
            .iter()
            .filter(|(name, value)| value.is_false() && !ignore.contains(&name.to_lowercase()))
            .map(|(name, _)| name)
            .collect();
        disabled.sort();
        for name in disabled {
            report_lines.push(format!(
                "NOTICE: {name} is disabled in your crashgen settings; was this intentional?\n"
            ));
            has_findings = true;
        }

        Ok(AnalysisResult::Generic {
            analyzer_name: self.name().to_string(),
            success: true,
            has_findings,
            report_lines,
            data: Default::default(),
            errors: Vec::new(),
        })
    }
}
