// crashlog-sleuth - core/analyzers/version.rs
//
// Version Analyzer: compares the crashgen version embedded in the
// log header against a configured table of "latest" versions per release
// channel, recommending the highest known upgrade when the log is behind.
//
// The source carried two differing version tables ("V2" variants); rather
// than pick one, the channel table is read from configuration so either
// shape can be supplied without a code change.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::app::config::ConfigStore;
use crate::core::analyzer::Analyzer;
use crate::core::model::{AnalysisResult, CrashLog};
use crate::util::error::AnalyzerError;

const VERSION_CHANNELS_KEY: &str = "Version_Channels";

const PRIORITY: i32 = 10;
const UPGRADE_URL: &str = "https://www.nexusmods.com/fallout4/mods/64880?tab=files";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SemVer(u32, u32, u32, u32);

impl SemVer {
    fn parse(text: &str) -> Option<SemVer> {
        let parts: Vec<&str> = text.trim().split('.').collect();
        if !(3..=4).contains(&parts.len()) {
            return None;
        }
        let mut nums = [0u32; 4];
        for (i, part) in parts.iter().enumerate() {
            nums[i] = part.parse().ok()?;
        }
        Some(SemVer(nums[0], nums[1], nums[2], nums[3]))
    }
}

/// Extract `<major.minor.patch[.extra]>` from `"Buffout 4 v1.26.2"`-shaped
/// text; rejects input missing the `v` prefix.
fn parse_current_version(crashgen_version: &str) -> Option<SemVer> {
    let trimmed = crashgen_version.trim();
    let without_prefix = trimmed.strip_prefix('v').or_else(|| {
        trimmed
            .split_whitespace()
            .last()
            .and_then(|tok| tok.strip_prefix('v'))
    })?;
    SemVer::parse(without_prefix)
}

fn default_channels() -> Vec<(&'static str, &'static str)> {
    vec![("original", "1.28.6"), ("next_gen", "1.37.0")]
}

pub struct VersionAnalyzer<'a> {
    config: &'a ConfigStore,
}

impl<'a> VersionAnalyzer<'a> {
    pub fn new(config: &'a ConfigStore) -> Self {
        VersionAnalyzer { config }
    }

    /// Read the release-channel table, falling back to `default_channels`
    /// when the key is absent. Returns the `ConfigurationUnavailable` error
    /// alongside the defaults so the caller can surface a `Warning:` line
    /// without aborting the analysis.
    fn channel_table(&self) -> (Vec<(String, String)>, Option<AnalyzerError>) {
        match self.config.get_raw(VERSION_CHANNELS_KEY) {
            None => {
                let err = AnalyzerError::ConfigurationUnavailable {
                    analyzer_name: self.name().to_string(),
                    key: VERSION_CHANNELS_KEY.to_string(),
                };
                let defaults = default_channels()
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                (defaults, Some(err))
            }
            Some(value) => {
                let configured: std::collections::HashMap<String, String> =
                    value.try_into().unwrap_or_default();
                if configured.is_empty() {
                    (
                        default_channels()
                            .into_iter()
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect(),
                        None,
                    )
                } else {
                    (configured.into_iter().collect(), None)
                }
            }
        }
    }
}

#[async_trait]
impl<'a> Analyzer for VersionAnalyzer<'a> {
    fn name(&self) -> &str {
        "Version"
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
        let mut report_lines = Vec::new();

        if let Some(main_error) = &crash_log.main_error {
            report_lines.push(format!("Main Error: {main_error}\n"));
        }

        let crashgen_name = crash_log
            .header
            .crashgen_name
            .clone()
            .unwrap_or_else(|| "CrashGen".to_string());
        let crashgen_version = match &crash_log.header.crashgen_version {
            Some(v) => v.clone(),
            None => {
                report_lines.push(format!(
                    "Detected {crashgen_name} Version: unknown (no version line found)\n"
                ));
                return Ok(AnalysisResult::Generic {
                    analyzer_name: self.name().to_string(),
                    success: true,
                    has_findings: false,
                    report_lines,
                    data: Default::default(),
                    errors: Vec::new(),
                });
            }
        };

        report_lines.push(format!(
            "Detected {crashgen_name} Version: {crashgen_version}\n"
        ));

        let current = parse_current_version(&crashgen_version);
        let (channels, config_warning) = self.channel_table();
        if let Some(err) = config_warning {
            report_lines.push(format!("Warning: {err}, using built-in defaults\n"));
        }
        let known_versions: Vec<SemVer> = channels
            .iter()
            .filter_map(|(_, v)| SemVer::parse(v))
            .collect();

        let (has_findings, data) = match current {
            None => {
                report_lines.push(format!(
                    "NOTICE: Could not parse {crashgen_name} version '{crashgen_version}'\n"
                ));
                (false, Default::default())
            }
            Some(current) => {
                let is_latest = known_versions.iter().all(|known| current >= *known);
                if is_latest {
                    report_lines.push(format!("{crashgen_name} is up to date!\n"));
                    (false, Default::default())
                } else {
                    let highest = known_versions.iter().max().copied();
                    if let Some(highest) = highest {
                        let label = channels
                            .iter()
                            .find(|(_, v)| SemVer::parse(v) == Some(highest))
                            .map(|(_, v)| v.clone())
                            .unwrap_or_default();
                        report_lines.push(format!(
                            ">>> AN UPDATE IS AVAILABLE FOR {crashgen_name}: {label} <<<\n"
                        ));
                        report_lines.push(format!("{UPGRADE_URL}\n"));
                    }
                    (true, Default::default())
                }
            }
        };

        Ok(AnalysisResult::Generic {
            analyzer_name: self.name().to_string(),
            success: true,
            has_findings,
            report_lines,
            data,
            errors: Vec::new(),
        })
    }
}
