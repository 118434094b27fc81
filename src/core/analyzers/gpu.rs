// crashlog-sleuth - core/analyzers/gpu.rs
//
// GPU Detection Analyzer: classifies the manufacturer of GPU #1/#2
// from the SYSTEM SPECS segment and exposes a rival-manufacturer
// compatibility check used by other analyzers' warning text.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::core::analyzer::Analyzer;
use crate::core::model::{AnalysisResult, CrashLog};
use crate::util::error::AnalyzerError;

const PRIORITY: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Manufacturer {
    Nvidia,
    Amd,
    Intel,
    Unknown,
}

impl Manufacturer {
    fn classify(text: &str) -> Manufacturer {
        let lowered = text.to_lowercase();
        if ["nvidia", "geforce", "quadro", "tesla"]
            .iter()
            .any(|t| lowered.contains(t))
        {
            Manufacturer::Nvidia
        } else if ["amd", "radeon", "ati", "ryzen"]
            .iter()
            .any(|t| lowered.contains(t))
        {
            Manufacturer::Amd
        } else if ["intel", "iris", "uhd", "hd graphics"]
            .iter()
            .any(|t| lowered.contains(t))
        {
            Manufacturer::Intel
        } else {
            Manufacturer::Unknown
        }
    }

    /// The competing manufacturer for compatibility-warning gating, or
    /// `None` for Intel/Unknown (no rival).
    fn rival_token(self) -> Option<&'static str> {
        match self {
            Manufacturer::Nvidia => Some("amd"),
            Manufacturer::Amd => Some("nvidia"),
            Manufacturer::Intel | Manufacturer::Unknown => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Manufacturer::Nvidia => "Nvidia",
            Manufacturer::Amd => "AMD",
            Manufacturer::Intel => "Intel",
            Manufacturer::Unknown => "Unknown",
        }
    }
}

fn gpu1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*GPU\s*#1:\s*(.+)$").expect("gpu#1 regex is valid"))
}

fn gpu2_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*GPU\s*#2:\s*(.+)$").expect("gpu#2 regex is valid"))
}

/// True unless `warning_text` (case-insensitive) mentions `manufacturer`'s
/// rival token.
pub fn is_compatible(manufacturer: Manufacturer, warning_text: &str) -> bool {
    match manufacturer.rival_token() {
        Some(rival) => !warning_text.to_lowercase().contains(rival),
        None => true,
    }
}

pub struct GpuAnalyzer;

#[async_trait]
impl Analyzer for GpuAnalyzer {
    fn name(&self) -> &str {
        "GPU"
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
        let specs = crash_log
            .segment("SYSTEM SPECS")
            .map(|s| s.lines.as_slice())
            .unwrap_or(&[]);

        let gpu1 = specs.iter().find_map(|l| gpu1_re().captures(l));
        let gpu2 = specs.iter().find_map(|l| gpu2_re().captures(l));

        let mut report_lines = Vec::new();
        let mut has_findings = false;

        if let Some(caps) = gpu1 {
            let text = caps[1].trim().to_string();
            let manufacturer = Manufacturer::classify(&text);
            report_lines.push(format!("GPU #1: {text}\n"));
            report_lines.push(format!("Detected Manufacturer: {}\n", manufacturer.label()));
            has_findings = true;

            if let Some(caps2) = gpu2 {
                let text2 = caps2[1].trim().to_string();
                report_lines.push(format!("GPU #2: {text2}\n"));
            }
        } else {
            report_lines.push("NOTICE: No GPU information found in system specs\n".to_string());
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Segment;
    use std::path::PathBuf;

    fn log_with_specs(lines: Vec<&str>) -> CrashLog {
        CrashLog {
            path: PathBuf::from("crash.log"),
            header: Default::default(),
            main_error: None,
            segments: vec![Segment {
                name: "SYSTEM SPECS".to_string(),
                start_index: 0,
                end_index: 0,
                lines: lines.into_iter().map(|l| l.to_string()).collect(),
            }],
            call_stack: Vec::new(),
            modules: Vec::new(),
            xse_modules: Default::default(),
            plugins: Vec::new(),
            crashgen_settings: Default::default(),
            game_type: None,
            game_path: None,
            is_valid: true,
            error_message: None,
            content_fingerprint: String::new(),
        }
    }

    #[test]
    fn classifies_known_manufacturers() {
        assert_eq!(
            Manufacturer::classify("NVIDIA GeForce RTX 3080"),
            Manufacturer::Nvidia
        );
        assert_eq!(Manufacturer::classify("AMD Radeon RX 6800"), Manufacturer::Amd);
        assert_eq!(Manufacturer::classify("Intel UHD Graphics 630"), Manufacturer::Intel);
        assert_eq!(Manufacturer::classify("Matrox G200"), Manufacturer::Unknown);
    }

    #[test]
    fn rival_gating_is_symmetric_and_intel_has_no_rival() {
        assert!(!is_compatible(Manufacturer::Nvidia, "Known AMD crash"));
        assert!(is_compatible(Manufacturer::Nvidia, "Known Intel crash"));
        assert!(!is_compatible(Manufacturer::Amd, "Known NVIDIA crash"));
        assert!(is_compatible(Manufacturer::Intel, "Known AMD crash"));
    }

    #[tokio::test]
    async fn finds_gpu_and_manufacturer() {
        let log = log_with_specs(vec![
            "CPU: AMD Ryzen 9 5900X",
            "GPU #1: Nvidia GeForce RTX 3080",
            "GPU #2: Microsoft Basic Render Driver",
        ]);
        let cancel = CancellationToken::new();
        let result = GpuAnalyzer.analyze(&log, &cancel).await.unwrap();
        assert!(result.has_findings());
        let joined = result.report_lines().join("");
        assert!(joined.contains("Nvidia GeForce RTX 3080"));
        assert!(joined.contains("Detected Manufacturer: Nvidia"));
        assert!(joined.contains("Microsoft Basic Render Driver"));
    }

    #[tokio::test]
    async fn missing_gpu_section_has_no_findings() {
        let log = log_with_specs(vec!["CPU: Unknown"]);
        let cancel = CancellationToken::new();
        let result = GpuAnalyzer.analyze(&log, &cancel).await.unwrap();
        assert!(!result.has_findings());
    }
}
