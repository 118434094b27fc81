// crashlog-sleuth - core/analyzers/record.rs
//
// Record Analyzer: matches call-stack lines against configured
// target/ignore substring sets and reports grouped hit counts.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::app::config::ConfigStore;
use crate::core::analyzer::Analyzer;
use crate::core::model::{AnalysisResult, CrashLog};
use crate::util::constants::{RECORD_LINE_RSP_TRIM_MIN_LEN, RECORD_LINE_RSP_TRIM_OFFSET};
use crate::util::error::AnalyzerError;

const PRIORITY: i32 = 50;
const RSP_MARKER: &str = "[RSP+";

fn extract_record_text(line: &str) -> String {
    if line.contains(RSP_MARKER) && line.len() > RECORD_LINE_RSP_TRIM_MIN_LEN {
        match line.get(RECORD_LINE_RSP_TRIM_OFFSET..) {
            Some(trimmed) => trimmed.trim().to_string(),
            None => line.trim().to_string(),
        }
    } else {
        line.trim().to_string()
    }
}

pub struct RecordAnalyzer<'a> {
    config: &'a ConfigStore,
}

impl<'a> RecordAnalyzer<'a> {
    pub fn new(config: &'a ConfigStore) -> Self {
        RecordAnalyzer { config }
    }

    fn records(&self) -> Vec<String> {
        self.config.get("Crashlog_Records_Check", Vec::new())
    }

    fn ignore(&self) -> Vec<String> {
        self.config.get("Crashlog_Records_Ignore", Vec::new())
    }
}

#[async_trait]
impl<'a> Analyzer for RecordAnalyzer<'a> {
    fn name(&self) -> &str {
        "Record"
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
        let records: Vec<String> = self.records().into_iter().map(|s| s.to_lowercase()).collect();
        let ignore: Vec<String> = self.ignore().into_iter().map(|s| s.to_lowercase()).collect();

        let mut counts: HashMap<String, usize> = HashMap::new();

        for line in &crash_log.call_stack {
            let lowered = line.to_lowercase();
            let targeted = records.iter().any(|r| lowered.contains(r.as_str()));
            let excluded = ignore.iter().any(|i| lowered.contains(i.as_str()));
            if targeted && !excluded {
                let text = extract_record_text(line);
                if !text.is_empty() {
                    *counts.entry(text).or_insert(0) += 1;
                }
            }
        }

        let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let has_findings = !sorted.is_empty();
        let mut report_lines = Vec::new();
        for (text, count) in &sorted {
            report_lines.push(format!("- {text} | {count}\n"));
        }
        if has_findings {
            report_lines.push(
                "These records were found near the top of the probable call stack and may be involved in the crash\n"
                    .to_string(),
            );
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
    use std::path::PathBuf;

    fn log_with(call_stack: Vec<&str>) -> CrashLog {
        CrashLog {
            path: PathBuf::from("crash.log"),
            header: Default::default(),
            main_error: None,
            segments: Vec::new(),
            call_stack: call_stack.into_iter().map(str::to_string).collect(),
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

    fn config_with(src: &str) -> ConfigStore {
        ConfigStore::from_value(toml::from_str(src).unwrap())
    }

    #[tokio::test]
    async fn trims_rsp_prefixed_lines_past_offset() {
        let config = config_with(r#"Crashlog_Records_Check = ["actor"]"#);
        let analyzer = RecordAnalyzer::new(&config);
        let long_prefix = "0x7FF6 rax=0000 [RSP+0040] ActorRecord hit something";
        let log = log_with(vec![long_prefix]);
        let cancel = CancellationToken::new();

        let result = analyzer.analyze(&log, &cancel).await.unwrap();
        assert!(result.has_findings());
        let joined = result.report_lines().join("");
        assert!(!joined.contains("0x7FF6"));
    }

    #[tokio::test]
    async fn ignore_substring_excludes_match() {
        let config = config_with(
            r#"
            Crashlog_Records_Check = ["actor"]
            Crashlog_Records_Ignore = ["benign"]
            "#,
        );
        let analyzer = RecordAnalyzer::new(&config);
        let log = log_with(vec!["benign actor reference here"]);
        let cancel = CancellationToken::new();

        let result = analyzer.analyze(&log, &cancel).await.unwrap();
        assert!(!result.has_findings());
    }

    #[tokio::test]
    async fn groups_and_sorts_matches_by_text() {
        let config = config_with(r#"Crashlog_Records_Check = ["npc"]"#);
        let analyzer = RecordAnalyzer::new(&config);
        let log = log_with(vec!["npc_bravo record", "npc_alpha record", "npc_alpha record"]);
        let cancel = CancellationToken::new();

        let result = analyzer.analyze(&log, &cancel).await.unwrap();
        let joined = result.report_lines().join("");
        let alpha_pos = joined.find("npc_alpha record | 2").unwrap();
        let bravo_pos = joined.find("npc_bravo record | 1").unwrap();
        assert!(alpha_pos < bravo_pos);
    }
}
