// crashlog-sleuth - core/analyzers/suspect.rs
//
// Suspect Analyzer: matches the main error and call stack against
// two configured rule tables (error signals, stack signal lists) to name
// the likely crash cause.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::app::config::ConfigStore;
use crate::core::analyzer::Analyzer;
use crate::core::model::{AnalysisResult, CrashLog};
use crate::util::constants::SUSPECT_DESCRIPTION_PAD_WIDTH;
use crate::util::error::AnalyzerError;

const PRIORITY: i32 = 30;

/// Split a `"<severity> | <description>"` rule key into its parts.
fn parse_key(key: &str) -> (String, String) {
    match key.split_once('|') {
        Some((sev, desc)) => (sev.trim().to_string(), desc.trim().to_string()),
        None => (String::new(), key.trim().to_string()),
    }
}

fn pad_with_dots(description: &str, width: usize) -> String {
    if description.len() >= width {
        return description.to_string();
    }
    let mut padded = description.to_string();
    padded.push_str(&".".repeat(width - description.len()));
    padded
}

fn format_match_line(severity: &str, description: &str) -> String {
    format!(
        "# Checking for {} SUSPECT FOUND! > Severity : {severity} #\n-----\n",
        pad_with_dots(description, SUSPECT_DESCRIPTION_PAD_WIDTH)
    )
}

/// One stack-table signal, parsed from its `"PREFIX|S"` encoding.
enum StackSignal {
    Bare(String),
    RequiredInError(String),
    OptionalInError(String),
    Not(String),
    CountAtLeast(usize, String),
}

fn parse_stack_signal(raw: &str) -> StackSignal {
    if let Some(rest) = raw.strip_prefix("ME-REQ|") {
        StackSignal::RequiredInError(rest.to_string())
    } else if let Some(rest) = raw.strip_prefix("ME-OPT|") {
        StackSignal::OptionalInError(rest.to_string())
    } else if let Some(rest) = raw.strip_prefix("NOT|") {
        StackSignal::Not(rest.to_string())
    } else if let Some((count, signal)) = raw.split_once('|') {
        match count.parse::<usize>() {
            Ok(n) => StackSignal::CountAtLeast(n, signal.to_string()),
            Err(_) => StackSignal::Bare(raw.to_string()),
        }
    } else {
        StackSignal::Bare(raw.to_string())
    }
}

/// Evaluate one stack-table rule's signal list against `main_error`/
/// `call_stack`, per its `has_required`/`error_req_found`/
/// `error_opt_found`/`stack_found` state machine.
fn stack_rule_matches(signals: &[String], main_error: &str, call_stack: &str) -> bool {
    let mut has_required = false;
    let mut error_req_found = false;
    let mut error_opt_found = false;
    let mut stack_found = false;

    for raw in signals {
        match parse_stack_signal(raw) {
            StackSignal::Bare(s) => {
                if call_stack.contains(&s) {
                    stack_found = true;
                }
            }
            StackSignal::RequiredInError(s) => {
                has_required = true;
                if main_error.contains(&s) {
                    error_req_found = true;
                }
            }
            StackSignal::OptionalInError(s) => {
                if main_error.contains(&s) {
                    error_opt_found = true;
                }
            }
            StackSignal::Not(s) => {
                if call_stack.contains(&s) {
                    return false;
                }
            }
            StackSignal::CountAtLeast(n, s) => {
                if call_stack.matches(s.as_str()).count() >= n {
                    stack_found = true;
                }
            }
        }
    }

    (has_required && error_req_found) || (!has_required && (error_opt_found || stack_found))
}

pub struct SuspectAnalyzer<'a> {
    config: &'a ConfigStore,
}

impl<'a> SuspectAnalyzer<'a> {
    pub fn new(config: &'a ConfigStore) -> Self {
        SuspectAnalyzer { config }
    }

    fn error_table(&self) -> Vec<(String, String)> {
        table_entries(self.config.get_raw("Crashlog_Error_Check"))
            .into_iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
            .collect()
    }

    fn stack_table(&self) -> Vec<(String, Vec<String>)> {
        table_entries(self.config.get_raw("Crashlog_Stack_Check"))
            .into_iter()
            .filter_map(|(k, v)| {
                v.as_array().map(|arr| {
                    let signals = arr
                        .iter()
                        .filter_map(|s| s.as_str().map(str::to_string))
                        .collect();
                    (k, signals)
                })
            })
            .collect()
    }
}

fn table_entries(value: Option<toml::Value>) -> Vec<(String, toml::Value)> {
    match value {
        Some(toml::Value::Table(table)) => table.into_iter().collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl<'a> Analyzer for SuspectAnalyzer<'a> {
    fn name(&self) -> &str {
        "Suspect"
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
        let main_error = crash_log.main_error.clone().unwrap_or_default();
        let call_stack = crash_log.call_stack_joined();

        let mut report_lines = Vec::new();
        let mut error_matches = Vec::new();
        let mut stack_matches = Vec::new();
        let mut match_descriptions = Vec::new();

        for (key, signal) in self.error_table() {
            if main_error.contains(&signal) {
                let (severity, description) = parse_key(&key);
                report_lines.push(format_match_line(&severity, &description));
                error_matches.push(key.clone());
                match_descriptions.push(description);
            }
        }

        for (key, signals) in self.stack_table() {
            if stack_rule_matches(&signals, &main_error, &call_stack) {
                let (severity, description) = parse_key(&key);
                report_lines.push(format_match_line(&severity, &description));
                stack_matches.push(key.clone());
                match_descriptions.push(description);
            }
        }

        let lowered_error = main_error.to_lowercase();
        if lowered_error.contains(".dll") && !lowered_error.contains("tbbmalloc") {
            report_lines.push(
                "NOTICE: A DLL file was involved in this crash; check mod compatibility\n"
                    .to_string(),
            );
        }

        let has_findings = !error_matches.is_empty() || !stack_matches.is_empty();

        Ok(AnalysisResult::Suspect {
            analyzer_name: self.name().to_string(),
            success: true,
            has_findings,
            report_lines,
            error_matches,
            stack_matches,
            match_descriptions,
            errors: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn log_with(main_error: &str, call_stack: Vec<&str>) -> CrashLog {
        CrashLog {
            path: PathBuf::from("crash.log"),
            header: Default::default(),
            main_error: Some(main_error.to_string()),
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

    fn config_with(toml_src: &str) -> ConfigStore {
        ConfigStore::from_value(toml::from_str(toml_src).unwrap())
    }

    #[tokio::test]
    async fn matches_error_table_seeded_scenario() {
        let config = config_with(
            r#"
            [Crashlog_Error_Check]
            "5 | Stack Overflow Crash" = "EXCEPTION_STACK_OVERFLOW"
            "#,
        );
        let analyzer = SuspectAnalyzer::new(&config);
        let log = log_with("EXCEPTION_STACK_OVERFLOW at 0xDEADBEEF", vec![]);
        let cancel = CancellationToken::new();

        let result = analyzer.analyze(&log, &cancel).await.unwrap();
        assert!(result.has_findings());
        let joined = result.report_lines().join("");
        assert!(joined.contains(
            "# Checking for Stack Overflow Crash........................ SUSPECT FOUND! > Severity : 5 #"
        ));
    }

    #[tokio::test]
    async fn stack_rule_required_signal_must_appear_in_error() {
        let config = config_with(
            r#"
            [Crashlog_Stack_Check]
            "4 | Buffer Overflow" = ["ME-REQ|buffer_overrun", "some_frame"]
            "#,
        );
        let analyzer = SuspectAnalyzer::new(&config);

        let matching = log_with("buffer_overrun detected", vec!["some_frame here"]);
        let cancel = CancellationToken::new();
        let result = analyzer.analyze(&matching, &cancel).await.unwrap();
        assert!(result.has_findings());

        let non_matching = log_with("unrelated error", vec!["some_frame here"]);
        let result2 = analyzer.analyze(&non_matching, &cancel).await.unwrap();
        assert!(!result2.has_findings());
    }

    #[tokio::test]
    async fn not_signal_aborts_rule_when_present_in_stack() {
        let config = config_with(
            r#"
            [Crashlog_Stack_Check]
            "3 | False Positive" = ["some_frame", "NOT|excluded_frame"]
            "#,
        );
        let analyzer = SuspectAnalyzer::new(&config);
        let log = log_with("", vec!["some_frame", "excluded_frame"]);
        let cancel = CancellationToken::new();
        let result = analyzer.analyze(&log, &cancel).await.unwrap();
        assert!(!result.has_findings());
    }

    #[tokio::test]
    async fn count_signal_requires_minimum_occurrences() {
        let config = config_with(
            r#"
            [Crashlog_Stack_Check]
            "2 | Repeated Frame" = ["3|dup_frame"]
            "#,
        );
        let analyzer = SuspectAnalyzer::new(&config);
        let cancel = CancellationToken::new();

        let under = log_with("", vec!["dup_frame", "dup_frame"]);
        let result = analyzer.analyze(&under, &cancel).await.unwrap();
        assert!(!result.has_findings());

        let at_threshold = log_with("", vec!["dup_frame", "dup_frame", "dup_frame"]);
        let result2 = analyzer.analyze(&at_threshold, &cancel).await.unwrap();
        assert!(result2.has_findings());
    }

    #[tokio::test]
    async fn dll_notice_suppressed_for_tbbmalloc() {
        let config = config_with("");
        let analyzer = SuspectAnalyzer::new(&config);
        let cancel = CancellationToken::new();

        let with_dll = log_with("crash in some.dll", vec![]);
        let result = analyzer.analyze(&with_dll, &cancel).await.unwrap();
        assert!(result.report_lines().join("").contains("DLL file was involved"));

        let tbb = log_with("crash in tbbmalloc.dll", vec![]);
        let result2 = analyzer.analyze(&tbb, &cancel).await.unwrap();
        assert!(!result2.report_lines().join("").contains("DLL file was involved"));
    }
}
