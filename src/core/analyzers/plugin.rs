// crashlog-sleuth - core/analyzers/plugin.rs
//
// Plugin Analyzer: matches plugin file names against the call
// stack, falling back to a configured XSE plugin-pattern scan when the log
// carries no plugin list at all.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::app::config::ConfigStore;
use crate::core::analyzer::Analyzer;
use crate::core::model::{AnalysisResult, CrashLog, Plugin, PluginOrigin};
use crate::core::reformat::{parse_load_order_line, reformat_load_order};
use crate::util::error::AnalyzerError;

const PRIORITY: i32 = 40;
const LOAD_ORDER_FILE_NAME: &str = "load_order.txt";
const MODIFIED_BY_MARKER: &str = "modified by:";
const LOAD_ORDER_BANNER: &str =
    "LOAD ORDER FILE FOUND, USING ITS PLUGIN LIST INSTEAD OF THE CRASH LOG\n";

fn load_order_from_file(path: &Path) -> Option<Vec<Plugin>> {
    let content = std::fs::read_to_string(path).ok()?;
    let normalized = reformat_load_order(&content);
    let mut lines = normalized.lines();
    lines.next(); // header line
    Some(
        lines
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| {
                let (load_order_token, file_name) = parse_load_order_line(l)?;
                Some(Plugin {
                    file_name,
                    load_order_token,
                    origin: PluginOrigin::LoadOrderFile,
                })
            })
            .collect(),
    )
}

pub struct PluginAnalyzer<'a> {
    config: &'a ConfigStore,
    working_dir: std::path::PathBuf,
}

impl<'a> PluginAnalyzer<'a> {
    pub fn new(config: &'a ConfigStore) -> Self {
        PluginAnalyzer {
            config,
            working_dir: std::env::current_dir().unwrap_or_default(),
        }
    }

    /// Test/CLI hook to point the `load_order.txt` lookup at a directory
    /// other than the process working directory.
    pub fn with_working_dir(config: &'a ConfigStore, working_dir: std::path::PathBuf) -> Self {
        PluginAnalyzer { config, working_dir }
    }

    fn ignore_list(&self) -> std::collections::HashSet<String> {
        let list: Vec<String> = self.config.get("Plugin_Ignore", Vec::new());
        list.into_iter().map(|s| s.to_lowercase()).collect()
    }

    fn xse_patterns(&self) -> Vec<String> {
        self.config.get("XSE_Plugin_Patterns", Vec::new())
    }
}

#[async_trait]
impl<'a> Analyzer for PluginAnalyzer<'a> {
    fn name(&self) -> &str {
        "Plugin"
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
        let ignore = self.ignore_list();

        let load_order_path = self.working_dir.join(LOAD_ORDER_FILE_NAME);
        let (plugins, used_load_order) = match load_order_from_file(&load_order_path) {
            Some(plugins) => (plugins, true),
            None => (crash_log.plugins.clone(), false),
        };

        if used_load_order {
            report_lines.push(LOAD_ORDER_BANNER.to_string());
        }

        let filtered: Vec<&Plugin> = plugins
            .iter()
            .filter(|p| !ignore.contains(&p.file_name.to_lowercase()))
            .collect();

        if plugins.is_empty() {
            return Ok(self.fallback_to_xse_scan(crash_log, report_lines));
        }

        let call_stack_lines: Vec<String> = crash_log
            .call_stack
            .iter()
            .map(|l| l.to_lowercase())
            .filter(|l| !l.contains(MODIFIED_BY_MARKER))
            .collect();
        let joined_stack = call_stack_lines.join("\n");

        let mut counts: HashMap<String, usize> = HashMap::new();
        for plugin in &filtered {
            let lowered = plugin.file_name.to_lowercase();
            let count = joined_stack.matches(lowered.as_str()).count();
            if count > 0 {
                counts.insert(lowered, count);
            }
        }

        let mut matches: Vec<(String, usize)> = counts.into_iter().collect();
        matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let has_findings = !matches.is_empty();
        for (name, count) in &matches {
            report_lines.push(format!("- {name} | {count}\n"));
        }

        Ok(AnalysisResult::Plugin {
            analyzer_name: self.name().to_string(),
            success: true,
            has_findings,
            report_lines,
            plugins: filtered.into_iter().cloned().collect(),
            errors: Vec::new(),
        })
    }
}

impl<'a> PluginAnalyzer<'a> {
    fn fallback_to_xse_scan(
        &self,
        crash_log: &CrashLog,
        mut report_lines: Vec<String>,
    ) -> AnalysisResult {
        let patterns = self.xse_patterns();
        let call_stack_lower = crash_log.call_stack_joined().to_lowercase();

        let relevant = patterns
            .iter()
            .any(|pattern| call_stack_lower.contains(&pattern.to_lowercase()));

        let mut dlls: Vec<String> = if relevant {
            crate::core::parser::extract_dll_tokens(&call_stack_lower)
        } else {
            Vec::new()
        };
        dlls.sort();
        dlls.dedup();

        let has_findings = !dlls.is_empty();
        for dll in &dlls {
            report_lines.push(format!("- {dll}\n"));
        }

        AnalysisResult::Plugin {
            analyzer_name: self.name().to_string(),
            success: true,
            has_findings,
            report_lines,
            plugins: Vec::new(),
            errors: Vec::new(),
        }
    }
}
