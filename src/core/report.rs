// crashlog-sleuth - core/report.rs
//
// Report Writer: concatenates each analyzer's `report_lines`, in
// order, followed by an `ERROR:` line for each of its `errors` entries.
// Analyzers own their trailing newlines; no additional separators are
// added here.

use crate::core::model::AnalysisResult;

/// Concatenate the `report_lines` and `errors` of every result, in order.
pub fn write_report(results: &[AnalysisResult]) -> String {
    let mut out = String::new();
    for r in results {
        for line in r.report_lines() {
            out.push_str(line);
        }
        for err in r.errors() {
            out.push_str(&format!("ERROR: {err}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn generic(name: &str, lines: Vec<&str>) -> AnalysisResult {
        AnalysisResult::Generic {
            analyzer_name: name.to_string(),
            success: true,
            has_findings: !lines.is_empty(),
            report_lines: lines.into_iter().map(str::to_string).collect(),
            data: HashMap::new(),
            errors: Vec::new(),
        }
    }

    #[test]
    fn concatenates_in_order_without_extra_separators() {
        let results = vec![
            generic("a", vec!["first\n"]),
            generic("b", vec!["second\n", "third\n"]),
        ];
        assert_eq!(write_report(&results), "first\nsecond\nthird\n");
    }

    #[test]
    fn empty_result_set_yields_empty_report() {
        assert_eq!(write_report(&[]), "");
    }

    #[test]
    fn failed_result_emits_error_line() {
        let results = vec![
            generic("a", vec!["first\n"]),
            AnalysisResult::failed("b", "disk read failed"),
        ];
        assert_eq!(write_report(&results), "first\nERROR: disk read failed\n");
    }
}
