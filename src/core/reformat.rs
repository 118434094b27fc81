// crashlog-sleuth - core/reformat.rs
//
// Pre-parse normalization of load-order lines. Pure, idempotent
// text transform with no I/O.

use regex::Regex;
use std::sync::OnceLock;

fn load_order_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*((?:[0-9A-Fa-f]+\s+)+)([0-9A-Fa-f]{2}|FE:[0-9A-Fa-f]{3})\s+(.+)$")
            .expect("load order regex is valid")
    })
}

/// Collapse whitespace in load-order lines: `"  253   253    FD Unmanaged.esp"`
/// becomes `"253 253 FD Unmanaged.esp"`. Idempotent; lines that don't match
/// the load-order shape pass through unchanged, verbatim.
pub fn reformat_load_order(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    text.lines()
        .map(reformat_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// `Option`-accepting form for callers holding an absent load-order text
/// (the source of truth never had one): `None` maps to `None`, matching the
/// boundary property `reformat_load_order(null) == null`.
pub fn reformat_load_order_opt(text: Option<&str>) -> Option<String> {
    text.map(reformat_load_order)
}

/// Split a load-order line into its `(load_order_token, file_name)` pair,
/// or `None` if the line doesn't have the load-order shape (e.g. a header
/// or blank line). Used by the Plugin Analyzer's `load_order.txt` override.
pub fn parse_load_order_line(line: &str) -> Option<(String, String)> {
    let caps = load_order_line_re().captures(line)?;
    let token = caps.get(2)?.as_str().to_string();
    let file_name = caps.get(3)?.as_str().trim_end().to_string();
    Some((token, file_name))
}

fn reformat_line(line: &str) -> String {
    let re = load_order_line_re();
    let Some(caps) = re.captures(line) else {
        return line.to_string();
    };

    let indices = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let token = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    let filename = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

    let collapsed_indices: Vec<&str> = indices.split_whitespace().collect();
    let mut out = String::new();
    for idx in &collapsed_indices {
        out.push_str(idx);
        out.push(' ');
    }
    out.push_str(token);
    out.push(' ');
    out.push_str(filename.trim_end());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_in_a_load_order_line() {
        let input = "  253   253    FD Unmanaged.esp";
        assert_eq!(reformat_load_order(input), "253 253 FD Unmanaged.esp");
    }

    #[test]
    fn preserves_filenames_with_embedded_spaces() {
        let input = "01 01 FE My Mod With Spaces.esp";
        assert_eq!(
            reformat_load_order(input),
            "01 01 FE My Mod With Spaces.esp"
        );
    }

    #[test]
    fn light_master_token_is_preserved() {
        let input = "  01   01    FE:003   MyPlugin.esp";
        assert_eq!(reformat_load_order(input), "01 01 FE:003 MyPlugin.esp");
    }

    #[test]
    fn non_matching_line_passes_through_unchanged() {
        let input = "This is just free text, not a load order line.";
        assert_eq!(reformat_load_order(input), input);
    }

    #[test]
    fn empty_input_returns_empty() {
        assert_eq!(reformat_load_order(""), "");
    }

    #[test]
    fn none_input_returns_none() {
        assert_eq!(reformat_load_order_opt(None), None);
        assert_eq!(reformat_load_order_opt(Some("")), Some(String::new()));
    }

    #[test]
    fn is_idempotent() {
        let input = "  00   00    Fallout4.esm\nnot a plugin line at all";
        let once = reformat_load_order(input);
        let twice = reformat_load_order(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn multiline_input_reformats_each_line_independently() {
        let input = "  00   00   Fallout4.esm\n  01   01   DLCRobot.esm";
        let expected = "00 00 Fallout4.esm\n01 01 DLCRobot.esm";
        assert_eq!(reformat_load_order(input), expected);
    }

    #[test]
    fn parse_load_order_line_splits_token_and_filename() {
        let (token, file_name) = parse_load_order_line("253 253 FD Unmanaged.esp").unwrap();
        assert_eq!(token, "FD");
        assert_eq!(file_name, "Unmanaged.esp");
    }

    #[test]
    fn parse_load_order_line_handles_filenames_with_spaces() {
        let (token, file_name) = parse_load_order_line("01 01 FE:003 My Mod With Spaces.esp").unwrap();
        assert_eq!(token, "FE:003");
        assert_eq!(file_name, "My Mod With Spaces.esp");
    }

    #[test]
    fn parse_load_order_line_returns_none_for_header() {
        assert!(parse_load_order_line("# This file was generated").is_none());
    }
}
