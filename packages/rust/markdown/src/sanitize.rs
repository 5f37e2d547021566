//! Plain-text normalization applied to every source before it enters a corpus.

use std::sync::LazyLock;

use regex::Regex;

/// Normalize raw source text.
///
/// Passes, in order: unify line endings, drop control characters (tab and
/// newline survive), collapse runs of spaces and tabs, trim each line,
/// collapse blank-line runs to one, trim the whole text. Returns an empty
/// string when nothing readable is left.
pub fn sanitize(raw: &str) -> String {
    let mut result = unify_line_endings(raw);

    result = drop_control_chars(&result);
    result = collapse_inline_space(&result);
    result = trim_lines(&result);
    result = collapse_blank_lines(&result);

    result.trim().to_string()
}

fn unify_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn drop_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .filter(|c| *c != '\u{feff}')
        .collect()
}

fn collapse_inline_space(text: &str) -> String {
    static SPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid regex"));

    SPACE_RE.replace_all(text, " ").to_string()
}

fn trim_lines(text: &str) -> String {
    text.lines().map(str::trim).collect::<Vec<_>>().join("\n")
}

fn collapse_blank_lines(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(text, "\n\n").to_string()
}
