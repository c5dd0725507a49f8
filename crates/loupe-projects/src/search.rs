//! Line-oriented content search shared by the project variants.

use loupe_workspace::SearchMatch;
use regex::Regex;
use regex::RegexBuilder;

/// Find every line of `text` matching `query`.
///
/// `is_regex` treats the query as a regular expression; an invalid
/// pattern falls back to a literal match instead of erroring, so a
/// half-typed query degrades gracefully.
pub(crate) fn search_in_content(
    text: &str,
    query: &str,
    case_sensitive: bool,
    is_regex: bool,
) -> Vec<SearchMatch> {
    let Some(pattern) = build_pattern(query, case_sensitive, is_regex) else {
        return Vec::new();
    };
    text.lines()
        .enumerate()
        .filter(|(_, line)| pattern.is_match(line))
        .map(|(index, line)| SearchMatch {
            line_number: index + 1,
            line_content: line.to_owned(),
        })
        .collect()
}

fn build_pattern(query: &str, case_sensitive: bool, is_regex: bool) -> Option<Regex> {
    let compile = |pattern: &str| {
        RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .ok()
    };
    if is_regex {
        if let Some(regex) = compile(query) {
            return Some(regex);
        }
    }
    compile(&regex::escape(query))
}
