// src/table/header.rs

use crate::config::HeaderDetection;
use crate::table::utils::clean_str;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

static TOKEN_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;\s]+").unwrap());

/// Comma cells plus whitespace-separated words, so both `global [cm]` and
/// `Year` style tokens can be matched.
fn tokens(line: &str) -> Vec<String> {
    line.split(',')
        .map(clean_str)
        .chain(TOKEN_SPLIT.split(line.trim()).map(clean_str))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Does `line` satisfy the token policy? An empty policy never matches.
pub fn is_header_line(line: &str, policy: &HeaderDetection) -> bool {
    if policy.required_tokens.is_empty() && policy.any_tokens.is_empty() {
        return false;
    }
    let toks = tokens(line);
    let has = |want: &String| toks.iter().any(|t| t == want);
    policy.required_tokens.iter().all(has)
        && (policy.any_tokens.is_empty() || policy.any_tokens.iter().any(has))
}

/// Index of the header line within the first `scan_lines` lines of `text`.
/// Everything before it is preamble.
pub fn locate_header(text: &str, policy: &HeaderDetection) -> Option<usize> {
    text.lines()
        .take(policy.scan_lines)
        .enumerate()
        .find(|(idx, line)| {
            trace!(line = idx, "scanning for header");
            !is_comment(line, policy.comment) && is_header_line(line, policy)
        })
        .map(|(idx, _)| idx)
}

pub(crate) fn is_comment(line: &str, comment: Option<char>) -> bool {
    comment.map_or(false, |c| line.trim_start().starts_with(c))
}

/// `text` with the first `skip` lines removed.
pub fn strip_preamble(text: &str, skip: usize) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines().skip(skip) {
        out.push_str(line);
        out.push('\n');
    }
    out
}
