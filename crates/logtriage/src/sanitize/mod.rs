//! Row-cap enforcement for candidate queries.
//!
//! Runs before either backend sees a query. The rewrite is purely textual
//! so it behaves the same whether the query is SQL for the warehouse or
//! keyword text for the synthetic corpus.

use std::sync::OnceLock;

use regex::{Captures, Regex};

pub const DEFAULT_ROW_LIMIT: usize = 50;
pub const MAX_ROW_LIMIT: usize = 100;

/// Rewrites `query` so it always carries a bounded top-level `LIMIT` clause.
///
/// - every clause above 100 (or too large to parse) is rewritten to 50
/// - a clause at or below 100 is left as written
/// - no top-level clause: trailing `;` are stripped and `LIMIT 50` is appended
///
/// Clauses nested in parentheses (CTEs, subqueries) bound only their own
/// subquery, so they never count as the top-level clause.
#[must_use]
pub fn sanitize(query: &str) -> String {
    let rewritten = limit_clause_regex().replace_all(query, |captures: &Captures<'_>| {
        let keyword = &captures[1];
        let spacing = &captures[2];
        let digits = &captures[3];
        if declared_cap_exceeds_ceiling(digits) {
            format!("{keyword}{spacing}{DEFAULT_ROW_LIMIT}")
        } else {
            format!("{keyword}{spacing}{digits}")
        }
    });
    if has_limit_clause(&rewritten) {
        return rewritten.into_owned();
    }

    let candidate = strip_trailing_terminators(&rewritten);
    if candidate.is_empty() {
        return format!("LIMIT {DEFAULT_ROW_LIMIT}");
    }
    format!("{candidate} LIMIT {DEFAULT_ROW_LIMIT}")
}

/// Cap declared by the governing clause: the last `LIMIT n` outside any
/// parentheses. Caps too large for `usize` read as `usize::MAX`.
#[must_use]
pub fn declared_row_cap(query: &str) -> Option<usize> {
    governing_clause(query).map(|digits| digits.parse::<usize>().unwrap_or(usize::MAX))
}

/// Cap a backend should honour for `query`: the declared cap clamped to the
/// ceiling, or the default when no top-level clause is present.
#[must_use]
pub fn effective_row_cap(query: &str) -> usize {
    declared_row_cap(query).map_or(DEFAULT_ROW_LIMIT, |cap| cap.min(MAX_ROW_LIMIT))
}

/// Whether `query` bounds its outer result with a top-level `LIMIT n`.
#[must_use]
pub fn has_limit_clause(query: &str) -> bool {
    governing_clause(query).is_some()
}

fn governing_clause(query: &str) -> Option<&str> {
    limit_clause_regex()
        .captures_iter(query)
        .filter(|captures| {
            captures
                .get(0)
                .is_some_and(|clause| paren_depth_at(query, clause.start()) == 0)
        })
        .last()
        .and_then(|captures| captures.get(3))
        .map(|digits| digits.as_str())
}

/// Parenthesis nesting at byte `offset`. Parentheses inside single-quoted
/// literals are ignored.
fn paren_depth_at(query: &str, offset: usize) -> usize {
    let mut depth = 0usize;
    let mut in_literal = false;
    for ch in query[..offset].chars() {
        match ch {
            '\'' => in_literal = !in_literal,
            '(' if !in_literal => depth += 1,
            ')' if !in_literal => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}

pub(crate) fn strip_trailing_terminators(raw: &str) -> &str {
    let mut candidate = raw.trim();
    while let Some(stripped) = candidate.strip_suffix(';') {
        candidate = stripped.trim_end();
    }
    candidate
}

fn declared_cap_exceeds_ceiling(digits: &str) -> bool {
    digits
        .parse::<usize>()
        .map_or(true, |cap| cap > MAX_ROW_LIMIT)
}

fn limit_clause_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\b(limit)(\s+)(\d+)\b").expect("limit clause regex should compile")
    })
}
