//! Structured rows for the presentation layer and their text rendering.

use crate::record::{Record, SymbolKind};
use crate::search::{SearchHit, Suggestion};
use serde::Serialize;
use std::fmt::Write as _;

/// One displayed search result. The core supplies data only, never markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub display_name: String,
    pub qualified_path: String,
    pub url: String,
    pub kind: SymbolKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overload_note: Option<String>,
}

impl From<&Record> for ResultRow {
    fn from(record: &Record) -> Self {
        Self {
            display_name: record.name.clone(),
            qualified_path: record.path_string(),
            url: record.url.clone(),
            kind: record.kind,
            overload_note: record.overload_note.clone(),
        }
    }
}

/// What the result list currently shows.
///
/// "No matches" is an explicit state so an empty list is never rendered as a
/// silent absence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisplayList {
    /// Nothing has been searched (idle or cleared input).
    #[default]
    Empty,
    /// The query matched nothing.
    NoMatches { query: String },
    /// Ranked rows for the query.
    Results { query: String, rows: Vec<ResultRow> },
}

impl DisplayList {
    pub fn from_rows(query: impl Into<String>, rows: Vec<ResultRow>) -> Self {
        let query = query.into();
        if rows.is_empty() {
            Self::NoMatches { query }
        } else {
            Self::Results { query, rows }
        }
    }

    pub fn rows(&self) -> &[ResultRow] {
        match self {
            Self::Results { rows, .. } => rows,
            Self::Empty | Self::NoMatches { .. } => &[],
        }
    }

    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Results { query, .. } | Self::NoMatches { query } => Some(query),
            Self::Empty => None,
        }
    }

    pub const fn is_no_matches(&self) -> bool {
        matches!(self, Self::NoMatches { .. })
    }
}

/// Renders ranked hits as numbered text lines for tool output.
pub fn render_hits(query: &str, hits: &[SearchHit<'_>], suggestions: &[Suggestion]) -> String {
    if hits.is_empty() {
        let mut msg = format!("No matches for '{}'.\n", query.trim());
        if !suggestions.is_empty() {
            msg.push_str("\nDid you mean:\n");
            for suggestion in suggestions {
                let _ = writeln!(msg, "• `{}`", suggestion.name);
            }
        }
        return msg;
    }

    let mut output = format!("Symbols matching '{}':\n\n", query.trim());
    for (idx, hit) in hits.iter().enumerate() {
        let record = hit.record;
        let _ = write!(
            output,
            "{}. `{}` ({})",
            idx + 1,
            record.path_string(),
            record.kind
        );
        if let Some(note) = &record.overload_note {
            let _ = write!(output, " {}", note);
        }
        let _ = writeln!(
            output,
            " - relevance: {}%\n   {}",
            hit.tier.relevance(),
            record.url
        );
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::MatchTier;
    use assert2::check;

    #[test]
    fn test_row_from_record() {
        let record = Record::new(1, "append", &["basic_string"], "s.html#a1", SymbolKind::Function)
            .with_overload_note("(InputIt first, InputIt last)");
        let row = ResultRow::from(&record);
        check!(row.display_name == "append");
        check!(row.qualified_path == "basic_string::append");
        check!(row.url == "s.html#a1");
        check!(row.overload_note.as_deref() == Some("(InputIt first, InputIt last)"));
    }

    #[test]
    fn test_display_list_distinguishes_no_matches() {
        check!(DisplayList::from_rows("xyz", vec![]).is_no_matches());
        check!(DisplayList::default().query().is_none());
        check!(!DisplayList::default().is_no_matches());
    }

    #[test]
    fn test_render_hits() {
        let record = Record::new(2, "at", &["array"], "array.html#at", SymbolKind::Function);
        let hits = [SearchHit {
            record: &record,
            tier: MatchTier::Exact,
        }];
        let text = render_hits("at", &hits, &[]);
        check!(text.contains("1. `array::at` (function) - relevance: 100%"));
        check!(text.contains("array.html#at"));

        let empty = render_hits(
            " mutx ",
            &[],
            &[Suggestion {
                name: "mutex".to_string(),
                score: 0.9,
            }],
        );
        check!(empty.starts_with("No matches for 'mutx'."));
        check!(empty.contains("• `mutex`"));
    }
}
