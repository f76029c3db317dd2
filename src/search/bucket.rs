//! Bucket key derivation.
//!
//! Every name maps to exactly one key, so buckets partition the record store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Partition key derived from the leading character of a symbol name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BucketKey {
    /// Lowercased alphabetic leading character.
    Letter(char),
    /// Any leading decimal digit.
    Numeric,
    /// Everything else (operators, `_`, `~`, punctuation, empty input).
    Symbols,
}

impl BucketKey {
    /// Derives the key for a name or query token.
    pub fn for_text(text: &str) -> Self {
        text.chars().next().map_or(Self::Symbols, Self::for_char)
    }

    pub fn for_char(c: char) -> Self {
        if c.is_ascii_digit() {
            Self::Numeric
        } else if c.is_alphabetic() {
            // Some uppercase letters lowercase to several chars; the first one
            // is enough to keep the key deterministic.
            Self::Letter(c.to_lowercase().next().unwrap_or(c))
        } else {
            Self::Symbols
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Letter(c) => write!(f, "{c}"),
            Self::Numeric => f.write_str("0-9"),
            Self::Symbols => f.write_str("symbols"),
        }
    }
}
