//! Query normalization.

/// A user query after trimming, lowercasing and whitespace tokenization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    joined: String,
    tokens: Vec<String>,
}

impl NormalizedQuery {
    /// Normalizes raw input. Returns `None` for empty or all-whitespace input,
    /// which callers treat as "no query" rather than "no matches".
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        let tokens: Vec<String> = lowered.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            return None;
        }
        Some(Self {
            joined: tokens.join(" "),
            tokens,
        })
    }

    /// The whole query with runs of whitespace collapsed to single spaces.
    pub fn as_str(&self) -> &str {
        &self.joined
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// First token; always present.
    pub fn head(&self) -> &str {
        &self.tokens[0]
    }

    pub fn is_multi_token(&self) -> bool {
        self.tokens.len() > 1
    }
}
