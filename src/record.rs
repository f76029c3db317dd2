//! Documentation records as delivered by the producer.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a documentation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Kind of documented symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Type,
    Function,
    Variable,
    Macro,
    Namespace,
    File,
    Page,
}

impl SymbolKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Function => "function",
            Self::Variable => "variable",
            Self::Macro => "macro",
            Self::Namespace => "namespace",
            Self::File => "file",
            Self::Page => "page",
        }
    }

    /// Parses a kind name as used in tool requests (`"fn"` is accepted for functions).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "type" | "class" | "struct" => Some(Self::Type),
            "function" | "fn" => Some(Self::Function),
            "variable" | "var" => Some(Self::Variable),
            "macro" | "define" => Some(Self::Macro),
            "namespace" => Some(Self::Namespace),
            "file" => Some(Self::File),
            "page" => Some(Self::Page),
            _ => None,
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One indexed documentation symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Unqualified symbol name; equals the last segment of `qualified_path`.
    pub name: String,
    /// Namespace and class nesting, outer to inner.
    pub qualified_path: Vec<String>,
    /// Opaque locator handed back to the presentation layer.
    pub url: String,
    pub kind: SymbolKind,
    /// Disambiguating context such as an overload signature.
    pub overload_note: Option<String>,
}

impl Record {
    /// Creates a record whose qualified path is `scope` followed by `name`.
    pub fn new(
        id: u64,
        name: impl Into<String>,
        scope: &[&str],
        url: impl Into<String>,
        kind: SymbolKind,
    ) -> Self {
        let name = name.into();
        let mut qualified_path: Vec<String> = scope.iter().map(|s| (*s).to_string()).collect();
        qualified_path.push(name.clone());
        Self {
            id: RecordId(id),
            name,
            qualified_path,
            url: url.into(),
            kind,
            overload_note: None,
        }
    }

    #[must_use]
    pub fn with_overload_note(mut self, note: impl Into<String>) -> Self {
        self.overload_note = Some(note.into());
        self
    }

    /// The qualified path joined with `::`.
    pub fn path_string(&self) -> String {
        self.qualified_path.join("::")
    }

    /// Checks the structural invariants of a single record.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName { id: self.id });
        }
        let Some(last) = self.qualified_path.last() else {
            return Err(ValidationError::EmptyPath { id: self.id });
        };
        if *last != self.name {
            return Err(ValidationError::NameMismatch {
                id: self.id,
                name: self.name.clone(),
                last: last.clone(),
            });
        }
        Ok(())
    }
}
