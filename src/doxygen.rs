//! Ingestion of Doxygen `search/*.js` tables.
//!
//! Each table is a JavaScript array literal:
//!
//! ```text
//! var searchData=
//! [
//!   ['append_645',['append',['../classbasic__string.html#a6a55',1,'pmem::obj::basic_string::append(InputIt first, InputIt last)']]],
//! ];
//! ```
//!
//! Every `[url, flag, scope]` target becomes one [`Record`], so overloads that
//! share a display name become distinct records.

use crate::error::IngestError;
use crate::record::{Record, RecordId, SymbolKind};
use ahash::AHashSet;
use anyhow::Context;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

/// The symbol category of a table, derived from its file name (`functions_0.js`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Fixed(SymbolKind),
    /// The `all_*` tables mix every category; kinds are inferred per target.
    Mixed,
}

impl TableKind {
    /// Maps a file stem like `classes_3` to its table kind.
    pub fn from_stem(stem: &str) -> Option<Self> {
        let prefix = stem.rsplit_once('_').map_or(stem, |(prefix, _)| prefix);
        let kind = match prefix {
            "all" => return Some(Self::Mixed),
            "functions" => SymbolKind::Function,
            "variables" | "enumvalues" | "properties" | "events" => SymbolKind::Variable,
            "classes" | "typedefs" | "enums" | "related" | "concepts" => SymbolKind::Type,
            "defines" => SymbolKind::Macro,
            "namespaces" => SymbolKind::Namespace,
            "files" => SymbolKind::File,
            "pages" | "groups" => SymbolKind::Page,
            _ => return None,
        };
        Some(Self::Fixed(kind))
    }

    fn resolve(self, url: &str, note: Option<&str>) -> SymbolKind {
        match self {
            Self::Fixed(kind) => kind,
            Self::Mixed => infer_kind(url, note),
        }
    }
}

/// Guesses a kind from the link target when the table does not say.
fn infer_kind(url: &str, note: Option<&str>) -> SymbolKind {
    if note.is_some() {
        return SymbolKind::Function;
    }
    let page = url.rsplit('/').next().unwrap_or(url);
    match page.split_once('#') {
        Some(_) => SymbolKind::Variable,
        None if page.starts_with("namespace") => SymbolKind::Namespace,
        None if ["class", "struct", "union"].iter().any(|p| page.starts_with(p)) => {
            SymbolKind::Type
        }
        None if page.contains("_8") => SymbolKind::File,
        None => SymbolKind::Page,
    }
}

/// Parses one `searchData` table into records.
pub fn parse_search_data(text: &str, kind: TableKind) -> Result<Vec<Record>, IngestError> {
    let start = text
        .find("searchData")
        .and_then(|at| text[at..].find('[').map(|open| at + open))
        .ok_or(IngestError::MissingArray)?;

    let mut parser = Parser { src: text, pos: start };
    let Value::List(entries) = parser.value()? else {
        return Err(IngestError::MissingArray);
    };

    let mut records = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        collect_entry(entry, index, kind, &mut records)?;
    }
    Ok(records)
}

/// `[key, [display, target, target, ...]]`
fn collect_entry(
    entry: Value,
    index: usize,
    kind: TableKind,
    out: &mut Vec<Record>,
) -> Result<(), IngestError> {
    let malformed = |reason: &str| IngestError::MalformedEntry {
        index,
        reason: reason.to_string(),
    };

    let Value::List(mut parts) = entry else {
        return Err(malformed("entry is not an array"));
    };
    if parts.len() != 2 {
        return Err(malformed("expected [key, [name, targets...]]"));
    }
    let Some(Value::List(body)) = parts.pop() else {
        return Err(malformed("missing target list"));
    };
    let mut body = body.into_iter();
    let Some(Value::Str(display)) = body.next() else {
        return Err(malformed("missing display name"));
    };
    let display = decode_entities(&display);

    for target in body {
        let Value::List(fields) = target else {
            return Err(malformed("target is not an array"));
        };
        let mut fields = fields.into_iter();
        let Some(Value::Str(url)) = fields.next() else {
            return Err(malformed("target without url"));
        };
        // fields: url, show-scope flag, optional scope
        let scope = match fields.nth(1) {
            Some(Value::Str(scope)) => decode_entities(&scope),
            Some(_) => return Err(malformed("scope is not a string")),
            None => String::new(),
        };

        let (qualified_path, note) = split_scope(&scope, &display);
        let kind = kind.resolve(&url, note.as_deref());
        out.push(Record {
            id: record_id(&url, &scope, &display),
            name: display.clone(),
            qualified_path,
            url,
            kind,
            overload_note: note,
        });
    }
    Ok(())
}

/// Stable id for a target, independent of its position in the tables.
pub fn record_id(url: &str, scope: &str, display: &str) -> RecordId {
    let key = format!("{url}\0{scope}\0{display}");
    RecordId(xxh3_64(key.as_bytes()))
}

/// Splits a Doxygen scope string into path segments and an overload note.
///
/// `pmem::obj::basic_string::append(InputIt first)` gives
/// `["pmem", "obj", "basic_string", "append"]` and `"(InputIt first)"`. A scope
/// naming only the container gets the display name appended.
pub fn split_scope(scope: &str, name: &str) -> (Vec<String>, Option<String>) {
    let scope = scope.trim();
    if scope.is_empty() {
        return (vec![name.to_string()], None);
    }

    // Operator names contain `(`, `<` and `>` themselves, so the signature
    // search starts after the name.
    let search_from = locate_name(scope, name).map_or(0, |at| at + name.len());
    let (head, note) = match top_level_paren(scope, search_from) {
        Some(open) => {
            let note = scope[open..].trim();
            (scope[..open].trim_end(), (!note.is_empty()).then(|| note.to_string()))
        }
        None => (scope, None),
    };

    let container = match head.strip_suffix(name) {
        Some(prefix) if prefix.is_empty() || prefix.ends_with("::") => {
            prefix.trim_end_matches("::")
        }
        _ => head,
    };

    let mut segments = split_path(container);
    segments.push(name.to_string());
    (segments, note)
}

/// Byte offset of `name` as a whole path segment of `scope`.
///
/// Prefers an occurrence that starts a segment and is followed by the
/// signature or the end, so `operator<` is not found inside `operator<=`.
fn locate_name(scope: &str, name: &str) -> Option<usize> {
    let mut first = None;
    for (at, _) in scope.match_indices(name) {
        let starts_segment = at == 0 || scope[..at].ends_with("::");
        if !starts_segment {
            continue;
        }
        first.get_or_insert(at);
        let rest = &scope[at + name.len()..];
        if rest.is_empty() || rest.starts_with('(') {
            return Some(at);
        }
    }
    first.or_else(|| scope.find(name))
}

/// First `(` at template depth zero, counting from `from`.
fn top_level_paren(text: &str, from: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.get(from..)?.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            '(' if depth == 0 => return Some(from + i),
            _ => {}
        }
    }
    None
}

/// Splits on `::` outside template argument lists. Angle brackets inside an
/// `operator` segment belong to its name.
fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut in_operator = path.trim_start().starts_with("operator");
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' if !in_operator => depth += 1,
            b'>' if !in_operator => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                push_segment(&mut segments, &path[start..i]);
                i += 2;
                start = i;
                in_operator = path[start..].trim_start().starts_with("operator");
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    push_segment(&mut segments, &path[start..]);
    segments
}

fn push_segment(segments: &mut Vec<String>, segment: &str) {
    let segment = segment.trim();
    if !segment.is_empty() {
        segments.push(segment.to_string());
    }
}

/// Decodes the HTML entities Doxygen emits in names and signatures.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Loads every recognised table under `dir`, in path order.
pub fn load_dir(dir: &Path) -> crate::error::Result<Vec<Record>> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }

    let mut tables: Vec<(PathBuf, TableKind)> = WalkBuilder::new(dir)
        .standard_filters(false)
        .build()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("js") {
                return None;
            }
            let stem = path.file_stem()?.to_str()?;
            match TableKind::from_stem(stem) {
                Some(kind) => Some((path.to_path_buf(), kind)),
                None => {
                    tracing::debug!("Skipping non-table script {}", path.display());
                    None
                }
            }
        })
        .collect();
    // Category tables first: their kinds beat the ones guessed for `all_*`.
    tables.sort_by(|a, b| {
        let mixed = |kind: &TableKind| *kind == TableKind::Mixed;
        (mixed(&a.1), &a.0).cmp(&(mixed(&b.1), &b.0))
    });

    let mut seen = AHashSet::new();
    let mut records = Vec::new();
    for (path, kind) in &tables {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read search table {}", path.display()))?;
        let parsed = parse_search_data(&text, *kind)
            .with_context(|| format!("Failed to parse search table {}", path.display()))?;
        let before = records.len();
        // The same target is listed in `all_*` and in its category table.
        records.extend(parsed.into_iter().filter(|r| seen.insert(r.id)));
        tracing::debug!(
            "Loaded {} new records from {}",
            records.len() - before,
            path.display()
        );
    }

    tracing::info!(
        "Loaded {} records from {} search tables in {}",
        records.len(),
        tables.len(),
        dir.display()
    );
    Ok(records)
}

/// Literal values appearing in a table.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Str(String),
    Num(i64),
    List(Vec<Value>),
}

/// Recursive-descent reader for the subset of JavaScript used by the tables.
struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn value(&mut self) -> Result<Value, IngestError> {
        self.skip_ws();
        match self.peek() {
            Some('[') => self.list(),
            Some('\'' | '"') => self.string().map(Value::Str),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn list(&mut self) -> Result<Value, IngestError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(Value::List(items));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.bump(),
                Some(']') => {}
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
    }

    fn string(&mut self) -> Result<String, IngestError> {
        let Some(quote) = self.peek() else {
            return Err(self.unexpected("a string"));
        };
        self.bump();
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.unexpected("closing quote")),
                Some('\\') => {
                    self.bump();
                    let Some(escaped) = self.peek() else {
                        return Err(self.unexpected("escaped character"));
                    };
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                    self.bump();
                }
                Some(c) if c == quote => {
                    self.bump();
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.bump();
                }
            }
        }
    }

    fn number(&mut self) -> Result<Value, IngestError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        self.src[start..self.pos]
            .parse()
            .map(Value::Num)
            .map_err(|_| IngestError::Unexpected {
                offset: start,
                expected: "a number",
                found: self.src[start..self.pos].to_string(),
            })
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn unexpected(&self, expected: &'static str) -> IngestError {
        IngestError::Unexpected {
            offset: self.pos,
            expected,
            found: self
                .peek()
                .map_or_else(|| "end of input".to_string(), |c| format!("'{c}'")),
        }
    }
}
