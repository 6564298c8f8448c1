//! Domain models for tags and visited positions.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Where a tag lives inside its file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    /// 1-based line number.
    Line(usize),
    /// Literal text to search for in the target file.
    Pattern(String),
}

impl Locator {
    /// Text shown to users when choosing between candidates.
    pub fn display_text(&self) -> String {
        match self {
            Locator::Line(line) => line.to_string(),
            Locator::Pattern(pattern) => pattern.trim().to_owned(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Line(line) => write!(f, "{line}"),
            Locator::Pattern(pattern) => write!(f, "/{pattern}/"),
        }
    }
}

/// A single entry read from a tag file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub name: String,
    pub file: PathBuf,
    pub locator: Locator,
    /// Raw extension fields, tab separated, possibly empty.
    pub fields: String,
}

impl TagRecord {
    /// Extension fields without the kind, space separated.
    pub fn fields_without_kind(&self) -> String {
        self.fields
            .split('\t')
            .map(str::trim)
            .filter(|field| !field.is_empty() && !is_kind_field(field))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Final path component of the target file.
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.display().to_string())
    }
}

// ctags writes the kind either bare (`f`) or long form (`kind:function`).
fn is_kind_field(field: &str) -> bool {
    field.starts_with("kind:") || !field.contains(':')
}

/// A visited position: a file path or buffer id plus a 0-based line/column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub id: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(id: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            id: id.into(),
            line,
            column,
        }
    }

    /// Whether `other` is in the same document within `distance` lines.
    pub fn is_near(&self, other: &Location, distance: usize) -> bool {
        self.id == other.id && self.line.abs_diff(other.line) <= distance
    }
}
