//! Prefix search over sorted tag files.
//!
//! Tag files hold one record per line:
//!
//! ```text
//! name<TAB>file<TAB>excmd;"<TAB>extension fields
//! ```
//!
//! Files are expected to be sorted by name (byte order), so the records matching a prefix form
//! one contiguous run. The searcher stops reading a file as soon as that run ends.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::app::sources::TagSources;
use crate::domain::errors::TagParseError;
use crate::domain::model::{Locator, TagRecord};

static SEARCH_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^([/?])\^?(.*?)(\$?)([/?])$").expect("search command regex is valid")
});
static LINE_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+$").expect("line command regex is valid"));
static DRIVE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]:[\\/]").expect("drive prefix regex is valid"));

/// Streams tag files and collects records whose name starts with a query.
#[derive(Debug, Clone)]
pub struct TagSearcher {
    assume_sorted: bool,
}

impl Default for TagSearcher {
    fn default() -> Self {
        Self {
            assume_sorted: true,
        }
    }
}

impl TagSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the early exit that relies on sorted input. Enabled by default.
    pub fn assume_sorted(mut self, sorted: bool) -> Self {
        self.assume_sorted = sorted;
        self
    }

    /// Search every source in order. Unreadable sources are skipped.
    pub fn search(&self, query: &str, sources: &TagSources) -> Vec<TagRecord> {
        sources
            .iter()
            .flat_map(|path| self.search_file(query, path))
            .collect()
    }

    /// Search a single tag file, returning an empty list when it cannot be read.
    pub fn search_file(&self, query: &str, path: &Path) -> Vec<TagRecord> {
        let tag_dir = path.parent().unwrap_or_else(|| Path::new(""));
        self.search_file_relative_to(query, path, tag_dir)
    }

    /// Like [`TagSearcher::search_file`], but relative file names in the records are joined
    /// onto `base` instead of the tag file's directory.
    pub fn search_file_relative_to(
        &self,
        query: &str,
        path: &Path,
        base: &Path,
    ) -> Vec<TagRecord> {
        if query.is_empty() {
            return Vec::new();
        }

        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "skipping tag source");
                return Vec::new();
            }
        };

        match self.scan(query, BufReader::new(file), base) {
            Ok(records) => records,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "failed reading tag source");
                Vec::new()
            }
        }
    }

    fn scan<R: BufRead>(
        &self,
        query: &str,
        mut reader: R,
        tag_dir: &Path,
    ) -> io::Result<Vec<TagRecord>> {
        let mut records = Vec::new();
        let mut raw = Vec::new();
        let mut previous = String::new();
        let mut warned_unsorted = false;

        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw)? == 0 {
                break;
            }
            while raw.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
                raw.pop();
            }

            let line = String::from_utf8_lossy(&raw);
            // Only lines whose name matches are parsed in full.
            let Some((name, _)) = line.split_once('\t') else {
                tracing::trace!("skipping tag line without fields");
                continue;
            };
            if name.is_empty() || line.starts_with("!_TAG_") {
                continue;
            }

            if !warned_unsorted && !previous.is_empty() && name < previous.as_str() {
                tracing::debug!(
                    tag_dir = %tag_dir.display(),
                    tag = name,
                    "tag file is not sorted"
                );
                warned_unsorted = true;
            }

            if name.starts_with(query) {
                match parse_line(&line, tag_dir) {
                    Ok(record) => records.push(record),
                    Err(err) => {
                        tracing::trace!(error = %err, "skipping tag line");
                        continue;
                    }
                }
            } else if self.assume_sorted
                && !records.is_empty()
                && parse_line(&line, tag_dir).is_ok()
            {
                break;
            }

            previous.clear();
            previous.push_str(name);
        }

        Ok(records)
    }
}

/// Parse one tag file line, resolving relative file names against `tag_dir`.
pub fn parse_line(line: &str, tag_dir: &Path) -> Result<TagRecord, TagParseError> {
    if line.starts_with("!_TAG_") {
        return Err(TagParseError::PseudoTag);
    }

    let mut parts = line.splitn(3, '\t');
    let name = parts.next().ok_or(TagParseError::MissingField("name"))?;
    let file = parts.next().ok_or(TagParseError::MissingField("file"))?;
    let rest = parts.next().ok_or(TagParseError::MissingField("address"))?;
    if name.is_empty() {
        return Err(TagParseError::EmptyName);
    }

    let (command, fields) = split_command(rest).ok_or(TagParseError::MissingField("address"))?;

    Ok(TagRecord {
        name: name.to_owned(),
        file: resolve_file(file, tag_dir),
        locator: parse_locator(command),
        fields: fields.to_owned(),
    })
}

// The address ends at the first `;"` followed by a tab or the end of the line.
fn split_command(rest: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    while let Some(found) = rest[offset..].find(";\"") {
        let end = offset + found;
        let after = &rest[end + 2..];
        if after.is_empty() {
            return Some((&rest[..end], ""));
        }
        if let Some(fields) = after.strip_prefix('\t') {
            return Some((&rest[..end], fields));
        }
        offset = end + 2;
    }
    None
}

fn parse_locator(command: &str) -> Locator {
    if LINE_COMMAND.is_match(command)
        && let Ok(line) = command.parse()
    {
        return Locator::Line(line);
    }

    if let Some(captures) = SEARCH_COMMAND.captures(command)
        && captures[1] == captures[4]
    {
        let delimiter = captures[1].chars().next().unwrap_or('/');
        return Locator::Pattern(unescape_pattern(&captures[2], delimiter));
    }

    Locator::Pattern(command.to_owned())
}

fn unescape_pattern(body: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some(next) if next == delimiter || next == '\\' => out.push(next),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn resolve_file(raw: &str, tag_dir: &Path) -> PathBuf {
    let normalized: Cow<'_, str> = if raw.contains("\\\\") {
        Cow::Owned(raw.replace("\\\\", "\\"))
    } else {
        Cow::Borrowed(raw)
    };

    let path = PathBuf::from(normalized.as_ref());
    if path.has_root() || DRIVE_PREFIX.is_match(&normalized) {
        path
    } else {
        tag_dir.join(path)
    }
}
