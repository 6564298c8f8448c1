//! Bounded back/forward history of visited positions.

use serde::{Deserialize, Serialize};

use crate::domain::model::Location;

/// Tuning for [`HistoryStack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryOptions {
    /// Appends within this many lines of the current record update it in place.
    #[serde(default = "HistoryOptions::default_min_line_distance")]
    pub min_line_distance: usize,
    /// Oldest records are evicted beyond this size.
    #[serde(default = "HistoryOptions::default_max_size")]
    pub max_size: usize,
}

impl HistoryOptions {
    fn default_min_line_distance() -> usize {
        3
    }

    fn default_max_size() -> usize {
        100
    }
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            min_line_distance: Self::default_min_line_distance(),
            max_size: Self::default_max_size(),
        }
    }
}

/// Position history with a cursor.
///
/// The cursor is 1-based: the current record is `records[cursor - 1]` and a cursor of `0` means
/// there is no current record. Appending somewhere other than the end discards the forward
/// history, like an undo stack.
#[derive(Debug, Clone, Default)]
pub struct HistoryStack {
    records: Vec<Location>,
    cursor: usize,
    options: HistoryOptions,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: HistoryOptions) -> Self {
        Self {
            records: Vec::new(),
            cursor: 0,
            options,
        }
    }

    pub fn options(&self) -> HistoryOptions {
        self.options
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn records(&self) -> &[Location] {
        &self.records
    }

    /// Record under the cursor, if any.
    pub fn current(&self) -> Option<&Location> {
        self.cursor.checked_sub(1).and_then(|idx| self.records.get(idx))
    }

    /// Record a visited position.
    ///
    /// A position close to the current record (same document, within `min_line_distance`
    /// lines) replaces that record's line and column. Anything else drops the forward history
    /// and becomes the new newest record, evicting the oldest when over capacity.
    pub fn append(&mut self, location: Location) {
        let distance = self.options.min_line_distance;
        if let Some(idx) = self.cursor.checked_sub(1)
            && let Some(current) = self.records.get_mut(idx)
            && current.is_near(&location, distance)
        {
            current.line = location.line;
            current.column = location.column;
            return;
        }

        self.records.truncate(self.cursor);
        self.records.push(location);
        self.cursor = self.records.len();

        if self.records.len() > self.options.max_size {
            self.records.remove(0);
            self.cursor -= 1;
        }
    }

    /// Step back given the caller's live position.
    ///
    /// When `live` has drifted away from the current record, the current record is returned
    /// without moving so the caller can return to it first.
    pub fn back(&mut self, live: &Location) -> Option<Location> {
        if self.cursor <= 1 {
            return None;
        }

        let current = &self.records[self.cursor - 1];
        if !current.is_near(live, self.options.min_line_distance) {
            return Some(current.clone());
        }

        self.cursor -= 1;
        Some(self.records[self.cursor - 1].clone())
    }

    pub fn forward(&mut self) -> Option<Location> {
        if self.cursor >= self.records.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.records[self.cursor - 1].clone())
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.cursor = 0;
    }
}
