//! clonemap - Aggregation map for exact code clones found by copy/paste detection
//!
//! A detector (tokenizer + sequence matcher, not part of this crate) reports
//! each duplicated fragment it finds as a [`CodeClone`]: a stable id, a
//! duplicated-line count, and the locations where the fragment appears.
//! [`CloneMap`] collects those detections, merges re-observations of the same
//! logical clone, and keeps the running totals a report renderer needs to
//! print a duplication percentage.
//!
//! ```
//! use clonemap::{CloneMap, CloneOccurrence, CodeClone};
//!
//! let mut map = CloneMap::new();
//! map.add_clone(CodeClone::new(
//!     "a1b2",
//!     26,
//!     vec![
//!         CloneOccurrence::new("src/auth.rs", 10),
//!         CloneOccurrence::new("src/admin.rs", 42),
//!     ],
//! ));
//! map.set_num_lines(200);
//!
//! assert_eq!(map.len(), 1);
//! assert_eq!(map.percentage(), "13.00%");
//! ```

use ahash::{AHasher, RandomState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// A single location where a duplicated fragment appears.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CloneOccurrence {
    pub path: PathBuf,
    pub start_line: usize,
}

impl CloneOccurrence {
    pub fn new(path: impl Into<PathBuf>, start_line: usize) -> Self {
        CloneOccurrence {
            path: path.into(),
            start_line,
        }
    }
}

impl fmt::Display for CloneOccurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.start_line)
    }
}

/// One logical clone: a duplicated fragment plus every place it appears.
///
/// The id identifies the fragment itself, independent of how many occurrences
/// have been observed so far. Two detections carrying the same id describe
/// the same clone, possibly with different occurrence sets. A well-formed
/// clone has at least two occurrences; this is the detector's responsibility
/// and is not validated here.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CodeClone {
    id: String,
    size: usize,
    occurrences: Vec<CloneOccurrence>,
}

impl CodeClone {
    pub fn new(id: impl Into<String>, size: usize, occurrences: Vec<CloneOccurrence>) -> Self {
        CodeClone {
            id: id.into(),
            size,
            occurrences,
        }
    }

    /// Stable identity of the duplicated fragment.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of duplicated lines this detection contributes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Occurrence locations, in the order they were added.
    pub fn occurrences(&self) -> &[CloneOccurrence] {
        &self.occurrences
    }

    /// Appends an occurrence unless it is already listed.
    pub fn add_occurrence(&mut self, occurrence: CloneOccurrence) {
        if !self.occurrences.contains(&occurrence) {
            self.occurrences.push(occurrence);
        }
    }
}

/// Derives a stable clone id from the duplicated fragment text.
///
/// Detectors that do not carry their own identity scheme can hash the
/// normalized fragment; equal fragments map to equal ids.
pub fn fragment_id(fragment: &str) -> String {
    let mut hasher = AHasher::default();
    fragment.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Deduplicating collection of clones plus running duplication totals.
///
/// Entries are kept in first-insertion order and are never removed. The map
/// is a single-threaded accumulator: ingest with [`add_clone`], set the
/// denominator with [`set_num_lines`], then read.
///
/// [`add_clone`]: CloneMap::add_clone
/// [`set_num_lines`]: CloneMap::set_num_lines
#[derive(Debug, Default, Serialize)]
pub struct CloneMap {
    clones: Vec<CodeClone>,
    #[serde(skip)]
    by_id: HashMap<String, usize, RandomState>,
    duplicate_lines: usize,
    analyzed_lines: usize,
}

impl CloneMap {
    pub fn new() -> Self {
        CloneMap::default()
    }

    /// Adds a detection to the map.
    ///
    /// An unseen id appends a new entry. A known id merges instead: the
    /// existing entry absorbs any occurrence it does not already list, and
    /// keeps its original size. Either way `duplicate_lines` grows by the
    /// detection's size, so the total reflects duplicated-line mass reported
    /// across all calls; callers must report each duplication event exactly
    /// once.
    pub fn add_clone(&mut self, clone: CodeClone) {
        match self.by_id.get(clone.id()) {
            Some(&pos) => {
                self.duplicate_lines += clone.size;
                let existing = &mut self.clones[pos];
                for occurrence in clone.occurrences {
                    existing.add_occurrence(occurrence);
                }
            }
            None => {
                self.duplicate_lines += clone.size;
                self.by_id.insert(clone.id.clone(), self.clones.len());
                self.clones.push(clone);
            }
        }
    }

    /// All retained clones, in first-insertion order.
    pub fn clones(&self) -> &[CodeClone] {
        &self.clones
    }

    /// Number of distinct logical clones (not the number of detections).
    pub fn len(&self) -> usize {
        self.clones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clones.is_empty()
    }

    /// Running sum of the sizes of every detection ingested so far.
    pub fn duplicate_lines(&self) -> usize {
        self.duplicate_lines
    }

    /// Total number of analyzed lines, the percentage denominator.
    pub fn num_lines(&self) -> usize {
        self.analyzed_lines
    }

    /// Sets the total number of analyzed lines. Repeated calls overwrite.
    pub fn set_num_lines(&mut self, num_lines: usize) {
        self.analyzed_lines = num_lines;
    }

    /// Duplication percentage formatted with two decimals, e.g. `"12.34%"`.
    ///
    /// A map with zero analyzed lines reports `"100.00%"`: a degenerate
    /// input is flagged loudly instead of dividing by zero.
    pub fn percentage(&self) -> String {
        let percent = if self.analyzed_lines > 0 {
            self.duplicate_lines as f64 / self.analyzed_lines as f64 * 100.0
        } else {
            100.0
        };
        format!("{:.2}%", percent)
    }

    /// Iterates the retained clones in insertion order. Re-acquire the
    /// iterator to start over from the first entry.
    pub fn iter(&self) -> std::slice::Iter<'_, CodeClone> {
        self.clones.iter()
    }

    /// Flat summary for report consumers.
    pub fn stats(&self) -> CloneStats {
        CloneStats {
            total_clones: self.len(),
            duplicate_lines: self.duplicate_lines,
            analyzed_lines: self.analyzed_lines,
            percentage: self.percentage(),
        }
    }
}

impl<'a> IntoIterator for &'a CloneMap {
    type Item = &'a CodeClone;
    type IntoIter = std::slice::Iter<'a, CodeClone>;

    fn into_iter(self) -> Self::IntoIter {
        self.clones.iter()
    }
}

impl IntoIterator for CloneMap {
    type Item = CodeClone;
    type IntoIter = std::vec::IntoIter<CodeClone>;

    fn into_iter(self) -> Self::IntoIter {
        self.clones.into_iter()
    }
}

/// Summary of an aggregated clone map.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CloneStats {
    pub total_clones: usize,
    pub duplicate_lines: usize,
    pub analyzed_lines: usize,
    pub percentage: String,
}
