//! Conflicted paths reported by the index, and conflict-marker detection.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a path became unmerged, from the two-letter porcelain status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// `UU`
    BothModified,
    /// `AA`
    BothAdded,
    /// `DD`
    BothDeleted,
    /// `AU`
    AddedByUs,
    /// `UA`
    AddedByThem,
    /// `DU`
    DeletedByUs,
    /// `UD`
    DeletedByThem,
}

impl ConflictKind {
    /// Map a porcelain v1 `XY` code to a conflict kind, if it is unmerged.
    pub fn from_status(xy: &str) -> Option<Self> {
        match xy {
            "UU" => Some(ConflictKind::BothModified),
            "AA" => Some(ConflictKind::BothAdded),
            "DD" => Some(ConflictKind::BothDeleted),
            "AU" => Some(ConflictKind::AddedByUs),
            "UA" => Some(ConflictKind::AddedByThem),
            "DU" => Some(ConflictKind::DeletedByUs),
            "UD" => Some(ConflictKind::DeletedByThem),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ConflictKind::BothModified => "both modified",
            ConflictKind::BothAdded => "both added",
            ConflictKind::BothDeleted => "both deleted",
            ConflictKind::AddedByUs => "added by us",
            ConflictKind::AddedByThem => "added by them",
            ConflictKind::DeletedByUs => "deleted by us",
            ConflictKind::DeletedByThem => "deleted by them",
        };
        write!(f, "{text}")
    }
}

/// A single unmerged path, relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub path: String,
    pub kind: ConflictKind,
}

/// Ordered set of unmerged paths for one sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictSet {
    entries: Vec<ConflictEntry>,
}

impl ConflictSet {
    pub fn new(entries: Vec<ConflictEntry>) -> Self {
        ConflictSet { entries }
    }

    /// Parse the output of `git status --porcelain=v1 -z`.
    ///
    /// Entries are NUL-separated; rename and copy entries (in the index or
    /// the worktree column) carry their source path as an extra field, which
    /// is skipped. Malformed entries are ignored.
    pub fn from_porcelain_z(output: &str) -> Self {
        let mut entries = Vec::new();
        let mut fields = output.split('\0').filter(|f| !f.is_empty());

        while let Some(field) = fields.next() {
            let (Some(xy), Some(path)) = (field.get(..2), field.get(3..)) else {
                continue;
            };
            if path.is_empty() {
                continue;
            }

            if let Some(kind) = ConflictKind::from_status(xy) {
                entries.push(ConflictEntry {
                    path: path.to_string(),
                    kind,
                });
            } else if xy.contains(['R', 'C']) {
                fields.next();
            }
        }

        ConflictSet { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConflictEntry> {
        self.entries.iter()
    }

    pub fn paths(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.path.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a ConflictSet {
    type Item = &'a ConflictEntry;
    type IntoIter = std::slice::Iter<'a, ConflictEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Whether `content` still carries merge conflict markers.
///
/// A marker is a line starting with `<<<<<<<` or `>>>>>>>`, or a line that is
/// exactly `=======`.
pub fn has_conflict_markers(content: &str) -> bool {
    content.lines().any(|line| {
        let line = line.trim_end_matches('\r');
        line.starts_with("<<<<<<<") || line.starts_with(">>>>>>>") || line == "======="
    })
}

/// Read `path` and check it for conflict markers. Non-UTF-8 bytes are
/// replaced before scanning.
pub fn file_has_conflict_markers(path: &Path) -> Result<bool> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(has_conflict_markers(&String::from_utf8_lossy(&bytes)))
}
