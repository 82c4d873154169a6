//! Snapshot comparison
//!
//! [`detect_changes`] groups both snapshots by `(kind, owner name)` and
//! reports, per group, whole groups that appeared or vanished and individual
//! values that were added or removed. A changed value is always reported as a
//! `REMOVED` + `ADDED` pair.

use std::collections::BTreeSet;
use std::fmt;

use crate::record::{RecordKind, Snapshot};

/// Kind of change found between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeTag {
    /// Value added to an existing group
    Added,
    /// Whole group disappeared
    Deleted,
    /// Whole group appeared
    New,
    /// Value removed from an existing group
    Removed,
}

impl ChangeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTag::Added => "ADDED",
            ChangeTag::Deleted => "DELETED",
            ChangeTag::New => "NEW",
            ChangeTag::Removed => "REMOVED",
        }
    }

    /// The tag reported when the two snapshots are swapped
    pub fn inverse(self) -> Self {
        match self {
            ChangeTag::Added => ChangeTag::Removed,
            ChangeTag::Removed => ChangeTag::Added,
            ChangeTag::New => ChangeTag::Deleted,
            ChangeTag::Deleted => ChangeTag::New,
        }
    }
}

impl fmt::Display for ChangeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected change, rendered as `TAG: <kind> <owner> -> <value>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Change {
    pub tag: ChangeTag,
    pub kind: RecordKind,
    pub name: String,
    pub value: String,
}

impl Change {
    fn new(tag: ChangeTag, kind: &RecordKind, name: &str, value: &str) -> Self {
        Self {
            tag,
            kind: kind.clone(),
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} -> {}",
            self.tag, self.kind, self.name, self.value
        )
    }
}

/// Compare `old` against `new`
///
/// The result is sorted by its rendered text, so it does not depend on the
/// order of records in either snapshot. Duplicate values inside a group are
/// treated as one.
pub fn detect_changes(old: &Snapshot, new: &Snapshot) -> Vec<Change> {
    let old_groups = old.grouped();
    let new_groups = new.grouped();
    let mut changes = Vec::new();

    for (key, new_records) in &new_groups {
        let new_values: BTreeSet<&str> = new_records.iter().map(|r| r.value()).collect();

        match old_groups.get(key) {
            None => {
                changes.extend(
                    new_values
                        .iter()
                        .map(|v| Change::new(ChangeTag::New, key.kind, key.name, v)),
                );
            }
            Some(old_records) => {
                let old_values: BTreeSet<&str> =
                    old_records.iter().map(|r| r.value()).collect();

                changes.extend(
                    new_values
                        .difference(&old_values)
                        .map(|v| Change::new(ChangeTag::Added, key.kind, key.name, v)),
                );
                changes.extend(
                    old_values
                        .difference(&new_values)
                        .map(|v| Change::new(ChangeTag::Removed, key.kind, key.name, v)),
                );
            }
        }
    }

    for (key, old_records) in &old_groups {
        if new_groups.contains_key(key) {
            continue;
        }
        let old_values: BTreeSet<&str> = old_records.iter().map(|r| r.value()).collect();
        changes.extend(
            old_values
                .iter()
                .map(|v| Change::new(ChangeTag::Deleted, key.kind, key.name, v)),
        );
    }

    changes.sort_by_cached_key(|c| c.to_string());
    changes
}
