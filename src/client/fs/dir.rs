use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::{protocol::FactMap, utils};

/// Kind of a remote entry as reported by the `type` fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    /// Any other reported type, kept verbatim (`cdir`, `os.unix=slink`, ...)
    Other(String),
}

impl EntryKind {
    pub fn from_fact(value: Option<&str>) -> Self {
        match value {
            Some("file") => Self::File,
            Some("dir") => Self::Directory,
            Some(other) => Self::Other(other.to_owned()),
            None => Self::Other(String::new()),
        }
    }

    /// `cdir` / `pdir`: the listed directory itself or its parent
    pub fn is_self_or_parent(&self) -> bool {
        matches!(self, Self::Other(kind) if kind == "cdir" || kind == "pdir")
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Directory => f.write_str("dir"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

/// Entries returned by a structured listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: Option<u64>,
    /// Raw `modify` fact, see [`DirectoryEntry::modified`]
    pub modify: Option<String>,
}

impl DirectoryEntry {
    pub fn from_facts(name: String, facts: &FactMap) -> Self {
        let kind = EntryKind::from_fact(facts.get("type").map(String::as_str));
        let size = match kind {
            EntryKind::Directory => None,
            _ => facts.get("size").and_then(|s| s.parse().ok()),
        };

        Self {
            name,
            kind,
            size,
            modify: facts.get("modify").cloned(),
        }
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Returns the last modification time, if the server reported a
    /// parseable one
    #[must_use]
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modify.as_deref().and_then(utils::parse_modify)
    }
}

/// Ordered entries of one directory, in the order the server sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    entries: Vec<DirectoryEntry>,
}

impl Listing {
    /// Builds a listing from raw facts, dropping `cdir`/`pdir` entries.
    pub fn from_facts(raw: Vec<(String, FactMap)>) -> Self {
        Self {
            entries: raw
                .into_iter()
                .map(|(name, facts)| DirectoryEntry::from_facts(name, &facts))
                .filter(|entry| !entry.kind.is_self_or_parent())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DirectoryEntry> {
        self.entries.iter()
    }
}

impl IntoIterator for Listing {
    type Item = DirectoryEntry;
    type IntoIter = std::vec::IntoIter<DirectoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Listing {
    type Item = &'a DirectoryEntry;
    type IntoIter = std::slice::Iter<'a, DirectoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
