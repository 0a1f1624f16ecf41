// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printable-file listing for a folder, with the sort and search options the
// front-ends offer.

use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, instrument};

use stapeldruck_core::error::{Result, StapeldruckError};
use stapeldruck_core::types::is_supported_extension;

/// A printable file found in a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    /// Lowercase, without the dot.
    pub extension: String,
    /// Bytes.
    pub size: u64,
}

/// List regular files directly inside `dir` with a printable extension.
///
/// Not recursive.  Entries come back sorted by name, ascending.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn list_printable_files(dir: &Path) -> Result<Vec<FileEntry>> {
    if dir.as_os_str().is_empty() {
        return Err(StapeldruckError::NoFolderSelected);
    }

    let mut entries = Vec::new();
    for item in fs::read_dir(dir)? {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                debug!(error = %e, "unreadable directory entry skipped");
                continue;
            }
        };
        let path = item.path();
        // Follows symlinks, so a linked document is listed like the file itself.
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "entry skipped");
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }

        let Some(extension) = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .filter(|e| is_supported_extension(e))
        else {
            continue;
        };

        entries.push(FileEntry {
            name: item.file_name().to_string_lossy().into_owned(),
            path,
            extension,
            size: meta.len(),
        });
    }

    sort_entries(&mut entries, SortOrder::NameAsc);
    debug!(count = entries.len(), "printable files listed");
    Ok(entries)
}

/// File list ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NameAsc,
    NameDesc,
    TypeAsc,
    TypeDesc,
    SizeAsc,
    SizeDesc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 6] = [
        Self::NameAsc,
        Self::NameDesc,
        Self::TypeAsc,
        Self::TypeDesc,
        Self::SizeAsc,
        Self::SizeDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
            Self::TypeAsc => "type-asc",
            Self::TypeDesc => "type-desc",
            Self::SizeAsc => "size-asc",
            Self::SizeDesc => "size-desc",
        }
    }

    fn compare(&self, a: &FileEntry, b: &FileEntry) -> Ordering {
        match self {
            Self::NameAsc => name_key(a).cmp(&name_key(b)),
            Self::NameDesc => name_key(b).cmp(&name_key(a)),
            Self::TypeAsc => a.extension.cmp(&b.extension),
            Self::TypeDesc => b.extension.cmp(&a.extension),
            Self::SizeAsc => a.size.cmp(&b.size),
            Self::SizeDesc => b.size.cmp(&a.size),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = StapeldruckError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StapeldruckError::InvalidSetting(format!("unknown sort order '{s}'")))
    }
}

fn name_key(entry: &FileEntry) -> String {
    entry.name.to_lowercase()
}

/// Stable sort, so equal keys keep their previous order.
pub fn sort_entries(entries: &mut [FileEntry], order: SortOrder) {
    entries.sort_by(|a, b| order.compare(a, b));
}

/// Entries whose name contains `query`, ignoring case.  An empty query keeps
/// everything.
pub fn filter_by_name<'a>(entries: &'a [FileEntry], query: &str) -> Vec<&'a FileEntry> {
    let needle = query.trim().to_lowercase();
    entries
        .iter()
        .filter(|e| needle.is_empty() || e.name.to_lowercase().contains(&needle))
        .collect()
}
