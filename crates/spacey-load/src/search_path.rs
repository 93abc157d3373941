// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Ordered, de-duplicated search path

use crate::config::{LIB_ENV_VAR, LoadConfig};
use parking_lot::Mutex;

/// How a search path entry is probed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory on the filesystem
    Directory,
    /// A path inside (or naming) an archive file
    Archive,
    /// A path in the resource space
    Resource,
}

impl EntryKind {
    /// Classify an entry string
    pub fn of(entry: &str) -> Self {
        if entry.starts_with(crate::resource::RESOURCE_SCHEME) {
            Self::Resource
        } else if crate::archive::looks_like_archive_entry(entry) {
            Self::Archive
        } else {
            Self::Directory
        }
    }
}

/// Append-only list of search path entries
#[derive(Debug, Default)]
pub struct SearchPath {
    entries: Mutex<Vec<String>>,
}

impl SearchPath {
    /// Create an empty search path
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a search path from configuration.
    ///
    /// Order: prepended dirs, `SPACEYLIB`, the standard library dirs (added
    /// whether they exist or not), then extra dirs.
    pub fn seeded(config: &LoadConfig) -> Self {
        let path = Self::new();
        path.append(&config.prepend_paths);

        if config.use_lib_env {
            if let Some(lib) = std::env::var_os(LIB_ENV_VAR) {
                let entries: Vec<String> = std::env::split_paths(&lib)
                    .map(|p| p.display().to_string())
                    .collect();
                path.append(&entries);
            }
        }

        path.append(&config.standard_dirs());
        path.append(&config.extra_paths);
        path
    }

    /// Append entries, skipping empty strings and entries already present
    pub fn append<S: AsRef<str>>(&self, entries: &[S]) {
        let mut list = self.entries.lock();
        for entry in entries {
            let entry = entry.as_ref();
            if entry.is_empty() {
                continue;
            }
            let entry = entry.replace('\\', "/");
            if !list.contains(&entry) {
                list.push(entry);
            }
        }
    }

    /// Copy of the current entries
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the path has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_dedups() {
        let path = SearchPath::new();
        path.append(&["./libs", "/opt/lib"]);
        path.append(&["./libs"]);
        assert_eq!(path.len(), 2);
        assert_eq!(path.snapshot(), vec!["./libs", "/opt/lib"]);
    }

    #[test]
    fn test_append_normalizes_and_skips_empty() {
        let path = SearchPath::new();
        path.append(&["", "c:\\lib", "c:/lib"]);
        assert_eq!(path.snapshot(), vec!["c:/lib"]);
    }

    #[test]
    fn test_seeded_keeps_missing_standard_dirs() {
        let config = LoadConfig {
            home: Some("/does/not/exist".into()),
            prepend_paths: vec!["first".into()],
            extra_paths: vec!["last".into()],
            use_lib_env: false,
            ..LoadConfig::default()
        };
        let entries = SearchPath::seeded(&config).snapshot();
        assert_eq!(entries.first().map(String::as_str), Some("first"));
        assert_eq!(entries.last().map(String::as_str), Some("last"));
        assert_eq!(entries.len(), 5);
    }

    #[test]
    fn test_entry_kind() {
        assert_eq!(EntryKind::of("resource:gems"), EntryKind::Resource);
        assert_eq!(EntryKind::of("lib/bundle.archive"), EntryKind::Archive);
        assert_eq!(EntryKind::of("archive:lib/x!/inner"), EntryKind::Archive);
        assert_eq!(EntryKind::of("./libs"), EntryKind::Directory);
    }
}
