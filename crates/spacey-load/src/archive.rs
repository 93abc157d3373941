// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Archive handles, locators and the process-lifetime archive cache
//!
//! Archives are tar files, optionally gzip-compressed. A locator names an
//! entry inside one: `archive:/path/to/bundle.archive!/lib/foo.src`.

use dashmap::DashMap;
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tar::Archive;
use tracing::debug;

/// Scheme prefix of archive locators
pub const ARCHIVE_SCHEME: &str = "archive:";

/// File suffix of archives
pub const ARCHIVE_SUFFIX: &str = ".archive";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Whether a search path entry should be probed as an archive
pub fn looks_like_archive_entry(entry: &str) -> bool {
    entry.starts_with(ARCHIVE_SCHEME)
        || entry.ends_with(ARCHIVE_SUFFIX)
        || (entry.starts_with("file:") && entry.contains('!'))
        || entry.contains("!/")
}

/// Whether a requested name is itself a fully-qualified archive locator
pub fn is_locator(name: &str) -> bool {
    name.starts_with(ARCHIVE_SCHEME) || name.contains("!/")
}

/// Split a locator or archive entry into the archive file and the inner path
pub fn split_locator(locator: &str) -> (String, String) {
    let unprefixed = locator.strip_prefix(ARCHIVE_SCHEME).unwrap_or(locator);
    let unprefixed = unprefixed.strip_prefix("file:").unwrap_or(unprefixed);

    match unprefixed.find('!') {
        Some(idx) => {
            let file = &unprefixed[..idx];
            let rest = &unprefixed[idx + 1..];
            (file.to_string(), normalize_entry(rest))
        }
        None => (unprefixed.to_string(), String::new()),
    }
}

/// Resolve `.` and `..` segments of an inner path and drop leading slashes
pub fn normalize_entry(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Join an archive-relative directory and a candidate name
pub fn join_entry(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        normalize_entry(name)
    } else {
        normalize_entry(&format!("{}/{}", dir, name))
    }
}

/// Canonical locator for an entry of an archive
pub fn locator(archive: &Path, entry: &str) -> String {
    format!("{}{}!/{}", ARCHIVE_SCHEME, archive.display(), entry)
}

/// An opened archive with its file entries read into memory
#[derive(Debug)]
pub struct ArchiveHandle {
    path: PathBuf,
    files: HashMap<String, Vec<u8>>,
}

impl ArchiveHandle {
    /// Open and index an archive file
    pub fn open(path: &Path) -> io::Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(path, &data)
    }

    /// Index archive bytes that were read from `path`
    pub fn from_bytes(path: &Path, data: &[u8]) -> io::Result<Self> {
        let mut handle = Self {
            path: path.to_path_buf(),
            files: HashMap::new(),
        };

        if data.starts_with(&GZIP_MAGIC) {
            handle.index(GzDecoder::new(data))?;
        } else {
            handle.index(data)?;
        }

        debug!(
            "Opened archive {} ({} files)",
            path.display(),
            handle.files.len()
        );
        Ok(handle)
    }

    fn index<R: Read>(&mut self, reader: R) -> io::Result<()> {
        let mut archive = Archive::new(reader);
        for entry in archive.entries()? {
            let mut entry = entry?;
            let name = normalize_entry(&entry.path()?.to_string_lossy().replace('\\', "/"));
            if name.is_empty() {
                continue;
            }

            if entry.header().entry_type().is_file() {
                let mut contents = Vec::new();
                entry.read_to_end(&mut contents)?;
                self.files.insert(name, contents);
            }
        }
        Ok(())
    }

    /// Filesystem path of the archive
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the archive holds a file at `entry`
    pub fn contains(&self, entry: &str) -> bool {
        self.files.contains_key(&normalize_entry(entry))
    }

    /// Contents of a file entry
    pub fn read(&self, entry: &str) -> Option<&[u8]> {
        self.files.get(&normalize_entry(entry)).map(Vec::as_slice)
    }

    /// Number of file entries
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the archive has no file entries
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Archive handles keyed by archive path, kept for the service lifetime.
///
/// Failed opens are not remembered; every miss tries again.
#[derive(Debug, Default)]
pub struct ArchiveCache {
    handles: DashMap<PathBuf, Arc<ArchiveHandle>>,
}

impl ArchiveCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached handle or open the archive
    pub fn open(&self, path: &Path) -> io::Result<Arc<ArchiveHandle>> {
        if let Some(handle) = self.handles.get(path) {
            return Ok(Arc::clone(handle.value()));
        }

        let handle = match ArchiveHandle::open(path) {
            Ok(handle) => Arc::new(handle),
            Err(e) => {
                debug!("Could not open archive {}: {}", path.display(), e);
                return Err(e);
            }
        };

        Ok(Arc::clone(
            self.handles
                .entry(path.to_path_buf())
                .or_insert(handle)
                .value(),
        ))
    }

    /// Whether a handle for `path` is cached
    pub fn contains(&self, path: &Path) -> bool {
        self.handles.contains_key(path)
    }

    /// Number of cached handles
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
