// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Resource space: relative resources looked up across directory and
//! archive roots instead of the filesystem search path.

use crate::archive::{ArchiveHandle, normalize_entry};
use crate::unit::Origin;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Scheme prefix of resource-space locators
pub const RESOURCE_SCHEME: &str = "resource:";

/// Strip the resource scheme (and a following `/`) from a locator
pub fn strip_scheme(name: &str) -> Option<&str> {
    name.strip_prefix(RESOURCE_SCHEME)
        .map(|rest| rest.trim_start_matches('/'))
}

/// One root of the resource space
#[derive(Debug, Clone)]
pub enum ResourceRoot {
    /// A directory on the filesystem
    Directory(PathBuf),
    /// An archive merged into the space
    Archive(Arc<ArchiveHandle>),
}

/// Ordered, append-only list of resource roots
#[derive(Debug, Default)]
pub struct ResourceSpace {
    roots: RwLock<Vec<ResourceRoot>>,
}

impl ResourceSpace {
    /// Create a space from directory roots
    pub fn new(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: RwLock::new(dirs.into_iter().map(ResourceRoot::Directory).collect()),
        }
    }

    /// Add a directory root
    pub fn add_directory(&self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        let mut roots = self.roots.write();
        let present = roots
            .iter()
            .any(|root| matches!(root, ResourceRoot::Directory(d) if d == &dir));
        if !present {
            roots.push(ResourceRoot::Directory(dir));
        }
    }

    /// Merge an archive into the space. Returns false if it was already merged.
    pub fn merge_archive(&self, handle: Arc<ArchiveHandle>) -> bool {
        let mut roots = self.roots.write();
        let present = roots.iter().any(
            |root| matches!(root, ResourceRoot::Archive(a) if a.path() == handle.path()),
        );
        if present {
            return false;
        }
        debug!("Merged archive {} into resource space", handle.path().display());
        roots.push(ResourceRoot::Archive(handle));
        true
    }

    /// Whether an archive at `path` has been merged
    pub fn has_archive(&self, path: &Path) -> bool {
        self.roots
            .read()
            .iter()
            .any(|root| matches!(root, ResourceRoot::Archive(a) if a.path() == path))
    }

    /// Find the first root holding the relative resource `name`
    pub fn find(&self, name: &str) -> Option<Origin> {
        let name = strip_scheme(name).unwrap_or(name);
        if name.is_empty() || name.starts_with('/') || name.chars().nth(1) == Some(':') {
            return None;
        }
        let entry = normalize_entry(name);

        for root in self.roots.read().iter() {
            match root {
                ResourceRoot::Directory(dir) => {
                    let path = dir.join(&entry);
                    if path.is_file() {
                        return Some(Origin::File(path));
                    }
                }
                ResourceRoot::Archive(handle) => {
                    if handle.contains(&entry) {
                        return Some(Origin::Archive {
                            handle: Arc::clone(handle),
                            entry,
                        });
                    }
                }
            }
        }
        None
    }

    /// Number of roots
    pub fn len(&self) -> usize {
        self.roots.read().len()
    }

    /// Whether the space has no roots
    pub fn is_empty(&self) -> bool {
        self.roots.read().is_empty()
    }
}
