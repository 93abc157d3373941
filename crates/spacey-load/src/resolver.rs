// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Name resolution
//!
//! Search order, first match wins:
//! 1. a name that is itself an archive or resource locator
//! 2. the current directory
//! 3. the search path, trying every suffix on one entry before the next
//! 4. the resource space
//! 5. a registered extension derived from the name

use crate::archive::{self, ARCHIVE_SUFFIX, ArchiveCache};
use crate::canonical::{Canonicalizer, absolutize};
use crate::error::{LoadError, Result};
use crate::extension::ExtensionRegistry;
use crate::features::FeatureIndex;
use crate::resource::{self, ResourceSpace};
use crate::search_path::{EntryKind, SearchPath};
use crate::suffix::{COMPILED_SUFFIX, LoadMode, SuffixType, is_native, split_request};
use crate::unit::{
    ArchiveUnit, CompiledUnit, ExtensionUnit, Loadable, Origin, ResolvedUnit, SourceUnit,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Result of resolving a name
#[derive(Debug)]
pub enum Resolution {
    /// The name maps to a loadable unit
    Unit(ResolvedUnit),
    /// Require only: the name (or a suffix variant) is already a feature
    AlreadyLoaded,
}

/// A resource found by one of the probes
#[derive(Debug)]
struct Found {
    /// The candidate that matched, base plus suffix
    candidate: String,
    canonical: String,
    origin: Origin,
}

impl Found {
    fn is_archive(&self) -> bool {
        self.candidate.ends_with(ARCHIVE_SUFFIX)
    }
}

/// Borrowed view over the state resolution reads
pub struct Resolver<'a> {
    pub(crate) cwd: &'a Path,
    pub(crate) home: Option<PathBuf>,
    pub(crate) search_path: &'a SearchPath,
    pub(crate) archives: &'a ArchiveCache,
    pub(crate) features: &'a FeatureIndex,
    pub(crate) resources: &'a ResourceSpace,
    pub(crate) extensions: &'a ExtensionRegistry,
    pub(crate) canonicalizer: &'a Canonicalizer,
}

impl Resolver<'_> {
    /// Resolve `name` to a unit.
    ///
    /// Fails with [`LoadError::NotFound`] when nothing matches and with
    /// [`LoadError::Unsupported`] when the match is a native shared object.
    pub fn resolve(&self, name: &str, mode: LoadMode) -> Result<Resolution> {
        let (base, suffix_type) = split_request(name, mode);

        if mode == LoadMode::Require
            && suffix_type
                .suffixes()
                .iter()
                .any(|suffix| self.features.contains(&format!("{}{}", base, suffix)))
        {
            debug!("{} already loaded", name);
            return Ok(Resolution::AlreadyLoaded);
        }

        let found = self.search(base, suffix_type);

        if found.as_ref().is_none_or(Found::is_archive) {
            if let Some(unit) = self.find_extension(name, base, found.as_ref()) {
                return Ok(Resolution::Unit(unit));
            }
        }

        let found = found.ok_or_else(|| LoadError::not_found(name))?;
        let unit = self.into_unit(name, found)?;

        if mode == LoadMode::Require && self.features.contains(&unit.canonical) {
            return Ok(Resolution::AlreadyLoaded);
        }
        Ok(Resolution::Unit(unit))
    }

    fn search(&self, base: &str, suffix_type: SuffixType) -> Option<Found> {
        if archive::is_locator(base) {
            return self.probe_locator(base, suffix_type);
        }
        if resource::strip_scheme(base).is_some() {
            return suffix_type
                .suffixes()
                .iter()
                .find_map(|suffix| self.probe_resource(&format!("{}{}", base, suffix)));
        }

        if let Some(found) = self.probe_cwd(base, suffix_type) {
            return Some(found);
        }
        if is_explicit_path(base) {
            return None;
        }

        self.probe_search_path(base, suffix_type)
            .or_else(|| self.probe_resource_space(base, suffix_type))
    }

    /// `archive:<file>!/<entry>` requested directly
    fn probe_locator(&self, base: &str, suffix_type: SuffixType) -> Option<Found> {
        let (file, inner) = archive::split_locator(base);
        let archive_path = absolutize(self.cwd, Path::new(&file));
        let handle = self.archives.open(&archive_path).ok()?;

        suffix_type.suffixes().iter().find_map(|suffix| {
            let entry = format!("{}{}", inner, suffix);
            debug!("trying archive locator: {}!/{}", archive_path.display(), entry);
            handle.contains(&entry).then(|| Found {
                candidate: entry.clone(),
                canonical: archive::locator(handle.path(), &archive::normalize_entry(&entry)),
                origin: Origin::Archive {
                    handle: Arc::clone(&handle),
                    entry: archive::normalize_entry(&entry),
                },
            })
        })
    }

    /// The current directory, or `$HOME` for `~/` names
    fn probe_cwd(&self, base: &str, suffix_type: SuffixType) -> Option<Found> {
        let (root, relative) = match base.strip_prefix("~/") {
            Some(rest) => (self.home.clone()?, rest),
            None => (self.cwd.to_path_buf(), base),
        };

        suffix_type.suffixes().iter().find_map(|suffix| {
            let candidate = format!("{}{}", relative, suffix);
            self.probe_file(&root, &candidate)
        })
    }

    fn probe_search_path(&self, base: &str, suffix_type: SuffixType) -> Option<Found> {
        for entry in self.search_path.snapshot() {
            for suffix in suffix_type.suffixes() {
                let candidate = format!("{}{}", base, suffix);
                let found = match EntryKind::of(&entry) {
                    EntryKind::Archive => self.probe_archive_entry(&entry, &candidate),
                    EntryKind::Resource => self.probe_resource(&format!("{}/{}", entry, candidate)),
                    EntryKind::Directory => self.probe_file(&self.cwd.join(&entry), &candidate),
                };
                if found.is_some() {
                    return found;
                }
            }
        }
        None
    }

    /// Search path entries that look like resource locators, then the bare name
    fn probe_resource_space(&self, base: &str, suffix_type: SuffixType) -> Option<Found> {
        let entries: Vec<String> = self
            .search_path
            .snapshot()
            .into_iter()
            .filter(|entry| EntryKind::of(entry) == EntryKind::Resource)
            .collect();

        suffix_type.suffixes().iter().find_map(|suffix| {
            let candidate = format!("{}{}", base, suffix);
            entries
                .iter()
                .find_map(|entry| self.probe_resource(&format!("{}/{}", entry, candidate)))
                .or_else(|| self.probe_resource(&candidate))
        })
    }

    fn probe_file(&self, dir: &Path, candidate: &str) -> Option<Found> {
        let path = dir.join(candidate);
        debug!("trying file: {}", path.display());
        if !is_readable_file(&path) {
            return None;
        }
        debug!("found: {}", path.display());
        Some(Found {
            candidate: candidate.to_string(),
            canonical: self.canonicalizer.canonicalize(&path),
            origin: Origin::File(path),
        })
    }

    fn probe_archive_entry(&self, entry: &str, candidate: &str) -> Option<Found> {
        let (file, dir) = archive::split_locator(entry);
        let archive_path = absolutize(self.cwd, Path::new(&file));
        let handle = self.archives.open(&archive_path).ok()?;
        let inner = archive::join_entry(&dir, candidate);

        debug!("trying archive entry: {}!/{}", archive_path.display(), inner);
        handle.contains(&inner).then(|| Found {
            candidate: candidate.to_string(),
            canonical: archive::locator(handle.path(), &inner),
            origin: Origin::Archive {
                handle: Arc::clone(&handle),
                entry: inner,
            },
        })
    }

    fn probe_resource(&self, name: &str) -> Option<Found> {
        debug!("trying resource: {}", name);
        let origin = self.resources.find(name)?;
        let canonical = match &origin {
            Origin::File(path) => self.canonicalizer.canonicalize(path),
            Origin::Archive { .. } => origin.to_string(),
        };
        Some(Found {
            candidate: resource::strip_scheme(name).unwrap_or(name).to_string(),
            canonical,
            origin,
        })
    }

    /// Extension fallback. A matched archive is merged into the resource
    /// space only when an extension is found for it.
    fn find_extension(
        &self,
        requested: &str,
        base: &str,
        archive: Option<&Found>,
    ) -> Option<ResolvedUnit> {
        if base.is_empty() {
            return None;
        }

        let (identifier, factory) = self.extensions.find(base)?;
        debug!("found extension: {}", identifier);

        if let Some(found) = archive {
            match self.open_archive(found) {
                Ok(handle) => {
                    self.resources.merge_archive(handle);
                }
                Err(e) => debug!("could not merge {}: {}", found.canonical, e),
            }
        }

        // Every spelling that derives the same identifier shares one name
        let canonical = archive
            .map(|found| found.canonical.clone())
            .unwrap_or_else(|| format!("extension:{}", identifier));
        Some(ResolvedUnit {
            requested: requested.to_string(),
            canonical,
            short_name: None,
            loadable: Loadable::Extension(ExtensionUnit {
                identifier,
                factory,
            }),
        })
    }

    fn open_archive(&self, found: &Found) -> std::io::Result<Arc<archive::ArchiveHandle>> {
        match &found.origin {
            Origin::File(path) => self.archives.open(path),
            Origin::Archive { .. } => archive::ArchiveHandle::from_bytes(
                Path::new(&found.canonical),
                &found.origin.read()?,
            )
            .map(Arc::new),
        }
    }

    fn into_unit(&self, requested: &str, found: Found) -> Result<ResolvedUnit> {
        if is_native(&found.candidate) {
            return Err(LoadError::native_unsupported(found.canonical));
        }

        let name = found.canonical.clone();
        let loadable = if found.is_archive() {
            Loadable::Archive(ArchiveUnit {
                name,
                origin: found.origin,
            })
        } else if found.candidate.ends_with(COMPILED_SUFFIX) {
            Loadable::Compiled(CompiledUnit {
                name,
                origin: found.origin,
            })
        } else {
            Loadable::Source(SourceUnit {
                name,
                origin: found.origin,
            })
        };

        Ok(ResolvedUnit {
            requested: requested.to_string(),
            canonical: found.canonical,
            short_name: Some(found.candidate),
            loadable,
        })
    }
}

/// Names probed only against the current (or home) directory
fn is_explicit_path(name: &str) -> bool {
    name.starts_with("./")
        || name.starts_with("../")
        || name.starts_with("~/")
        || Path::new(name).is_absolute()
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && std::fs::File::open(path).is_ok()
}
