// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loadable units produced by resolution

use crate::archive::{ArchiveHandle, locator};
use crate::error::{LoadError, Result};
use crate::extension::ExtensionFactory;
use crate::runtime::LoadContext;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Where a unit's bytes live
#[derive(Debug, Clone)]
pub enum Origin {
    /// A file on disk
    File(PathBuf),
    /// A file entry inside an opened archive
    Archive {
        /// The archive holding the entry
        handle: Arc<ArchiveHandle>,
        /// Normalized entry path
        entry: String,
    },
}

impl Origin {
    /// Read the unit's bytes
    pub fn read(&self) -> io::Result<Vec<u8>> {
        match self {
            Origin::File(path) => std::fs::read(path),
            Origin::Archive { handle, entry } => handle
                .read(entry)
                .map(<[u8]>::to_vec)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, self.to_string())),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::File(path) => write!(f, "{}", path.display()),
            Origin::Archive { handle, entry } => write!(f, "{}", locator(handle.path(), entry)),
        }
    }
}

/// Source text executed by the runtime
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Canonical name
    pub name: String,
    /// Location of the source
    pub origin: Origin,
}

impl SourceUnit {
    pub(crate) fn load(&self, ctx: &LoadContext<'_>) -> Result<()> {
        let bytes = self.origin.read().map_err(|cause| self.failed(cause))?;
        let source = String::from_utf8(bytes)
            .map_err(|e| self.failed(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        ctx.runtime().eval_source(ctx, &self.name, &source)
    }

    fn failed(&self, cause: io::Error) -> LoadError {
        LoadError::LoadFailed {
            name: self.name.clone(),
            cause,
        }
    }
}

/// An archive whose entries become resources once loaded
#[derive(Debug, Clone)]
pub struct ArchiveUnit {
    /// Canonical name
    pub name: String,
    /// Location of the archive file
    pub origin: Origin,
}

impl ArchiveUnit {
    pub(crate) fn load(&self, ctx: &LoadContext<'_>) -> Result<()> {
        let service = ctx.service();
        let handle = match &self.origin {
            Origin::File(path) => service.archives().open(path),
            Origin::Archive { .. } => self
                .origin
                .read()
                .and_then(|bytes| {
                    ArchiveHandle::from_bytes(std::path::Path::new(&self.name), &bytes)
                })
                .map(Arc::new),
        }
        .map_err(|cause| LoadError::LoadFailed {
            name: self.name.clone(),
            cause,
        })?;

        service.resources().merge_archive(Arc::clone(&handle));
        ctx.runtime().archive_loaded(ctx, &handle)
    }
}

/// Precompiled code handed to the runtime as bytes
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    /// Canonical name
    pub name: String,
    /// Location of the compiled code
    pub origin: Origin,
}

impl CompiledUnit {
    pub(crate) fn load(&self, ctx: &LoadContext<'_>) -> Result<()> {
        let code = self.origin.read().map_err(|cause| LoadError::LoadFailed {
            name: self.name.clone(),
            cause,
        })?;
        ctx.runtime().run_compiled(ctx, &self.name, &code)
    }
}

/// An extension instantiated from the registry
#[derive(Clone)]
pub struct ExtensionUnit {
    /// Registered identifier
    pub identifier: String,
    /// Factory creating the extension
    pub factory: ExtensionFactory,
}

impl ExtensionUnit {
    pub(crate) fn load(&self, ctx: &LoadContext<'_>) -> Result<()> {
        let extension = (self.factory)().map_err(|cause| LoadError::Library {
            name: self.identifier.clone(),
            cause,
        })?;
        extension.load(ctx)
    }
}

impl fmt::Debug for ExtensionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionUnit")
            .field("identifier", &self.identifier)
            .finish()
    }
}

/// Anything that can be loaded into the runtime
#[derive(Debug, Clone)]
pub enum Loadable {
    /// Source text
    Source(SourceUnit),
    /// An archive
    Archive(ArchiveUnit),
    /// Precompiled code
    Compiled(CompiledUnit),
    /// A registered extension
    Extension(ExtensionUnit),
}

impl Loadable {
    /// Load the unit into the runtime
    pub fn load(&self, ctx: &LoadContext<'_>) -> Result<()> {
        match self {
            Loadable::Source(unit) => unit.load(ctx),
            Loadable::Archive(unit) => unit.load(ctx),
            Loadable::Compiled(unit) => unit.load(ctx),
            Loadable::Extension(unit) => unit.load(ctx),
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Loadable::Source(_) => "source",
            Loadable::Archive(_) => "archive",
            Loadable::Compiled(_) => "compiled",
            Loadable::Extension(_) => "extension",
        }
    }
}

/// A name resolved to exactly one loadable resource
#[derive(Debug, Clone)]
pub struct ResolvedUnit {
    /// Name as requested
    pub requested: String,
    /// Name used for locking and feature tracking
    pub canonical: String,
    /// Requested base plus the suffix that matched, kept as a feature alias
    pub short_name: Option<String>,
    /// The unit itself
    pub loadable: Loadable,
}
