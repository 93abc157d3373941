// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The host runtime that executes loaded units

use crate::archive::ArchiveHandle;
use crate::error::{LoadError, Result};
use crate::executor::Executor;
use crate::service::LoadService;

/// Executes units on behalf of the load service.
///
/// Errors returned from these methods are classified by the lock pool:
/// [`LoadError::Raised`] lets a waiting executor retry the load, while
/// definitive failures such as [`LoadError::NotFound`] end it for everyone.
pub trait Runtime: Send + Sync {
    /// Execute source text
    fn eval_source(&self, ctx: &LoadContext<'_>, name: &str, source: &str) -> Result<()>;

    /// Execute precompiled code
    fn run_compiled(&self, _ctx: &LoadContext<'_>, name: &str, _code: &[u8]) -> Result<()> {
        Err(LoadError::Unsupported {
            kind: "compiled units".to_string(),
            name: name.to_string(),
        })
    }

    /// Called after an archive unit was merged into the resource space
    fn archive_loaded(&self, _ctx: &LoadContext<'_>, _archive: &ArchiveHandle) -> Result<()> {
        Ok(())
    }
}

/// What a unit sees while it is being loaded
#[derive(Clone, Copy)]
pub struct LoadContext<'a> {
    service: &'a LoadService,
    executor: &'a Executor,
    isolate: bool,
}

impl<'a> LoadContext<'a> {
    pub(crate) fn new(service: &'a LoadService, executor: &'a Executor, isolate: bool) -> Self {
        Self {
            service,
            executor,
            isolate,
        }
    }

    /// The load service running this unit
    pub fn service(&self) -> &'a LoadService {
        self.service
    }

    /// The executor running this unit
    pub fn executor(&self) -> &'a Executor {
        self.executor
    }

    /// Whether the unit should run in an isolated top-level scope
    pub fn isolate(&self) -> bool {
        self.isolate
    }

    /// The host runtime
    pub fn runtime(&self) -> &'a dyn Runtime {
        self.service.runtime()
    }

    /// Require another name on the same executor
    pub fn require(&self, name: &str) -> Result<bool> {
        self.service.require(self.executor, name)
    }

    /// Load another name on the same executor
    pub fn load(&self, name: &str, isolate: bool) -> Result<()> {
        self.service.load(self.executor, name, isolate)
    }
}
