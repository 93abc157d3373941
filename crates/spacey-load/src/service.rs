// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The load service
//!
//! One [`LoadService`] per runtime instance owns the search path, the
//! loaded feature index, the archive cache and the per-name lock pool.
//! `require` resolves a name, takes the lock for its canonical name and
//! runs the unit at most once; `load` resolves and always runs.

use crate::archive::{ARCHIVE_SUFFIX, ArchiveCache};
use crate::canonical::Canonicalizer;
use crate::config::LoadConfig;
use crate::error::{LoadError, Result};
use crate::executor::Executor;
use crate::extension::{ExtensionNaming, ExtensionRegistry};
use crate::features::FeatureIndex;
use crate::lock_pool::{Acquired, LockPool};
use crate::policy::{AllowAll, DenyList, LoadPolicy};
use crate::resolver::{Resolution, Resolver};
use crate::resource::{RESOURCE_SCHEME, ResourceSpace};
use crate::runtime::{LoadContext, Runtime};
use crate::search_path::SearchPath;
use crate::suffix::LoadMode;
use crate::timer::LoadTimer;
use crate::unit::{Loadable, Origin, ResolvedUnit, SourceUnit};
use std::sync::Arc;
use tracing::{debug, warn};

/// Require/load coordinator for one runtime instance
pub struct LoadService {
    config: LoadConfig,
    runtime: Arc<dyn Runtime>,
    policy: Box<dyn LoadPolicy>,
    search_path: SearchPath,
    features: FeatureIndex,
    archives: ArchiveCache,
    resources: ResourceSpace,
    extensions: ExtensionRegistry,
    canonicalizer: Canonicalizer,
    locks: LockPool,
    timer: LoadTimer,
}

impl LoadService {
    /// Create a service, seeding the search path from `config`.
    ///
    /// A non-empty `config.denied` installs a [`DenyList`] policy.
    pub fn new(config: LoadConfig, runtime: Arc<dyn Runtime>) -> Self {
        let policy: Box<dyn LoadPolicy> = if config.denied.is_empty() {
            Box::new(AllowAll)
        } else {
            Box::new(DenyList::new(config.denied.iter().cloned()))
        };

        Self {
            search_path: SearchPath::seeded(&config),
            resources: ResourceSpace::new(config.resource_roots.iter().cloned()),
            canonicalizer: Canonicalizer::new(config.cwd.clone()),
            timer: LoadTimer::new(config.debug_load_timings),
            features: FeatureIndex::new(),
            archives: ArchiveCache::new(),
            extensions: ExtensionRegistry::new(),
            locks: LockPool::new(),
            policy,
            runtime,
            config,
        }
    }

    /// Replace the policy hook
    pub fn with_policy(mut self, policy: impl LoadPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Replace the extension naming policy. Registered factories are dropped.
    pub fn with_extension_naming(mut self, naming: impl ExtensionNaming + 'static) -> Self {
        self.extensions = ExtensionRegistry::with_naming(naming);
        self
    }

    /// The host runtime
    pub fn runtime(&self) -> &dyn Runtime {
        self.runtime.as_ref()
    }

    /// Configuration this service was built from
    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// The search path
    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// The loaded feature index
    pub fn features(&self) -> &FeatureIndex {
        &self.features
    }

    /// Opened archives
    pub fn archives(&self) -> &ArchiveCache {
        &self.archives
    }

    /// The resource space
    pub fn resources(&self) -> &ResourceSpace {
        &self.resources
    }

    /// Registered extensions
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// The per-name lock pool
    pub fn lock_pool(&self) -> &LockPool {
        &self.locks
    }

    /// Resolve `name` without loading it
    pub fn resolve(&self, name: &str, mode: LoadMode) -> Result<Resolution> {
        let resolver = Resolver {
            cwd: &self.config.cwd,
            home: dirs::home_dir(),
            search_path: &self.search_path,
            archives: &self.archives,
            features: &self.features,
            resources: &self.resources,
            extensions: &self.extensions,
            canonicalizer: &self.canonicalizer,
        };
        resolver.resolve(name, mode)
    }

    /// Require `name`: load it unless it is already loaded.
    ///
    /// Returns `true` only when this call loaded the unit. A reentrant
    /// require from the executor already loading the same name returns
    /// `false`, as does a waiter whose owner finished the load.
    pub fn require(&self, executor: &Executor, name: &str) -> Result<bool> {
        self.check_request(name, LoadMode::Require)?;

        let unit = match self.resolve(name, LoadMode::Require)? {
            Resolution::AlreadyLoaded => return Ok(false),
            Resolution::Unit(unit) => unit,
        };
        let canonical = unit.canonical.clone();

        let acquired = self.locks.acquire(executor, &canonical, || {
            if self.features.contains(&unit.canonical) {
                return Ok(false);
            }
            let _timing = self.timer.start(&unit.canonical);
            self.execute(executor, &unit, false)?;

            self.features.provide(&unit.canonical);
            if let Some(short) = &unit.short_name {
                self.features.alias(short, &unit.canonical);
            }
            Ok(true)
        })?;

        Ok(match acquired {
            Acquired::Ran(loaded) => loaded,
            Acquired::Reentrant => {
                if self.config.verbose {
                    warn!(
                        "loading in progress, circular require considered harmful - {}",
                        canonical
                    );
                }
                false
            }
            Acquired::AlreadyResolved => false,
        })
    }

    /// Load `name`, running it even when it was loaded before.
    ///
    /// Falls back to the name relative to the current directory as a
    /// source unit when nothing else matches.
    pub fn load(&self, executor: &Executor, name: &str, isolate: bool) -> Result<()> {
        self.check_request(name, LoadMode::Load)?;

        let unit = match self.resolve(name, LoadMode::Load) {
            Ok(Resolution::Unit(unit)) => unit,
            Ok(Resolution::AlreadyLoaded) => return Ok(()),
            Err(LoadError::NotFound(missing)) => {
                self.last_chance(name).ok_or(LoadError::NotFound(missing))?
            }
            Err(err) => return Err(err),
        };

        let _timing = self.timer.start(&unit.canonical);
        self.execute(executor, &unit, isolate)
    }

    /// Load a unit found directly in the resource space
    pub fn load_resource(&self, executor: &Executor, name: &str, isolate: bool) -> Result<()> {
        self.check_request(name, LoadMode::Load)?;

        let scoped = format!("{}{}", RESOURCE_SCHEME, name);
        match self.resolve(&scoped, LoadMode::Load) {
            Ok(Resolution::Unit(unit)) => self.execute(executor, &unit, isolate),
            Ok(Resolution::AlreadyLoaded) => Ok(()),
            Err(LoadError::NotFound(_)) => Err(LoadError::not_found(name)),
            Err(err) => Err(err),
        }
    }

    /// Mark `name` as loaded without running anything.
    ///
    /// Returns `false` when it was already loaded.
    pub fn provide(&self, name: &str) -> bool {
        self.features.provide(name)
    }

    /// Forget a loaded feature and its aliases
    pub fn unregister(&self, name: &str) -> bool {
        self.features.unregister(name)
    }

    /// Whether `name` is a loaded feature or an alias of one
    pub fn feature_already_loaded(&self, name: &str) -> bool {
        self.features.contains(name)
    }

    /// Loaded features in load order
    pub fn loaded_features(&self) -> Vec<String> {
        self.features.snapshot()
    }

    fn check_request(&self, name: &str, mode: LoadMode) -> Result<()> {
        if name.is_empty() {
            return Err(LoadError::not_found(name));
        }
        if !self.policy.allow(name, mode) {
            debug!("policy refused {}", name);
            return Err(LoadError::not_found(name));
        }
        Ok(())
    }

    fn last_chance(&self, name: &str) -> Option<ResolvedUnit> {
        let path = self.config.cwd.join(name);
        if !path.is_file() {
            return None;
        }
        debug!("found on last chance: {}", path.display());
        let canonical = self.canonicalizer.canonicalize(&path);
        Some(ResolvedUnit {
            requested: name.to_string(),
            canonical: canonical.clone(),
            short_name: None,
            loadable: Loadable::Source(SourceUnit {
                name: canonical,
                origin: Origin::File(path),
            }),
        })
    }

    fn execute(&self, executor: &Executor, unit: &ResolvedUnit, isolate: bool) -> Result<()> {
        debug!("loading {} {}", unit.loadable.kind(), unit.canonical);
        let ctx = LoadContext::new(self, executor, isolate);

        match &unit.loadable {
            Loadable::Archive(archive) => match archive.load(&ctx) {
                Err(err) if !err.is_fatal() && unit.requested.ends_with(ARCHIVE_SUFFIX) => {
                    debug!("ignoring error in explicit archive {}: {}", unit.canonical, err);
                    Ok(())
                }
                result => result,
            },
            Loadable::Source(source) => source.load(&ctx),
            Loadable::Compiled(compiled) => compiled.load(&ctx),
            Loadable::Extension(extension) => extension.load(&ctx),
        }
    }
}

impl std::fmt::Debug for LoadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadService")
            .field("search_path", &self.search_path)
            .field("features", &self.features.len())
            .field("archives", &self.archives.len())
            .field("locks", &self.locks.len())
            .finish()
    }
}
