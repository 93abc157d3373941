// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Shared fixtures for the integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use spacey_load::{LoadConfig, LoadContext, LoadService, Result, Runtime};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Called when a source unit whose text is the hook key runs
pub type Hook = Arc<dyn Fn(&LoadContext<'_>) -> Result<()> + Send + Sync>;

/// Runtime that records which units ran and dispatches to per-unit hooks.
///
/// A source unit's text (trimmed) is its key.
#[derive(Default)]
pub struct MockRuntime {
    hooks: Mutex<HashMap<String, Hook>>,
    runs: Mutex<Vec<String>>,
}

impl MockRuntime {
    pub fn on<F>(&self, key: &str, hook: F)
    where
        F: Fn(&LoadContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.lock().insert(key.to_string(), Arc::new(hook));
    }

    /// How many times the unit keyed `key` ran
    pub fn runs(&self, key: &str) -> usize {
        self.runs.lock().iter().filter(|k| *k == key).count()
    }

    pub fn run_order(&self) -> Vec<String> {
        self.runs.lock().clone()
    }
}

impl Runtime for MockRuntime {
    fn eval_source(&self, ctx: &LoadContext<'_>, _name: &str, source: &str) -> Result<()> {
        let key = source.trim().to_string();
        self.runs.lock().push(key.clone());
        // Clone out so hooks can require recursively.
        let hook = self.hooks.lock().get(&key).cloned();
        match hook {
            Some(hook) => hook(ctx),
            None => Ok(()),
        }
    }
}

/// A temporary working directory with a load service rooted in it
pub struct Fixture {
    pub dir: TempDir,
    pub runtime: Arc<MockRuntime>,
    pub service: LoadService,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(configure: impl FnOnce(&mut LoadConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("work")).unwrap();

        let mut config = LoadConfig {
            cwd: dir.path().join("work"),
            home: Some(dir.path().join("home")),
            use_lib_env: false,
            ..LoadConfig::default()
        };
        configure(&mut config);

        let runtime = Arc::new(MockRuntime::default());
        let service = LoadService::new(config, runtime.clone());
        Self {
            dir,
            runtime,
            service,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn work(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    /// Write a file relative to the temp root
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Write a tar archive relative to the temp root
    pub fn write_archive(&self, rel: &str, files: &[(&str, &str)]) -> PathBuf {
        let path = self.dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut builder = tar::Builder::new(file);
        for (name, body) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, body.as_bytes()).unwrap();
        }
        builder.finish().unwrap();
        path
    }

    /// Canonical name `name` resolves to
    pub fn canonical(&self, name: &str) -> String {
        match self
            .service
            .resolve(name, spacey_load::LoadMode::Require)
            .unwrap()
        {
            spacey_load::Resolution::Unit(unit) => unit.canonical,
            spacey_load::Resolution::AlreadyLoaded => panic!("{} already loaded", name),
        }
    }

    /// Block until `count` executors wait on `canonical`
    pub fn wait_for_waiters(&self, canonical: &str, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while self.service.lock_pool().waiting_on(canonical) < count {
            assert!(Instant::now() < deadline, "timed out waiting for waiters");
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

/// Generous bound for cross-thread handshakes
pub const HANDSHAKE: Duration = Duration::from_secs(10);
