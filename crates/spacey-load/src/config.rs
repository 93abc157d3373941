// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Load service configuration

use crate::error::{LoadError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding extra search path entries
pub const LIB_ENV_VAR: &str = "SPACEYLIB";

/// Environment variable overriding the runtime home
pub const HOME_ENV_VAR: &str = "SPACEY_HOME";

/// Configuration for a load service instance
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Current directory used for relative probes
    pub cwd: PathBuf,

    /// Runtime home; standard library directories live under it
    pub home: Option<PathBuf>,

    /// Directories placed first on the search path
    pub prepend_paths: Vec<String>,

    /// Directories appended after the standard ones
    pub extra_paths: Vec<String>,

    /// Initial resource space roots
    pub resource_roots: Vec<PathBuf>,

    /// Names the policy hook refuses
    pub denied: Vec<String>,

    /// Warn about circular requires
    pub verbose: bool,

    /// Trace nested load timings
    pub debug_load_timings: bool,

    /// Read `SPACEYLIB` when seeding the search path
    pub use_lib_env: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            home: None,
            prepend_paths: Vec::new(),
            extra_paths: Vec::new(),
            resource_roots: Vec::new(),
            denied: Vec::new(),
            verbose: false,
            debug_load_timings: false,
            use_lib_env: true,
        }
    }
}

impl LoadConfig {
    /// Load configuration from an optional TOML file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.load_from_env();
        Ok(config)
    }

    /// Parse a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse TOML configuration text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LoadError::Config(e.to_string()))
    }

    /// Apply `SPACEY_*` environment overrides.
    fn load_from_env(&mut self) {
        for (key, value) in std::env::vars() {
            if key == HOME_ENV_VAR {
                self.home = Some(PathBuf::from(value));
            } else if let Some(config_key) = key.strip_prefix("SPACEY_CONFIG_") {
                let config_key = config_key.to_lowercase().replace('_', "-");
                self.set(&config_key, &value);
            }
        }
    }

    /// Set a configuration value by key.
    pub fn set(&mut self, key: &str, value: &str) {
        match key {
            "cwd" => self.cwd = PathBuf::from(value),
            "home" => self.home = Some(PathBuf::from(value)),
            "verbose" => self.verbose = value == "true",
            "debug-load-timings" => self.debug_load_timings = value == "true",
            "use-lib-env" => self.use_lib_env = value == "true",
            "denied" => self.denied.extend(value.split(',').map(|s| s.trim().to_string())),
            _ => {}
        }
    }

    /// Runtime home, defaulting to the platform data directory.
    pub fn home_dir(&self) -> PathBuf {
        self.home.clone().unwrap_or_else(default_home_dir)
    }

    /// Standard library directories, in search order.
    pub fn standard_dirs(&self) -> Vec<String> {
        let lib = self.home_dir().join("lib");
        let site = lib.join("site");
        let vendor = lib.join("vendor");

        let mut dirs = vec![site.display().to_string()];
        if vendor != site {
            dirs.push(vendor.display().to_string());
        }
        dirs.push(lib.join("std").display().to_string());
        dirs
    }
}

/// Get the default runtime home.
fn default_home_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("spacey")
}
