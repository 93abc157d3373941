// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Pre-registered extension units
//!
//! When a name resolves to nothing loadable (or only to an archive), the
//! resolver derives an identifier from the name and instantiates the
//! extension registered under it.

use crate::error::Result;
use crate::runtime::LoadContext;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// Suffix token appended to derived extension identifiers
pub const SERVICE_SUFFIX: &str = "Service";

/// A native extension that installs itself into the runtime
pub trait Extension: Send + Sync {
    /// Install the extension
    fn load(&self, ctx: &LoadContext<'_>) -> Result<()>;
}

/// Creates a fresh extension instance, or explains why it cannot
pub type ExtensionFactory =
    Arc<dyn Fn() -> std::result::Result<Box<dyn Extension>, String> + Send + Sync>;

/// Maps a request path to an extension identifier
pub trait ExtensionNaming: Send + Sync {
    /// Identifier for `path`, if one can be derived
    fn identifier(&self, path: &str) -> Option<String>;
}

/// `net/http_client` -> `net.HttpClientService`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNaming;

impl ExtensionNaming for DefaultNaming {
    fn identifier(&self, path: &str) -> Option<String> {
        let path = path.trim_start_matches("./").trim_start_matches('/');
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let last = segments.pop()?;

        let mut class_name: String = last
            .split(['_', '-'])
            .filter(|word| !word.is_empty())
            .map(capitalize)
            .collect();
        if class_name.is_empty() {
            return None;
        }
        class_name.push_str(SERVICE_SUFFIX);

        let mut parts: Vec<String> = segments.iter().map(|s| s.to_lowercase()).collect();
        parts.push(class_name);
        Some(parts.join("."))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Registered extension factories keyed by identifier
pub struct ExtensionRegistry {
    factories: DashMap<String, ExtensionFactory>,
    naming: Box<dyn ExtensionNaming>,
}

impl ExtensionRegistry {
    /// Create an empty registry using [`DefaultNaming`]
    pub fn new() -> Self {
        Self::with_naming(DefaultNaming)
    }

    /// Create an empty registry with a custom naming policy
    pub fn with_naming(naming: impl ExtensionNaming + 'static) -> Self {
        Self {
            factories: DashMap::new(),
            naming: Box::new(naming),
        }
    }

    /// Register a factory under `identifier`
    pub fn register<F>(&self, identifier: impl Into<String>, factory: F)
    where
        F: Fn() -> std::result::Result<Box<dyn Extension>, String> + Send + Sync + 'static,
    {
        self.factories.insert(identifier.into(), Arc::new(factory));
    }

    /// Remove a registration
    pub fn unregister(&self, identifier: &str) -> bool {
        self.factories.remove(identifier).is_some()
    }

    /// Identifier the naming policy derives for `path`
    pub fn identifier_for(&self, path: &str) -> Option<String> {
        self.naming.identifier(path)
    }

    /// Find the factory registered for the identifier derived from `path`
    pub fn find(&self, path: &str) -> Option<(String, ExtensionFactory)> {
        let identifier = self.identifier_for(path)?;
        let factory = self.factories.get(&identifier).map(|f| Arc::clone(f.value()))?;
        Some((identifier, factory))
    }

    /// Number of registered extensions
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.factories.len())
            .finish()
    }
}
