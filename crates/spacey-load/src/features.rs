// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Index of loaded features

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe set of canonical names that finished loading.
///
/// Short names (the requested name plus the suffix that matched) are kept as
/// aliases so a later require can short-circuit without searching.
#[derive(Debug, Default)]
pub struct FeatureIndex {
    /// Canonical name -> insertion sequence
    loaded: DashMap<String, u64>,
    /// Short name -> canonical name
    aliases: DashMap<String, String>,
    next_seq: AtomicU64,
}

impl FeatureIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` as loaded. Returns false if it already was.
    pub fn provide(&self, name: &str) -> bool {
        if self.loaded.contains_key(name) {
            return false;
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        *self.loaded.entry(name.to_string()).or_insert(seq).value() == seq
    }

    /// Map a short name onto a loaded canonical name
    pub fn alias(&self, short: &str, canonical: &str) {
        if short != canonical {
            self.aliases.insert(short.to_string(), canonical.to_string());
        }
    }

    /// Whether `name` is loaded, either as a canonical name or an alias
    pub fn contains(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
            || self
                .aliases
                .get(name)
                .is_some_and(|canonical| self.loaded.contains_key(canonical.value()))
    }

    /// Remove a feature and every alias pointing at it
    pub fn unregister(&self, name: &str) -> bool {
        let canonical = self
            .aliases
            .get(name)
            .map(|c| c.value().clone())
            .unwrap_or_else(|| name.to_string());
        self.aliases.retain(|short, target| short != name && target != &canonical);
        self.loaded.remove(&canonical).is_some()
    }

    /// Loaded canonical names in load order
    pub fn snapshot(&self) -> Vec<String> {
        let mut entries: Vec<(u64, String)> = self
            .loaded
            .iter()
            .map(|entry| (*entry.value(), entry.key().clone()))
            .collect();
        entries.sort_unstable();
        entries.into_iter().map(|(_, name)| name).collect()
    }

    /// Number of loaded features
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    /// Whether nothing has been loaded
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}
