// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host policy hook consulted before resolution

use crate::suffix::LoadMode;
use std::collections::HashSet;

/// Decides whether a name may be required or loaded at all
pub trait LoadPolicy: Send + Sync {
    /// Return false to veto the request
    fn allow(&self, name: &str, mode: LoadMode) -> bool;
}

/// Allows everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl LoadPolicy for AllowAll {
    fn allow(&self, _name: &str, _mode: LoadMode) -> bool {
        true
    }
}

/// Refuses a fixed set of names in both modes
#[derive(Debug, Default, Clone)]
pub struct DenyList {
    names: HashSet<String>,
}

impl DenyList {
    /// Create a deny list
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl LoadPolicy for DenyList {
    fn allow(&self, name: &str, _mode: LoadMode) -> bool {
        !self.names.contains(name)
    }
}

impl<F> LoadPolicy for F
where
    F: Fn(&str, LoadMode) -> bool + Send + Sync,
{
    fn allow(&self, name: &str, mode: LoadMode) -> bool {
        self(name, mode)
    }
}
