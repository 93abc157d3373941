// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Request modes and suffix sets

/// Source unit suffixes
pub const SOURCE_SUFFIXES: &[&str] = &[".src"];

/// Extension suffixes, in probe order
pub const EXTENSION_SUFFIXES: &[&str] = &[".archive", ".so", ".dll", ".bundle"];

/// Suffixes of native shared objects, which are never loaded
pub const NATIVE_SUFFIXES: &[&str] = &[".so", ".dll", ".bundle"];

/// Suffix of precompiled units
pub const COMPILED_SUFFIX: &str = ".compiled";

const BOTH_SUFFIXES: &[&str] = &[".src", ".archive", ".so", ".dll", ".bundle"];
const VERBATIM: &[&str] = &[""];

/// Whether a request is a require (once per name) or a load (always runs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadMode {
    /// Idempotent by canonical name
    Require,
    /// Always executes if resolvable
    Load,
}

/// Which suffixes are appended to a base name while searching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixType {
    /// Source suffixes only
    Source,
    /// Extension suffixes only
    Extension,
    /// Source, then extension suffixes
    Both,
    /// The name is used verbatim
    Neither,
}

impl SuffixType {
    /// Suffixes in probe order
    pub fn suffixes(self) -> &'static [&'static str] {
        match self {
            Self::Source => SOURCE_SUFFIXES,
            Self::Extension => EXTENSION_SUFFIXES,
            Self::Both => BOTH_SUFFIXES,
            Self::Neither => VERBATIM,
        }
    }
}

/// Split a requested name into the search base and its suffix set.
///
/// A name that already carries a known suffix collapses the set to that
/// suffix's family, and compiled units are always named verbatim. Otherwise
/// require searches both families and load uses the name verbatim.
pub fn split_request(name: &str, mode: LoadMode) -> (&str, SuffixType) {
    if name.ends_with(COMPILED_SUFFIX) {
        return (name, SuffixType::Neither);
    }
    if let Some(base) = strip_any(name, SOURCE_SUFFIXES) {
        return (base, SuffixType::Source);
    }
    if let Some(base) = strip_any(name, EXTENSION_SUFFIXES) {
        return (base, SuffixType::Extension);
    }
    match mode {
        LoadMode::Require => (name, SuffixType::Both),
        LoadMode::Load => (name, SuffixType::Neither),
    }
}

/// Whether a file name denotes a native shared object
pub fn is_native(file: &str) -> bool {
    NATIVE_SUFFIXES.iter().any(|suffix| file.ends_with(suffix))
}

fn strip_any<'a>(name: &'a str, suffixes: &[&str]) -> Option<&'a str> {
    suffixes
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .filter(|base| !base.is_empty())
}
