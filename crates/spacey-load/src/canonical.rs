// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Canonical names for filesystem resources

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Turns found paths into canonical names.
///
/// The first permission failure switches canonicalization off for the
/// lifetime of the service; it is never switched back on.
#[derive(Debug)]
pub struct Canonicalizer {
    cwd: PathBuf,
    enabled: AtomicBool,
}

impl Canonicalizer {
    /// Create a canonicalizer resolving relative paths against `cwd`
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            enabled: AtomicBool::new(true),
        }
    }

    /// Whether canonicalization is still attempted
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Canonical name for `path`
    pub fn canonicalize(&self, path: &Path) -> String {
        self.canonicalize_with(path, |p| std::fs::canonicalize(p))
    }

    fn canonicalize_with<F>(&self, path: &Path, resolve: F) -> String
    where
        F: FnOnce(&Path) -> io::Result<PathBuf>,
    {
        if !self.is_enabled() {
            return to_slash(path);
        }

        let absolute = absolutize(&self.cwd, path);
        match resolve(&absolute) {
            Ok(resolved) => to_slash(&resolved),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                if self.enabled.swap(false, Ordering::SeqCst) {
                    warn!("can't canonicalize loaded names due to security restrictions; disabling");
                }
                to_slash(path)
            }
            Err(e) => {
                debug!("canonicalize {} failed: {}", absolute.display(), e);
                to_slash(&absolute)
            }
        }
    }
}

/// Join `path` onto `cwd` if relative and drop `.`/`..` components
pub fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn to_slash(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}
