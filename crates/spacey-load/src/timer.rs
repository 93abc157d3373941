// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Nested load timing trace

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::info;

/// Logs `-> name` / `<- name - Nms` around each load, indented by depth.
/// Lock waiting time is not included.
#[derive(Debug, Default)]
pub struct LoadTimer {
    enabled: bool,
    // One counter for all executors; concurrent loads share indentation
    depth: AtomicUsize,
}

impl LoadTimer {
    /// Create a timer; a disabled timer logs nothing
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            depth: AtomicUsize::new(0),
        }
    }

    /// Start timing a load. The returned guard logs the end when dropped.
    pub fn start<'a>(&'a self, name: &'a str) -> Option<Timing<'a>> {
        if !self.enabled {
            return None;
        }
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        info!("{}-> {}", indent(depth), name);
        Some(Timing {
            timer: self,
            name,
            started: Instant::now(),
        })
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

/// An in-progress timed load
pub struct Timing<'a> {
    timer: &'a LoadTimer,
    name: &'a str,
    started: Instant,
}

impl Drop for Timing<'_> {
    fn drop(&mut self) {
        let depth = self.timer.depth.load(Ordering::SeqCst);
        info!(
            "{}<- {} - {}ms",
            indent(depth),
            self.name,
            self.started.elapsed().as_millis()
        );
        self.timer.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
