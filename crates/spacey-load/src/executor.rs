// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Executor identity and cooperative cancellation
//!
//! Lock ownership is tracked by [`ExecutorId`], never by OS thread, so an
//! executor may be an OS thread, a green thread, or a task on a cooperative
//! scheduler. Cancellation is an interrupt: it wakes a blocked wait, which
//! then checks whether termination was actually requested.

use crate::lock_pool::RequireLock;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

static NEXT_EXECUTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of an executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutorId(u64);

impl fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "executor#{}", self.0)
    }
}

#[derive(Default)]
struct Signals {
    interrupted: AtomicBool,
    terminate: AtomicBool,
    parked: Mutex<Option<Arc<RequireLock>>>,
}

/// Handle for one executor. Clones share identity and signals, so another
/// thread can keep a clone to interrupt or terminate this one.
#[derive(Clone)]
pub struct Executor {
    id: ExecutorId,
    signals: Arc<Signals>,
}

impl Executor {
    /// Create a fresh executor with a new identity
    pub fn new() -> Self {
        Self {
            id: ExecutorId(NEXT_EXECUTOR_ID.fetch_add(1, Ordering::Relaxed)),
            signals: Arc::new(Signals::default()),
        }
    }

    /// This executor's identity
    pub fn id(&self) -> ExecutorId {
        self.id
    }

    /// Interrupt a blocked wait. Without a pending termination the wait resumes.
    pub fn interrupt(&self) {
        self.signals.interrupted.store(true, Ordering::SeqCst);
        let parked = self.signals.parked.lock().clone();
        if let Some(lock) = parked {
            lock.wake_all();
        }
    }

    /// Request termination and interrupt any blocked wait
    pub fn terminate(&self) {
        self.signals.terminate.store(true, Ordering::SeqCst);
        self.interrupt();
    }

    /// Whether termination has been requested
    pub fn termination_requested(&self) -> bool {
        self.signals.terminate.load(Ordering::SeqCst)
    }

    /// Consume a pending interrupt
    pub(crate) fn take_interrupt(&self) -> bool {
        self.signals.interrupted.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn park_on(&self, lock: Arc<RequireLock>) {
        *self.signals.parked.lock() = Some(lock);
    }

    pub(crate) fn unpark(&self) {
        self.signals.parked.lock().take();
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("id", &self.id)
            .field("terminate", &self.termination_requested())
            .finish()
    }
}
