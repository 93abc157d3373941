// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-name require locks
//!
//! Each canonical name being loaded gets its own exclusive lock. The first
//! executor to create the lock runs the load body. Other executors block until
//! it finishes, then either see the result as already resolved (the attempt
//! was terminal and the lock destroyed) or run the body themselves (the
//! attempt was retryable and the lock kept). The owning executor asking for
//! the same name again gets [`Acquired::Reentrant`] instead of deadlocking.

use crate::error::{Disposition, LoadError, Result};
use crate::executor::{Executor, ExecutorId};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ExecutorId>,
    destroyed: bool,
}

/// Exclusive, ownership-aware lock for one canonical name
#[derive(Debug, Default)]
pub(crate) struct RequireLock {
    state: Mutex<LockState>,
    available: Condvar,
    waiters: AtomicUsize,
}

impl RequireLock {
    fn claimed_by(owner: ExecutorId) -> Self {
        Self {
            state: Mutex::new(LockState {
                owner: Some(owner),
                destroyed: false,
            }),
            ..Self::default()
        }
    }

    fn is_held_by(&self, id: ExecutorId) -> bool {
        self.state.lock().owner == Some(id)
    }

    /// Wake every waiter so it re-checks its interrupt flag
    pub(crate) fn wake_all(&self) {
        let _state = self.state.lock();
        self.available.notify_all();
    }

    fn release(&self, destroy: bool) {
        let mut state = self.state.lock();
        if destroy {
            state.destroyed = true;
        }
        state.owner = None;
        self.available.notify_all();
    }

    /// Block until the lock is free and claim it for `executor`.
    ///
    /// An interrupt only ends the wait when termination was requested.
    fn claim(&self, executor: &Executor) -> Result<bool> {
        let mut state = self.state.lock();
        loop {
            if state.owner.is_none() {
                state.owner = Some(executor.id());
                return Ok(state.destroyed);
            }
            if executor.take_interrupt() {
                if executor.termination_requested() {
                    return Err(LoadError::Terminated);
                }
                debug!("{} interrupted while waiting, resuming", executor.id());
                continue;
            }
            self.available.wait(&mut state);
        }
    }
}

/// Outcome of [`LockPool::acquire`]
#[derive(Debug, PartialEq, Eq)]
pub enum Acquired<T> {
    /// This executor ran the body and it completed
    Ran(T),
    /// This executor already holds the lock for the name
    Reentrant,
    /// Another executor finished the name terminally while we waited
    AlreadyResolved,
}

/// Releases a claimed lock however the body exits, including by panic.
struct Claim<'a> {
    pool: &'a DashMap<String, Arc<RequireLock>>,
    name: &'a str,
    lock: Arc<RequireLock>,
    disposition: Disposition,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let destroy = self.disposition == Disposition::Terminal;
        if destroy {
            self.pool
                .remove_if(self.name, |_, lock| Arc::ptr_eq(lock, &self.lock));
        }
        self.lock.release(destroy);
    }
}

/// Map from canonical name to its require lock
#[derive(Debug, Default)]
pub struct LockPool {
    pool: DashMap<String, Arc<RequireLock>>,
}

impl LockPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `name` and run `body` if this executor should.
    ///
    /// Errors from `body` are returned to this caller unchanged. Only
    /// executors that were waiting can observe [`Acquired::AlreadyResolved`].
    pub fn acquire<T, F>(&self, executor: &Executor, name: &str, body: F) -> Result<Acquired<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let existing = self.pool.get(name).map(|lock| Arc::clone(lock.value()));
        let lock = match existing {
            Some(lock) => lock,
            None => {
                let fresh = Arc::new(RequireLock::claimed_by(executor.id()));
                let lock = Arc::clone(
                    self.pool
                        .entry(name.to_string())
                        .or_insert_with(|| Arc::clone(&fresh))
                        .value(),
                );
                if Arc::ptr_eq(&lock, &fresh) {
                    return self.run_claimed(name, lock, body).map(Acquired::Ran);
                }
                lock
            }
        };

        if lock.is_held_by(executor.id()) {
            return Ok(Acquired::Reentrant);
        }

        debug!("{} waiting for {}", executor.id(), name);
        lock.waiters.fetch_add(1, Ordering::SeqCst);
        executor.park_on(Arc::clone(&lock));
        let claimed = lock.claim(executor);
        executor.unpark();
        lock.waiters.fetch_sub(1, Ordering::SeqCst);

        if claimed? {
            lock.release(false);
            return Ok(Acquired::AlreadyResolved);
        }

        debug!("{} retrying {}", executor.id(), name);
        self.run_claimed(name, lock, body).map(Acquired::Ran)
    }

    fn run_claimed<T, F>(&self, name: &str, lock: Arc<RequireLock>, body: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let mut claim = Claim {
            pool: &self.pool,
            name,
            lock,
            disposition: Disposition::Retryable,
        };
        let result = body();
        claim.disposition = match &result {
            Ok(_) => Disposition::Terminal,
            Err(err) if err.is_fatal() => Disposition::Retryable,
            Err(err) => err.disposition(),
        };
        result
    }

    /// Whether the pool holds an entry for `name`
    pub fn contains(&self, name: &str) -> bool {
        self.pool.contains_key(name)
    }

    /// Number of executors blocked on `name`
    pub fn waiting_on(&self, name: &str) -> usize {
        self.pool
            .get(name)
            .map(|lock| lock.waiters.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Number of entries in the pool
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
