// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0

//! Generic reentrant exclusive lock, keyed by an explicit owner id rather
//! than thread affinity.
//!
//! `tokio::sync` has no reentrant mutex, and a blocking `std::sync::Mutex`
//! held across `.await` points would stall the runtime, so this builds one
//! built the way a tokio application would: a plain async mutex guarding an owner id
//! plus a depth counter, with a `Notify` to wake waiters on release. Two
//! things in this crate need exactly this shape — `Store` guarding its tree
//! (owner = the session's id, or a freshly minted one per unbracketed
//! embedded call) and `RemoteStore` guarding its transport `Codec` (owner =
//! whatever id the caller supplies, so a `RemoteLockGuard` can hold the
//! transport across several calls without deadlocking itself) — so this is
//! generic over the guarded value rather than duplicated per caller.

use std::sync::Arc;

use tokio::sync::{Mutex, Notify, OwnedMutexGuard};

use crate::error::HkvError;

struct LockState<T> {
    owner: Option<u64>,
    depth: u32,
    guard: Option<OwnedMutexGuard<T>>,
}

/// Guards a `T` behind a reentrant exclusive lock keyed by owner id.
pub struct ReentrantLock<T> {
    value: Arc<Mutex<T>>,
    state: Mutex<LockState<T>>,
    released: Notify,
}

impl<T> ReentrantLock<T> {
    pub fn new(value: T) -> Self {
        ReentrantLock {
            value: Arc::new(Mutex::new(value)),
            state: Mutex::new(LockState {
                owner: None,
                depth: 0,
                guard: None,
            }),
            released: Notify::new(),
        }
    }

    /// Acquires the lock for `owner`, blocking (without stalling the
    /// executor) while a different owner holds it. Reentrant: an owner that
    /// already holds the lock just increments its depth.
    pub async fn enter(&self, owner: u64) {
        loop {
            let mut state = self.state.lock().await;
            match state.owner {
                Some(current) if current == owner => {
                    state.depth += 1;
                    return;
                }
                None => {
                    let guard = self.value.clone().lock_owned().await;
                    state.owner = Some(owner);
                    state.depth = 1;
                    state.guard = Some(guard);
                    return;
                }
                Some(_) => {
                    drop(state);
                    self.released.notified().await;
                }
            }
        }
    }

    /// Releases one level of `owner`'s hold on the lock.
    ///
    /// ## Errors
    /// - `BadUnlock` if `owner` does not currently hold the lock.
    pub async fn exit(&self, owner: u64) -> Result<(), HkvError> {
        let mut state = self.state.lock().await;
        match state.owner {
            Some(current) if current == owner => {
                state.depth -= 1;
                if state.depth == 0 {
                    state.owner = None;
                    state.guard = None;
                    drop(state);
                    self.released.notify_waiters();
                }
                Ok(())
            }
            _ => Err(HkvError::BadUnlock),
        }
    }

    /// Runs `f` against the guarded value while `owner` holds the lock,
    /// entering and exiting around it. `f` must not panic while it holds
    /// the guard.
    pub async fn with_value<F, R>(&self, owner: u64, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        self.enter(owner).await;
        let result = self.with_entered_value(f).await;
        self.exit(owner)
            .await
            .expect("the owner that just entered still holds the lock");
        result
    }

    /// Runs `f` against the guarded value, assuming the caller already holds
    /// the lock via a prior `enter` it has not yet matched with `exit` (the
    /// shape `RemoteLockGuard` needs: enter once, run several operations,
    /// exit once).
    ///
    /// ## Behaviour
    /// Panics if no owner currently holds the lock — a caller-side bug, not
    /// a recoverable runtime condition.
    pub async fn with_entered_value<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut state = self.state.lock().await;
        let value = state.guard.as_mut().expect("lock entered before with_entered_value");
        f(value)
    }

    /// Borrows the guarded value for as long as the returned `Accessor`
    /// lives, spanning as many `.await` points as the caller needs. Assumes
    /// the caller already holds the lock via a prior `enter` — the same
    /// precondition as `with_entered_value`, just without forcing the
    /// access into a single synchronous closure. This is what lets
    /// `RemoteStore` interleave several `.await`ed codec calls (write
    /// command, flush, read response) while holding the transport lock.
    pub async fn access(&self) -> Accessor<'_, T> {
        let guard = self.state.lock().await;
        Accessor { guard }
    }

    /// True if no owner currently holds the lock (used by tests and by
    /// `Store::close`'s sanity checks).
    #[cfg(test)]
    pub async fn is_idle(&self) -> bool {
        self.state.lock().await.owner.is_none()
    }
}

/// RAII access to a `ReentrantLock<T>`'s guarded value, obtained via
/// `access()`. Derefs to `T`; panics on deref if no owner currently holds
/// the lock.
pub struct Accessor<'a, T> {
    guard: tokio::sync::MutexGuard<'a, LockState<T>>,
}

impl<T> std::ops::Deref for Accessor<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.guard.guard.as_ref().expect("lock entered before access()")
    }
}

impl<T> std::ops::DerefMut for Accessor<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.guard.guard.as_mut().expect("lock entered before access()")
    }
}

#[cfg(test)]
mod lock_test;
