// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0

//! The in-memory hierarchical tree and its reentrant-locked operation set.
//!
//! `Store` is the real, mutable tree. `NullStore` and `ConvertingStore` are
//! two further variants: a store where reads always miss and writes are
//! no-ops, and a thin wrapper that translates keys/values at the boundary
//! and forwards one call in, one call out. All three implement `DataStore`
//! so callers can be generic over which kind of store they hold.

mod converting;
mod null;
pub mod tree;

pub use converting::{ConvertingStore, KeyValueConversion};
pub use null::NullStore;
pub use tree::{Key, Path};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::lock::ReentrantLock;
use tree::Node;

use crate::error::{HkvError, HkvResult};

/// The operation set every kind of store offers.
///
/// Every method takes an explicit `owner` id so the same reentrant-lock
/// discipline backs both a bare embedded call (a freshly minted, one-shot
/// owner) and a `Session`'s `b`…`f`-bracketed critical section (the
/// session's own id, reused across every call inside the bracket). This is
/// the Rust-async stand-in for the reference implementation's OS-thread-
/// bound `RLock`: tokio tasks have no stable thread affinity to hang
/// reentrance off, so ownership is an explicit token instead.
pub trait DataStore: Send + Sync {
    async fn lock(&self, owner: u64) -> HkvResult<()>;
    async fn unlock(&self, owner: u64) -> HkvResult<()>;
    fn close(&self);

    async fn get(&self, owner: u64, path: &Path) -> HkvResult<Vec<u8>>;
    async fn get_all(&self, owner: u64, path: &Path) -> HkvResult<HashMap<Key, Vec<u8>>>;
    async fn list(&self, owner: u64, path: &Path, lclass: u32) -> HkvResult<Vec<Key>>;
    async fn put(&self, owner: u64, path: &Path, value: Vec<u8>) -> HkvResult<()>;
    async fn put_all(&self, owner: u64, path: &Path, values: HashMap<Key, Vec<u8>>) -> HkvResult<()>;
    async fn replace(&self, owner: u64, path: &Path, values: HashMap<Key, Vec<u8>>) -> HkvResult<()>;
    async fn delete(&self, owner: u64, path: &Path) -> HkvResult<()>;
    async fn delete_all(&self, owner: u64, path: &Path) -> HkvResult<()>;
}

/// The real in-memory tree: a root `Nested` node behind a reentrant
/// exclusive lock.
pub struct Store {
    name: Vec<u8>,
    lock: ReentrantLock<Node>,
    closed: AtomicBool,
    next_agent: AtomicU64,
}

impl Store {
    /// Creates a new, empty store with the given registry name.
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        Store {
            name: name.into(),
            lock: ReentrantLock::new(Node::empty_nested()),
            closed: AtomicBool::new(false),
            next_agent: AtomicU64::new(1),
        }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Mints a fresh one-shot owner id. Embedded callers that invoke a
    /// single operation without bracketing it in an explicit `lock`/`unlock`
    /// pair use this so they still go through the same reentrant-lock path
    /// as a `Session`, just with an owner nobody else can collide with.
    pub fn issue_agent(&self) -> u64 {
        self.next_agent.fetch_add(1, Ordering::Relaxed)
    }

    fn check_open(&self) -> HkvResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(HkvError::Unknown {
                reason: format!(
                    "store '{}' is closed",
                    String::from_utf8_lossy(&self.name)
                ),
            })
        } else {
            Ok(())
        }
    }

    async fn guarded<F, R>(&self, owner: u64, f: F) -> HkvResult<R>
    where
        F: FnOnce(&mut Node) -> Result<R, HkvError>,
    {
        self.check_open()?;
        self.lock.with_value(owner, f).await
    }
}

impl DataStore for Store {
    async fn lock(&self, owner: u64) -> HkvResult<()> {
        self.check_open()?;
        self.lock.enter(owner).await;
        Ok(())
    }

    async fn unlock(&self, owner: u64) -> HkvResult<()> {
        self.check_open()?;
        self.lock.exit(owner).await
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    async fn get(&self, owner: u64, path: &Path) -> HkvResult<Vec<u8>> {
        self.guarded(owner, |n| tree::get(n, path)).await
    }

    async fn get_all(&self, owner: u64, path: &Path) -> HkvResult<HashMap<Key, Vec<u8>>> {
        self.guarded(owner, |n| tree::get_all(n, path)).await
    }

    async fn list(&self, owner: u64, path: &Path, lclass: u32) -> HkvResult<Vec<Key>> {
        self.guarded(owner, |n| tree::list(n, path, lclass)).await
    }

    async fn put(&self, owner: u64, path: &Path, value: Vec<u8>) -> HkvResult<()> {
        self.guarded(owner, |n| tree::put(n, path, value)).await
    }

    async fn put_all(&self, owner: u64, path: &Path, values: HashMap<Key, Vec<u8>>) -> HkvResult<()> {
        self.guarded(owner, |n| tree::put_all(n, path, values)).await
    }

    async fn replace(&self, owner: u64, path: &Path, values: HashMap<Key, Vec<u8>>) -> HkvResult<()> {
        self.guarded(owner, |n| tree::replace(n, path, values)).await
    }

    async fn delete(&self, owner: u64, path: &Path) -> HkvResult<()> {
        self.guarded(owner, |n| tree::delete(n, path)).await
    }

    async fn delete_all(&self, owner: u64, path: &Path) -> HkvResult<()> {
        self.guarded(owner, |n| tree::delete_all(n, path)).await
    }
}
