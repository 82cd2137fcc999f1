// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0

//! The converting store variant, grounded on the original
//! `ConvertingDataStore` wrapper: a boundary adapter that translates both
//! keys and values between an external representation and the raw bytes
//! the tree stores, forwarding one call in, one call out — no batching, no
//! caching of its own.
//!
//! The original expresses "a path argument" vs. "a single key fragment
//! inside a result" with one pair of functions plus an `is_fragment` flag.
//! That reads naturally in Python's duck typing; here the two cases get
//! separate methods instead; which one applies is evident from the method
//! name rather than a runtime branch.

use std::collections::HashMap;

use crate::error::HkvResult;
use crate::store::{DataStore, Path};

/// Translates between an external key/value representation and the raw
/// bytes a `Store` holds. `Key` stands in both for a whole path (passed to
/// `import_path`) and for a single path fragment (as seen in `get_all`/
/// `list` results, via `import_fragment`/`export_fragment`) — the original
/// reference implementation folds both into one function with a flag; this
/// keeps them as separate methods so the call site can't confuse the two.
pub trait KeyValueConversion {
    type Key;
    type Value;

    /// Converts a caller-supplied path into the raw path the tree expects.
    fn import_path(&self, key: &Self::Key) -> HkvResult<Path>;
    /// Converts a single raw key fragment into the external representation.
    fn export_fragment(&self, fragment: &[u8]) -> HkvResult<Self::Key>;
    /// Converts a single external key fragment into its raw bytes, for
    /// `put_all`/`replace`'s value maps.
    fn import_fragment(&self, key: &Self::Key) -> HkvResult<Vec<u8>>;
    fn import_value(&self, value: &Self::Value) -> HkvResult<Vec<u8>>;
    fn export_value(&self, data: &[u8]) -> HkvResult<Self::Value>;
}

/// Wraps an inner `DataStore` and a `KeyValueConversion`, translating keys
/// and values at the boundary. Unlike `DataStore`'s implementors, this
/// operates in terms of `C::Key`/`C::Value` rather than raw bytes, since its
/// whole purpose is to present a different shape to its own callers.
pub struct ConvertingStore<W, C> {
    wrapped: W,
    conversion: C,
}

impl<W, C> ConvertingStore<W, C>
where
    W: DataStore,
    C: KeyValueConversion,
{
    pub fn new(wrapped: W, conversion: C) -> Self {
        ConvertingStore { wrapped, conversion }
    }

    pub fn wrapped(&self) -> &W {
        &self.wrapped
    }

    pub async fn lock(&self, owner: u64) -> HkvResult<()> {
        self.wrapped.lock(owner).await
    }

    pub async fn unlock(&self, owner: u64) -> HkvResult<()> {
        self.wrapped.unlock(owner).await
    }

    pub fn close(&self) {
        self.wrapped.close()
    }

    pub async fn get(&self, owner: u64, key: &C::Key) -> HkvResult<C::Value> {
        let path = self.conversion.import_path(key)?;
        let raw = self.wrapped.get(owner, &path).await?;
        self.conversion.export_value(&raw)
    }

    pub async fn get_all(&self, owner: u64, key: &C::Key) -> HkvResult<HashMap<C::Key, C::Value>>
    where
        C::Key: std::hash::Hash + Eq,
    {
        let path = self.conversion.import_path(key)?;
        let raw = self.wrapped.get_all(owner, &path).await?;
        raw.iter()
            .map(|(k, v)| Ok((self.conversion.export_fragment(k)?, self.conversion.export_value(v)?)))
            .collect()
    }

    pub async fn list(&self, owner: u64, key: &C::Key, lclass: u32) -> HkvResult<Vec<C::Key>> {
        let path = self.conversion.import_path(key)?;
        let raw = self.wrapped.list(owner, &path, lclass).await?;
        raw.iter().map(|k| self.conversion.export_fragment(k)).collect()
    }

    pub async fn put(&self, owner: u64, key: &C::Key, value: &C::Value) -> HkvResult<()> {
        let path = self.conversion.import_path(key)?;
        let raw = self.conversion.import_value(value)?;
        self.wrapped.put(owner, &path, raw).await
    }

    pub async fn put_all(&self, owner: u64, key: &C::Key, values: &HashMap<C::Key, C::Value>) -> HkvResult<()>
    where
        C::Key: std::hash::Hash + Eq,
    {
        let path = self.conversion.import_path(key)?;
        let mut raw = HashMap::with_capacity(values.len());
        for (k, v) in values {
            raw.insert(self.conversion.import_fragment(k)?, self.conversion.import_value(v)?);
        }
        self.wrapped.put_all(owner, &path, raw).await
    }

    pub async fn replace(&self, owner: u64, key: &C::Key, values: &HashMap<C::Key, C::Value>) -> HkvResult<()>
    where
        C::Key: std::hash::Hash + Eq,
    {
        let path = self.conversion.import_path(key)?;
        let mut raw = HashMap::with_capacity(values.len());
        for (k, v) in values {
            raw.insert(self.conversion.import_fragment(k)?, self.conversion.import_value(v)?);
        }
        self.wrapped.replace(owner, &path, raw).await
    }

    pub async fn delete(&self, owner: u64, key: &C::Key) -> HkvResult<()> {
        let path = self.conversion.import_path(key)?;
        self.wrapped.delete(owner, &path).await
    }

    pub async fn delete_all(&self, owner: u64, key: &C::Key) -> HkvResult<()> {
        let path = self.conversion.import_path(key)?;
        self.wrapped.delete_all(owner, &path).await
    }
}

#[cfg(test)]
mod converting_test;
