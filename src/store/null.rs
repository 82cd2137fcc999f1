// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0

//! The null store variant: every read misses, every write is
//! a no-op, and locking is a no-op. Useful as a discard target or as the
//! default store handed to a test session that never opens a real one.

use std::collections::HashMap;

use crate::error::{HkvError, HkvResult};
use crate::store::{DataStore, Key, Path};

#[derive(Debug, Default)]
pub struct NullStore;

impl NullStore {
    pub fn new() -> Self {
        NullStore
    }
}

impl DataStore for NullStore {
    async fn lock(&self, _owner: u64) -> HkvResult<()> {
        Ok(())
    }

    async fn unlock(&self, _owner: u64) -> HkvResult<()> {
        Ok(())
    }

    fn close(&self) {}

    async fn get(&self, _owner: u64, path: &Path) -> HkvResult<Vec<u8>> {
        Err(HkvError::NoKey {
            path: format!("{:?}", path),
        })
    }

    async fn get_all(&self, _owner: u64, _path: &Path) -> HkvResult<HashMap<Key, Vec<u8>>> {
        Err(HkvError::NoKey {
            path: "<null store>".to_string(),
        })
    }

    async fn list(&self, _owner: u64, _path: &Path, _lclass: u32) -> HkvResult<Vec<Key>> {
        Err(HkvError::NoKey {
            path: "<null store>".to_string(),
        })
    }

    async fn put(&self, _owner: u64, _path: &Path, _value: Vec<u8>) -> HkvResult<()> {
        Ok(())
    }

    async fn put_all(&self, _owner: u64, _path: &Path, _values: HashMap<Key, Vec<u8>>) -> HkvResult<()> {
        Ok(())
    }

    async fn replace(&self, _owner: u64, _path: &Path, _values: HashMap<Key, Vec<u8>>) -> HkvResult<()> {
        Ok(())
    }

    async fn delete(&self, _owner: u64, _path: &Path) -> HkvResult<()> {
        Ok(())
    }

    async fn delete_all(&self, _owner: u64, _path: &Path) -> HkvResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod null_test;
