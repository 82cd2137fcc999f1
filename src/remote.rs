// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0

//! The client side of the wire protocol.
//!
//! `RemoteStore` offers the same operation set as `Store`, each call taking
//! an explicit `owner`/caller id — the same convention `Store` uses, here
//! keying the transport-serializing reentrant lock instead of a tree lock.
//! Unlike `DataStore`'s `close`, tearing down the connection is just
//! dropping the `RemoteStore` (the underlying `TcpStream`'s own `Drop`
//! handles socket teardown) — there is no separate embedder-facing close
//! call to forward, unlike the original reference implementation's
//! `RemoteDataStore.close`, which tears down a plain blocking socket by
//! hand; Rust's ownership already gives us that for free.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::TcpStream;

use crate::codec::Codec;
use crate::error::{error_from_code, HkvError, HkvResult};
use crate::lock::ReentrantLock;
use crate::store::{Key, Path};
use crate::wire::*;

async fn expect_nothing(codec: &mut Codec<TcpStream>) -> HkvResult<()> {
    match codec.read_byte().await? {
        RESP_NOTHING => Ok(()),
        RESP_ERROR => Err(error_from_code(codec.read_u32().await?)),
        other => Err(HkvError::NoResp { byte: other }),
    }
}

async fn expect_bytes(codec: &mut Codec<TcpStream>) -> HkvResult<Vec<u8>> {
    match codec.read_byte().await? {
        RESP_BYTES => codec.read_bytes().await,
        RESP_ERROR => Err(error_from_code(codec.read_u32().await?)),
        other => Err(HkvError::NoResp { byte: other }),
    }
}

async fn expect_list(codec: &mut Codec<TcpStream>) -> HkvResult<Vec<Key>> {
    match codec.read_byte().await? {
        RESP_LIST => codec.read_list().await,
        RESP_ERROR => Err(error_from_code(codec.read_u32().await?)),
        other => Err(HkvError::NoResp { byte: other }),
    }
}

async fn expect_map(codec: &mut Codec<TcpStream>) -> HkvResult<HashMap<Key, Vec<u8>>> {
    match codec.read_byte().await? {
        RESP_MAP => codec.read_map().await,
        RESP_ERROR => Err(error_from_code(codec.read_u32().await?)),
        other => Err(HkvError::NoResp { byte: other }),
    }
}

/// Client-side connection to a store server. Internally holds one
/// connection, one codec, and a reentrant lock serializing in-flight
/// requests so multiple callers can share the connection.
pub struct RemoteStore {
    transport: ReentrantLock<Codec<TcpStream>>,
    next_caller: AtomicU64,
}

impl RemoteStore {
    pub async fn connect(addr: SocketAddr) -> HkvResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(RemoteStore {
            transport: ReentrantLock::new(Codec::new(stream)),
            next_caller: AtomicU64::new(1),
        })
    }

    /// Mints a fresh caller id for an unbracketed call, mirroring
    /// `Store::issue_agent` on the embedded side.
    pub fn issue_caller(&self) -> u64 {
        self.next_caller.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn open_store(&self, owner: u64, name: &[u8]) -> HkvResult<()> {
        self.transport.enter(owner).await;
        let mut codec = self.transport.access().await;
        let outcome = async {
            codec.write_byte(CMD_OPEN).await?;
            codec.write_bytes(name).await?;
            codec.flush().await?;
            expect_nothing(&mut codec).await
        }
        .await;
        drop(codec);
        self.exit_after(owner).await;
        outcome
    }

    pub async fn close_store(&self, owner: u64) -> HkvResult<()> {
        self.transport.enter(owner).await;
        let mut codec = self.transport.access().await;
        let outcome = async {
            codec.write_byte(CMD_CLOSE).await?;
            codec.flush().await?;
            expect_nothing(&mut codec).await
        }
        .await;
        drop(codec);
        self.exit_after(owner).await;
        outcome
    }

    /// Sends `q` and reads its acknowledgement; does not itself close the
    /// socket (drop `self` for that).
    pub async fn quit(&self, owner: u64) -> HkvResult<()> {
        self.transport.enter(owner).await;
        let mut codec = self.transport.access().await;
        let outcome = async {
            codec.write_byte(CMD_QUIT).await?;
            codec.flush().await?;
            expect_nothing(&mut codec).await
        }
        .await;
        drop(codec);
        self.exit_after(owner).await;
        outcome
    }

    /// Remote-only lock (the primary/default binding): sends `b`
    /// and returns once acknowledged, taking the transport lock only for
    /// this one request. Other local callers sharing the connection keep
    /// making progress; they just don't get the protocol-level lock.
    pub async fn lock(&self, owner: u64) -> HkvResult<()> {
        self.transport.enter(owner).await;
        let mut codec = self.transport.access().await;
        let outcome = async {
            codec.write_byte(CMD_BEGIN).await?;
            codec.flush().await?;
            expect_nothing(&mut codec).await
        }
        .await;
        drop(codec);
        self.exit_after(owner).await;
        outcome
    }

    pub async fn unlock(&self, owner: u64) -> HkvResult<()> {
        self.transport.enter(owner).await;
        let mut codec = self.transport.access().await;
        let outcome = async {
            codec.write_byte(CMD_FINISH).await?;
            codec.flush().await?;
            expect_nothing(&mut codec).await
        }
        .await;
        drop(codec);
        self.exit_after(owner).await;
        outcome
    }

    /// Full binding (the alternative): holds the transport lock
    /// for the entire time the protocol lock is held, so one Rust value
    /// owns both layers across a critical section. See `RemoteLockGuard`.
    pub async fn lock_guard(&self, owner: u64) -> HkvResult<RemoteLockGuard<'_>> {
        self.transport.enter(owner).await;
        let outcome = {
            let mut codec = self.transport.access().await;
            async {
                codec.write_byte(CMD_BEGIN).await?;
                codec.flush().await?;
                expect_nothing(&mut codec).await
            }
            .await
        };
        match outcome {
            Ok(()) => Ok(RemoteLockGuard {
                store: self,
                owner,
                released: false,
            }),
            Err(e) => {
                self.exit_after(owner).await;
                Err(e)
            }
        }
    }

    /// Releases `owner`'s hold on the transport lock taken for a single
    /// round trip. The owner that just entered always still holds it here,
    /// so a mismatch would mean a bug in this module, not a client error.
    async fn exit_after(&self, owner: u64) {
        self.transport
            .exit(owner)
            .await
            .expect("the owner that just entered still holds the transport lock");
    }

    pub async fn get(&self, owner: u64, path: &Path) -> HkvResult<Vec<u8>> {
        self.transport.enter(owner).await;
        let mut codec = self.transport.access().await;
        let outcome = async {
            codec.write_byte(CMD_GET).await?;
            codec.write_list(path).await?;
            codec.flush().await?;
            expect_bytes(&mut codec).await
        }
        .await;
        drop(codec);
        self.exit_after(owner).await;
        outcome
    }

    pub async fn get_all(&self, owner: u64, path: &Path) -> HkvResult<HashMap<Key, Vec<u8>>> {
        self.transport.enter(owner).await;
        let mut codec = self.transport.access().await;
        let outcome = async {
            codec.write_byte(CMD_GET_ALL).await?;
            codec.write_list(path).await?;
            codec.flush().await?;
            expect_map(&mut codec).await
        }
        .await;
        drop(codec);
        self.exit_after(owner).await;
        outcome
    }

    pub async fn list(&self, owner: u64, path: &Path, lclass: u32) -> HkvResult<Vec<Key>> {
        self.transport.enter(owner).await;
        let mut codec = self.transport.access().await;
        let outcome = async {
            codec.write_byte(CMD_LIST).await?;
            codec.write_list(path).await?;
            codec.write_u32(lclass).await?;
            codec.flush().await?;
            expect_list(&mut codec).await
        }
        .await;
        drop(codec);
        self.exit_after(owner).await;
        outcome
    }

    pub async fn put(&self, owner: u64, path: &Path, value: Vec<u8>) -> HkvResult<()> {
        self.transport.enter(owner).await;
        let mut codec = self.transport.access().await;
        let outcome = async {
            codec.write_byte(CMD_PUT).await?;
            codec.write_list(path).await?;
            codec.write_bytes(&value).await?;
            codec.flush().await?;
            expect_nothing(&mut codec).await
        }
        .await;
        drop(codec);
        self.exit_after(owner).await;
        outcome
    }

    pub async fn put_all(
        &self,
        owner: u64,
        path: &Path,
        values: HashMap<Key, Vec<u8>>,
    ) -> HkvResult<()> {
        self.transport.enter(owner).await;
        let mut codec = self.transport.access().await;
        let outcome = async {
            codec.write_byte(CMD_PUT_ALL).await?;
            codec.write_list(path).await?;
            codec.write_map(&values).await?;
            codec.flush().await?;
            expect_nothing(&mut codec).await
        }
        .await;
        drop(codec);
        self.exit_after(owner).await;
        outcome
    }

    pub async fn replace(
        &self,
        owner: u64,
        path: &Path,
        values: HashMap<Key, Vec<u8>>,
    ) -> HkvResult<()> {
        self.transport.enter(owner).await;
        let mut codec = self.transport.access().await;
        let outcome = async {
            codec.write_byte(CMD_REPLACE).await?;
            codec.write_list(path).await?;
            codec.write_map(&values).await?;
            codec.flush().await?;
            expect_nothing(&mut codec).await
        }
        .await;
        drop(codec);
        self.exit_after(owner).await;
        outcome
    }

    pub async fn delete(&self, owner: u64, path: &Path) -> HkvResult<()> {
        self.transport.enter(owner).await;
        let mut codec = self.transport.access().await;
        let outcome = async {
            codec.write_byte(CMD_DELETE).await?;
            codec.write_list(path).await?;
            codec.flush().await?;
            expect_nothing(&mut codec).await
        }
        .await;
        drop(codec);
        self.exit_after(owner).await;
        outcome
    }

    pub async fn delete_all(&self, owner: u64, path: &Path) -> HkvResult<()> {
        self.transport.enter(owner).await;
        let mut codec = self.transport.access().await;
        let outcome = async {
            codec.write_byte(CMD_DELETE_ALL).await?;
            codec.write_list(path).await?;
            codec.flush().await?;
            expect_nothing(&mut codec).await
        }
        .await;
        drop(codec);
        self.exit_after(owner).await;
        outcome
    }
}

/// The "full" client-side lock binding: holds the
/// transport lock for as long as this guard lives, so the same owner id can
/// make further calls through `store()` without blocking on itself, and a
/// single Rust value tracks both the protocol-level and transport-level
/// lock together.
///
/// The protocol lock can't be released synchronously on drop — `f` needs a
/// round trip — so callers must call `finish()` explicitly. `Drop` only
/// warns if that didn't happen; it cannot recover the leaked lock state.
pub struct RemoteLockGuard<'a> {
    store: &'a RemoteStore,
    owner: u64,
    released: bool,
}

impl<'a> RemoteLockGuard<'a> {
    /// The `RemoteStore` this guard is holding the lock on, for making
    /// further calls with this guard's owner id while the lock is held.
    pub fn store(&self) -> &'a RemoteStore {
        self.store
    }

    pub fn owner(&self) -> u64 {
        self.owner
    }

    /// Sends `f`, releasing both the protocol lock and the transport lock
    /// this guard has held since `lock_guard` returned it.
    pub async fn finish(mut self) -> HkvResult<()> {
        self.released = true;
        let outcome = {
            let mut codec = self.store.transport.access().await;
            async {
                codec.write_byte(CMD_FINISH).await?;
                codec.flush().await?;
                expect_nothing(&mut codec).await
            }
            .await
        };
        self.store.exit_after(self.owner).await;
        outcome
    }
}

impl Drop for RemoteLockGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            eprintln!(
                "RemoteLockGuard for owner {} dropped without calling finish(); \
                 the remote lock and transport lock remain held",
                self.owner
            );
        }
    }
}

#[cfg(test)]
mod remote_test;
