// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0

//! Per-connection server-side state and dispatch loop.
//!
//! Every accepted `TcpStream` gets one `Session`, running in its own
//! `tokio::spawn`'d task. A session tracks which store it has opened and how
//! many nested `b` calls it currently holds, and forwards every data
//! operation to that store using its own numeric id as the reentrant lock's
//! owner — a nested data operation and an outer explicit `b`…`f` bracket
//! from the same session compose for free, since `ReentrantLock` is
//! reentrant per owner.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::net::TcpStream;

use crate::codec::Codec;
use crate::error::{HkvError, HkvResult};
use crate::server::Server;
use crate::store::{DataStore, Key, Store};
use crate::wire::*;

enum Response {
    Nothing,
    Bytes(Vec<u8>),
    List(Vec<Key>),
    Map(HashMap<Key, Vec<u8>>),
}

pub struct Session {
    id: u64,
    codec: Codec<TcpStream>,
    server: Arc<Server>,
    store: Option<Arc<Store>>,
    lock_depth: u32,
}

impl Session {
    pub(crate) fn new(id: u64, stream: TcpStream, server: Arc<Server>) -> Self {
        Session {
            id,
            codec: Codec::new(stream),
            server,
            store: None,
            lock_depth: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Runs the command loop until end-of-stream, `q`, or a fatal codec
    /// error, unwinding any held lock depth before returning.
    ///
    /// ## Errors
    /// Returns `Err` only for a genuine I/O failure; a clean end-of-stream
    /// or an explicit `q` both return `Ok(())`.
    pub async fn run(&mut self) -> HkvResult<()> {
        println!("  Session {} starting", self.id);
        let outcome = self.serve_loop().await;
        self.unwind().await;
        outcome
    }

    async fn serve_loop(&mut self) -> HkvResult<()> {
        loop {
            let cmd = match self.codec.read_byte().await {
                Ok(byte) => byte,
                Err(e) => return graceful_or_err(e),
            };

            let quit = cmd == CMD_QUIT;
            match self.dispatch(cmd).await {
                Ok(resp) => self.write_response(resp).await?,
                Err(e) if e.is_fatal() => return graceful_or_err(e),
                Err(e) => {
                    self.codec.write_byte(RESP_ERROR).await?;
                    self.codec.write_u32(e.code()).await?;
                }
            }
            self.codec.flush().await?;

            if quit {
                return Ok(());
            }
        }
    }

    /// Reads one command's arguments, acts on it, and returns the response
    /// to write. Arguments are always fully consumed from the wire before
    /// `NoStore` or any store-level error can be reported (this session's
    /// dispatch guarantee) — every arm reads its args before calling
    /// `require_store`.
    async fn dispatch(&mut self, cmd: u8) -> HkvResult<Response> {
        match cmd {
            CMD_OPEN => {
                let name = self.codec.read_bytes().await?;
                self.release_lock_depth().await;
                let store = self.server.registry.get_or_create(&name).await;
                self.store = Some(store);
                Ok(Response::Nothing)
            }
            CMD_CLOSE => {
                self.release_lock_depth().await;
                self.store = None;
                Ok(Response::Nothing)
            }
            CMD_BEGIN => {
                let store = self.require_store()?;
                store.lock(self.id).await?;
                self.lock_depth += 1;
                Ok(Response::Nothing)
            }
            CMD_FINISH => {
                let store = self.require_store()?;
                store.unlock(self.id).await?;
                self.lock_depth -= 1;
                Ok(Response::Nothing)
            }
            CMD_QUIT => Ok(Response::Nothing),
            CMD_GET => {
                let path = self.codec.read_list().await?;
                let store = self.require_store()?;
                let value = store.get(self.id, &path).await?;
                Ok(Response::Bytes(value))
            }
            CMD_GET_ALL => {
                let path = self.codec.read_list().await?;
                let store = self.require_store()?;
                let values = store.get_all(self.id, &path).await?;
                Ok(Response::Map(values))
            }
            CMD_LIST => {
                let path = self.codec.read_list().await?;
                let lclass = self.codec.read_u32().await?;
                let store = self.require_store()?;
                let items = store.list(self.id, &path, lclass).await?;
                Ok(Response::List(items))
            }
            CMD_PUT => {
                let path = self.codec.read_list().await?;
                let value = self.codec.read_bytes().await?;
                let store = self.require_store()?;
                store.put(self.id, &path, value).await?;
                Ok(Response::Nothing)
            }
            CMD_PUT_ALL => {
                let path = self.codec.read_list().await?;
                let values = self.codec.read_map().await?;
                let store = self.require_store()?;
                store.put_all(self.id, &path, values).await?;
                Ok(Response::Nothing)
            }
            CMD_REPLACE => {
                let path = self.codec.read_list().await?;
                let values = self.codec.read_map().await?;
                let store = self.require_store()?;
                store.replace(self.id, &path, values).await?;
                Ok(Response::Nothing)
            }
            CMD_DELETE => {
                let path = self.codec.read_list().await?;
                let store = self.require_store()?;
                store.delete(self.id, &path).await?;
                Ok(Response::Nothing)
            }
            CMD_DELETE_ALL => {
                let path = self.codec.read_list().await?;
                let store = self.require_store()?;
                store.delete_all(self.id, &path).await?;
                Ok(Response::Nothing)
            }
            other => Err(HkvError::NoCmd { cmd: other }),
        }
    }

    fn require_store(&self) -> HkvResult<Arc<Store>> {
        self.store.clone().ok_or(HkvError::NoStore)
    }

    /// Releases every level of this session's current lock depth against
    /// whatever store it has open right now, then resets the counter. Used
    /// by `o`/`c` (which must drop a stale bracket before switching stores)
    /// and by shutdown.
    async fn release_lock_depth(&mut self) {
        if let Some(store) = &self.store {
            for _ in 0..self.lock_depth {
                let _ = store.unlock(self.id).await;
            }
        }
        self.lock_depth = 0;
    }

    async fn unwind(&mut self) {
        self.release_lock_depth().await;
        let _ = self.codec.flush().await;
    }

    async fn write_response(&mut self, resp: Response) -> HkvResult<()> {
        match resp {
            Response::Nothing => self.codec.write_byte(RESP_NOTHING).await,
            Response::Bytes(data) => {
                self.codec.write_byte(RESP_BYTES).await?;
                self.codec.write_bytes(&data).await
            }
            Response::List(items) => {
                self.codec.write_byte(RESP_LIST).await?;
                self.codec.write_list(&items).await
            }
            Response::Map(map) => {
                self.codec.write_byte(RESP_MAP).await?;
                self.codec.write_map(&map).await
            }
        }
    }
}

/// A clean end-of-stream ends the session quietly; anything else fatal
/// (a genuine I/O failure) is reported up so the server can log it.
fn graceful_or_err(e: HkvError) -> HkvResult<()> {
    if matches!(e, HkvError::Eof { .. }) {
        Ok(())
    } else {
        Err(e)
    }
}

#[cfg(test)]
mod session_test;
