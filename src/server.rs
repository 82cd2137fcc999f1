// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0

//! The TCP server: a named store registry plus an accept loop that spawns
//! one `Session` per connection.
//!
//! Logging here follows the house style of bare `println!`/`eprintln!` at
//! connection lifecycle points rather than a structured logging crate — the
//! same division of labour as `socket_server::start_socket_server`: this
//! crate is the embeddable library, not the place verbosity configuration
//! lives.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::error::HkvResult;
use crate::session::Session;
use crate::store::Store;

/// Bind parameters for `Server`. Reading argv/environment for this is the
/// external CLI collaborator's job; this crate only holds
/// the plain value.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: SocketAddr::from(([127, 0, 0, 1], crate::wire::DEFAULT_PORT)),
        }
    }
}

/// The named store registry: maps a registry name to its
/// `Store`, serialized by a lock separate from any individual store's own
/// reentrant lock. Stores are never removed once created.
pub(crate) struct Registry {
    stores: Mutex<HashMap<Vec<u8>, Arc<Store>>>,
}

impl Registry {
    fn new() -> Self {
        Registry {
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the named store, creating it if this is the first reference.
    /// Atomic with respect to concurrent sessions: the registry lock is
    /// held for the whole lookup-or-insert.
    pub(crate) async fn get_or_create(&self, name: &[u8]) -> Arc<Store> {
        let mut stores = self.stores.lock().await;
        if let Some(store) = stores.get(name) {
            return store.clone();
        }
        let store = Arc::new(Store::new(name.to_vec()));
        stores.insert(name.to_vec(), store.clone());
        store
    }
}

/// Owns the named store registry and hands out sessions. Cheap to clone
/// (everything behind it is already `Arc`); hold it in an `Arc<Server>` and
/// clone that to share across the accept loop and its spawned sessions.
pub struct Server {
    pub(crate) registry: Registry,
    next_session_id: AtomicU64,
    shutdown: Notify,
}

impl Server {
    pub fn new() -> Arc<Self> {
        Arc::new(Server {
            registry: Registry::new(),
            next_session_id: AtomicU64::new(1),
            shutdown: Notify::new(),
        })
    }

    fn next_session_id(&self) -> u64 {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Binds `addr` and spawns the accept loop as a background task,
    /// returning immediately with the bound address (useful when `addr`'s
    /// port is 0, as in tests) and a handle to the accept task.
    pub async fn listen(
        self: &Arc<Self>,
        addr: SocketAddr,
    ) -> HkvResult<(SocketAddr, JoinHandle<HkvResult<()>>)> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        println!("🚀 Starting hkv server...");
        println!("   Listening: {}", local_addr);
        println!("✓ Server ready");

        let server = self.clone();
        let handle = tokio::spawn(async move { server.accept_loop(listener).await });
        Ok((local_addr, handle))
    }

    /// Convenience entry point for `main.rs`: binds `config.addr` and runs
    /// the accept loop in the foreground until shutdown.
    pub async fn run(self: &Arc<Self>, config: ServerConfig) -> HkvResult<()> {
        let (_, handle) = self.listen(config.addr).await?;
        match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(crate::error::HkvError::Unknown {
                reason: format!("accept loop panicked: {join_err}"),
            }),
        }
    }

    /// Stops the accept loop. In-flight sessions are left to drain on their
    /// own; the store registry they reference is unaffected.
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) -> HkvResult<()> {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let id = self.next_session_id();
                            println!("  Accepted connection {id} from {peer}");
                            let server = self.clone();
                            tokio::spawn(async move {
                                let mut session = Session::new(id, stream, server);
                                match session.run().await {
                                    Ok(()) => println!("  Session {id} closed"),
                                    Err(e) => eprintln!("  Session {id} ended with error: {e}"),
                                }
                            });
                        }
                        Err(e) => {
                            eprintln!("  Transient accept error: {e}");
                            continue;
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    println!("  Listener shutting down");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod server_test;
