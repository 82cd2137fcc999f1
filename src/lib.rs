// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0

//! hkv - in-memory hierarchical key/value store
//!
//! This is the main library entry point for hkv. It exposes the core data
//! model and operation set (`store`), the wire codec and command table
//! shared by client and server (`codec`, `wire`), the server side
//! (`session`, `server`) and the client side (`remote`) of the network
//! protocol.

pub mod codec;
pub mod error;
mod lock;
pub mod remote;
pub mod server;
pub mod session;
pub mod store;
pub mod wire;

pub use error::{HkvError, HkvResult};
pub use remote::{RemoteLockGuard, RemoteStore};
pub use server::{Server, ServerConfig};
pub use store::{ConvertingStore, DataStore, KeyValueConversion, NullStore, Path, Store};
