// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0

//! Closed error enumeration for hkv.
//!
//! Every failure mode the store, codec, session or remote store can produce
//! is a variant of `HkvError`. Each variant carries the numeric wire code
//! from the protocol's error table (see `wire::error_code`/`error_from_code`)
//! alongside whatever context makes the message useful. Library callers see
//! `HkvResult<T>` everywhere; the wire only ever sees the numeric code.

use thiserror::Error;

/// Standard Result type for all hkv operations.
pub type HkvResult<T> = Result<T, HkvError>;

/// Closed set of errors this crate can produce.
///
/// ## Wire codes
/// The numeric code returned by `code()` is part of the wire protocol and
/// MUST stay stable; see `wire::ERROR_UNKNOWN` and friends.
#[derive(Debug, Error)]
pub enum HkvError {
    /// Generic fallback for conditions with no more specific mapping.
    #[error("unknown error: {reason}")]
    Unknown { reason: String },

    /// Unrecognized command byte on the wire.
    #[error("no such command: {cmd:#04x}")]
    NoCmd { cmd: u8 },

    /// A response byte the client did not expect (client-side only).
    #[error("unrecognized response byte: {byte:#04x}")]
    NoResp { byte: u8 },

    /// A data operation was attempted with no store open on the session.
    #[error("no datastore opened")]
    NoStore,

    /// A path component is missing from the tree.
    #[error("no such key in path {path}")]
    NoKey { path: String },

    /// A path traverses through a scalar node.
    #[error("path traverses through a scalar at {path}")]
    BadNest { path: String },

    /// An operation was invoked on a node of the wrong variant.
    #[error("invalid value type at {path}")]
    BadType { path: String },

    /// A path required to be non-empty was empty.
    #[error("path too short (must be non-empty)")]
    BadPath,

    /// An unrecognized `list` class bitmask.
    #[error("invalid listing class: {lclass}")]
    BadLClass { lclass: u32 },

    /// `unlock` called without a matching `lock`.
    #[error("unpaired unlock")]
    BadUnlock,

    /// Codec/transport I/O failure; fatal to the session that hit it.
    #[error("I/O error during '{operation}': {reason}")]
    Io { operation: String, reason: String },

    /// Short read mid-value: the stream no longer agrees on framing.
    #[error("end of stream during '{operation}'")]
    Eof { operation: String },
}

impl HkvError {
    /// Returns the numeric wire error code for this error.
    ///
    /// ## Output
    /// - `u32`: one of the ten codes in the protocol's error table.
    pub fn code(&self) -> u32 {
        match self {
            HkvError::Unknown { .. } => crate::wire::ERROR_UNKNOWN,
            HkvError::NoCmd { .. } => crate::wire::ERROR_NOCMD,
            HkvError::NoResp { .. } => crate::wire::ERROR_NORESP,
            HkvError::NoStore => crate::wire::ERROR_NOSTORE,
            HkvError::NoKey { .. } => crate::wire::ERROR_NOKEY,
            HkvError::BadNest { .. } => crate::wire::ERROR_BADNEST,
            HkvError::BadType { .. } => crate::wire::ERROR_BADTYPE,
            HkvError::BadPath => crate::wire::ERROR_BADPATH,
            HkvError::BadLClass { .. } => crate::wire::ERROR_BADLCLASS,
            HkvError::BadUnlock => crate::wire::ERROR_BADUNLOCK,
            // I/O and framing errors never cross the wire as an error
            // response (they end the session instead), but need a code for
            // the rare case a caller serializes one generically.
            HkvError::Io { .. } | HkvError::Eof { .. } => crate::wire::ERROR_UNKNOWN,
        }
    }

    /// True if this error ends the session instead of just failing the
    /// current command.
    ///
    /// ## Behaviour
    /// `Io` and `Eof` are fatal: the session flushes best-effort, unwinds
    /// its lock depth, and closes. Every other variant is reported as an
    /// `'e'` response and the command loop continues.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HkvError::Io { .. } | HkvError::Eof { .. })
    }
}

/// Builds a `HkvError` from a numeric wire code, for the client side
/// decoding a server's error response.
///
/// ## Input
/// - `code`: the `i` value read from the wire after an `'e'` response tag.
///
/// ## Output
/// - `HkvError`: `Unknown` if the code is not one of the ten defined ones.
pub fn error_from_code(code: u32) -> HkvError {
    match code {
        crate::wire::ERROR_NOCMD => HkvError::NoCmd { cmd: 0 },
        crate::wire::ERROR_NORESP => HkvError::NoResp { byte: 0 },
        crate::wire::ERROR_NOSTORE => HkvError::NoStore,
        crate::wire::ERROR_NOKEY => HkvError::NoKey {
            path: String::new(),
        },
        crate::wire::ERROR_BADNEST => HkvError::BadNest {
            path: String::new(),
        },
        crate::wire::ERROR_BADTYPE => HkvError::BadType {
            path: String::new(),
        },
        crate::wire::ERROR_BADPATH => HkvError::BadPath,
        crate::wire::ERROR_BADLCLASS => HkvError::BadLClass { lclass: 0 },
        crate::wire::ERROR_BADUNLOCK => HkvError::BadUnlock,
        other => HkvError::Unknown {
            reason: format!("remote error code {other}"),
        },
    }
}

impl From<std::io::Error> for HkvError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            HkvError::Eof {
                operation: "read".to_string(),
            }
        } else {
            HkvError::Io {
                operation: "io".to_string(),
                reason: err.to_string(),
            }
        }
    }
}
