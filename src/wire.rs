// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0

//! Wire-level constants shared by `Session` and `RemoteStore`.
//!
//! Nothing here touches I/O; this is the vocabulary both sides dispatch on.
//! The numeric error codes are part of the network protocol and must never
//! be renumbered once a server/client pair relies on them.

/// The address hkv listens on / connects to when none is given.
///
/// 8311 is delta-encoded from the alphabet indices of H, K, V — carried
/// over from the reference implementation this protocol was distilled from.
pub const DEFAULT_PORT: u16 = 8311;

// == ERROR CODES ==

pub const ERROR_UNKNOWN: u32 = 1;
pub const ERROR_NOCMD: u32 = 2;
pub const ERROR_NORESP: u32 = 3;
pub const ERROR_NOSTORE: u32 = 4;
pub const ERROR_NOKEY: u32 = 5;
pub const ERROR_BADNEST: u32 = 6;
pub const ERROR_BADTYPE: u32 = 7;
pub const ERROR_BADPATH: u32 = 8;
pub const ERROR_BADLCLASS: u32 = 9;
pub const ERROR_BADUNLOCK: u32 = 10;

// == COMMAND BYTES ==

pub const CMD_OPEN: u8 = b'o';
pub const CMD_CLOSE: u8 = b'c';
pub const CMD_BEGIN: u8 = b'b';
pub const CMD_FINISH: u8 = b'f';
pub const CMD_QUIT: u8 = b'q';
pub const CMD_GET: u8 = b'g';
pub const CMD_GET_ALL: u8 = b'G';
pub const CMD_LIST: u8 = b'l';
pub const CMD_PUT: u8 = b'p';
pub const CMD_PUT_ALL: u8 = b'P';
pub const CMD_REPLACE: u8 = b'r';
pub const CMD_DELETE: u8 = b'd';
pub const CMD_DELETE_ALL: u8 = b'D';

// == RESPONSE TAGS ==

pub const RESP_ERROR: u8 = b'e';
pub const RESP_NOTHING: u8 = b'-';
pub const RESP_BYTES: u8 = b's';
pub const RESP_LIST: u8 = b'a';
pub const RESP_MAP: u8 = b'm';

/// `list`'s listing-class bitmask.
pub const LCLASS_SCALAR: u32 = 1;
pub const LCLASS_NESTED: u32 = 2;
pub const LCLASS_ANY: u32 = 3;
const LCLASS_ALL_BITS: u32 = LCLASS_SCALAR | LCLASS_NESTED;

/// Validates a raw `lclass` bitmask read off the wire.
///
/// ## Errors
/// - `BadLClass` if any bit outside `{SCALAR, NESTED}` is set, or if the
///   mask is zero.
pub fn validate_lclass(lclass: u32) -> crate::error::HkvResult<u32> {
    if lclass == 0 || lclass & !LCLASS_ALL_BITS != 0 {
        Err(crate::error::HkvError::BadLClass { lclass })
    } else {
        Ok(lclass)
    }
}
