// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0

//! Length-prefixed binary codec shared by `Session` and `RemoteStore`
//! 
//!
//! Works over any `AsyncRead + AsyncWrite` pair, not just `TcpStream`, so
//! tests can drive it over an in-memory duplex pipe. Writes are buffered;
//! callers must `flush` before a response/command is considered committed.
//! Every read consumes exactly the bytes a value declares — a short read is
//! `HkvError::Eof`, which is always fatal to whichever loop hit it.

use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};

use crate::error::HkvResult;
use crate::store::Key;

pub struct Codec<S> {
    stream: BufWriter<S>,
}

impl<S> Codec<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Codec {
            stream: BufWriter::new(stream),
        }
    }

    /// Flushes any buffered writes. Must be called before a response or
    /// command is considered committed (this codec's write-buffering
    /// rule).
    pub async fn flush(&mut self) -> HkvResult<()> {
        self.stream.flush().await?;
        Ok(())
    }

    // == `c`: single literal byte ==

    pub async fn read_byte(&mut self) -> HkvResult<u8> {
        let mut buf = [0u8; 1];
        self.stream.read_exact(&mut buf).await?;
        Ok(buf[0])
    }

    pub async fn write_byte(&mut self, byte: u8) -> HkvResult<()> {
        self.stream.write_all(&[byte]).await?;
        Ok(())
    }

    // == `i`: uint32 big-endian ==

    pub async fn read_u32(&mut self) -> HkvResult<u32> {
        let mut buf = [0u8; 4];
        self.stream.read_exact(&mut buf).await?;
        Ok(u32::from_be_bytes(buf))
    }

    pub async fn write_u32(&mut self, value: u32) -> HkvResult<()> {
        self.stream.write_all(&value.to_be_bytes()).await?;
        Ok(())
    }

    // == `s`: i-prefixed byte string ==

    pub async fn read_bytes(&mut self) -> HkvResult<Vec<u8>> {
        let len = self.read_u32().await? as usize;
        let mut buf = vec![0u8; len];
        self.stream.read_exact(&mut buf).await?;
        Ok(buf)
    }

    pub async fn write_bytes(&mut self, data: &[u8]) -> HkvResult<()> {
        self.write_u32(data.len() as u32).await?;
        self.stream.write_all(data).await?;
        Ok(())
    }

    // == `a`: i-prefixed list of `s` ==

    pub async fn read_list(&mut self) -> HkvResult<Vec<Key>> {
        let count = self.read_u32().await? as usize;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.read_bytes().await?);
        }
        Ok(items)
    }

    pub async fn write_list(&mut self, items: &[Key]) -> HkvResult<()> {
        self.write_u32(items.len() as u32).await?;
        for item in items {
            self.write_bytes(item).await?;
        }
        Ok(())
    }

    // == `m`: i-prefixed map of `s`->`s`; duplicate keys, last wins ==

    pub async fn read_map(&mut self) -> HkvResult<HashMap<Key, Vec<u8>>> {
        let count = self.read_u32().await? as usize;
        let mut map = HashMap::with_capacity(count);
        for _ in 0..count {
            let key = self.read_bytes().await?;
            let value = self.read_bytes().await?;
            map.insert(key, value);
        }
        Ok(map)
    }

    pub async fn write_map(&mut self, map: &HashMap<Key, Vec<u8>>) -> HkvResult<()> {
        self.write_u32(map.len() as u32).await?;
        for (key, value) in map {
            self.write_bytes(key).await?;
            self.write_bytes(value).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod codec_test;
