// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0
//
// Test file for: src/codec.rs

use super::*;

// == UNIT TESTS: primitive round-trips over an in-memory duplex pipe ==

#[tokio::test]
async fn byte_and_u32_round_trip() {
    let (client, server) = tokio::io::duplex(64);
    let mut writer = Codec::new(client);
    let mut reader = Codec::new(server);

    writer.write_byte(b'g').await.unwrap();
    writer.write_u32(0xdead_beef).await.unwrap();
    writer.flush().await.unwrap();

    assert_eq!(reader.read_byte().await.unwrap(), b'g');
    assert_eq!(reader.read_u32().await.unwrap(), 0xdead_beef);
}

#[tokio::test]
async fn bytes_list_and_map_round_trip() {
    let (client, server) = tokio::io::duplex(256);
    let mut writer = Codec::new(client);
    let mut reader = Codec::new(server);

    writer.write_bytes(b"hello").await.unwrap();
    writer
        .write_list(&[b"a".to_vec(), b"bb".to_vec(), b"ccc".to_vec()])
        .await
        .unwrap();
    let mut map = HashMap::new();
    map.insert(b"k1".to_vec(), b"v1".to_vec());
    map.insert(b"k2".to_vec(), b"v2".to_vec());
    writer.write_map(&map).await.unwrap();
    writer.flush().await.unwrap();

    assert_eq!(reader.read_bytes().await.unwrap(), b"hello".to_vec());
    assert_eq!(
        reader.read_list().await.unwrap(),
        vec![b"a".to_vec(), b"bb".to_vec(), b"ccc".to_vec()]
    );
    assert_eq!(reader.read_map().await.unwrap(), map);
}

#[tokio::test]
async fn an_empty_list_and_map_round_trip_as_zero_counts() {
    let (client, server) = tokio::io::duplex(64);
    let mut writer = Codec::new(client);
    let mut reader = Codec::new(server);

    writer.write_list(&[]).await.unwrap();
    writer.write_map(&HashMap::new()).await.unwrap();
    writer.flush().await.unwrap();

    assert_eq!(reader.read_list().await.unwrap(), Vec::<Key>::new());
    assert_eq!(reader.read_map().await.unwrap(), HashMap::new());
}

// == UNIT TESTS: short reads are a fatal Eof ==

#[tokio::test]
async fn a_dropped_writer_mid_value_is_a_fatal_eof_for_the_reader() {
    let (client, server) = tokio::io::duplex(64);
    let mut reader = Codec::new(server);
    {
        let mut writer = Codec::new(client);
        writer.write_u32(4).await.unwrap();
        writer.stream.write_all(b"ab").await.unwrap();
        writer.flush().await.unwrap();
        // writer (and its underlying half) drops here, short of the 4 declared bytes
    }
    assert!(matches!(
        reader.read_bytes().await,
        Err(crate::error::HkvError::Eof { .. })
    ));
}
