// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0
//
// Test file for: src/session.rs
//
// Drives real `Session`s end-to-end over loopback TCP through `Server`,
// rather than calling `Session` methods directly, since the dispatch
// guarantees and cross-connection exclusion
// are properties of the whole accept-loop-plus-session pipeline.

use std::time::Duration;

use tokio::net::TcpStream;

use crate::codec::Codec;
use crate::server::Server;
use crate::wire::*;

async fn connect(addr: std::net::SocketAddr) -> Codec<TcpStream> {
    Codec::new(TcpStream::connect(addr).await.unwrap())
}

// == UNIT TESTS: open/put/get round trip and the command table ==

#[tokio::test]
async fn open_put_get_round_trips_over_the_wire() {
    let server = Server::new();
    let (addr, _handle) = server.listen("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let mut client = connect(addr).await;

    client.write_byte(CMD_OPEN).await.unwrap();
    client.write_bytes(b"orders").await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(client.read_byte().await.unwrap(), RESP_NOTHING);

    client.write_byte(CMD_PUT).await.unwrap();
    client.write_list(&[b"a".to_vec()]).await.unwrap();
    client.write_bytes(b"v").await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(client.read_byte().await.unwrap(), RESP_NOTHING);

    client.write_byte(CMD_GET).await.unwrap();
    client.write_list(&[b"a".to_vec()]).await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(client.read_byte().await.unwrap(), RESP_BYTES);
    assert_eq!(client.read_bytes().await.unwrap(), b"v".to_vec());
}

#[tokio::test]
async fn a_data_operation_with_no_store_open_is_nostore() {
    let server = Server::new();
    let (addr, _handle) = server.listen("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let mut client = connect(addr).await;

    client.write_byte(CMD_GET).await.unwrap();
    client.write_list(&[b"a".to_vec()]).await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(client.read_byte().await.unwrap(), RESP_ERROR);
    assert_eq!(client.read_u32().await.unwrap(), ERROR_NOSTORE);
}

#[tokio::test]
async fn an_error_response_does_not_desynchronize_the_stream() {
    let server = Server::new();
    let (addr, _handle) = server.listen("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let mut client = connect(addr).await;

    client.write_byte(CMD_OPEN).await.unwrap();
    client.write_bytes(b"orders").await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(client.read_byte().await.unwrap(), RESP_NOTHING);

    // A get on a missing key fails...
    client.write_byte(CMD_GET).await.unwrap();
    client.write_list(&[b"missing".to_vec()]).await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(client.read_byte().await.unwrap(), RESP_ERROR);
    assert_eq!(client.read_u32().await.unwrap(), ERROR_NOKEY);

    // ...but the next request on the same connection completes normally,
    // proving the error response left the framing intact.
    client.write_byte(CMD_PUT).await.unwrap();
    client.write_list(&[b"missing".to_vec()]).await.unwrap();
    client.write_bytes(b"v").await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(client.read_byte().await.unwrap(), RESP_NOTHING);

    client.write_byte(CMD_GET).await.unwrap();
    client.write_list(&[b"missing".to_vec()]).await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(client.read_byte().await.unwrap(), RESP_BYTES);
    assert_eq!(client.read_bytes().await.unwrap(), b"v".to_vec());
}

#[tokio::test]
async fn an_unrecognized_command_byte_is_nocmd() {
    let server = Server::new();
    let (addr, _handle) = server.listen("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let mut client = connect(addr).await;

    client.write_byte(b'?').await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(client.read_byte().await.unwrap(), RESP_ERROR);
    assert_eq!(client.read_u32().await.unwrap(), ERROR_NOCMD);
}

#[tokio::test]
async fn finish_without_a_matching_begin_is_badunlock() {
    let server = Server::new();
    let (addr, _handle) = server.listen("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let mut client = connect(addr).await;

    client.write_byte(CMD_OPEN).await.unwrap();
    client.write_bytes(b"s").await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(client.read_byte().await.unwrap(), RESP_NOTHING);

    client.write_byte(CMD_FINISH).await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(client.read_byte().await.unwrap(), RESP_ERROR);
    assert_eq!(client.read_u32().await.unwrap(), ERROR_BADUNLOCK);
}

#[tokio::test]
async fn quit_replies_then_closes_the_connection() {
    let server = Server::new();
    let (addr, _handle) = server.listen("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let mut client = connect(addr).await;

    client.write_byte(CMD_QUIT).await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(client.read_byte().await.unwrap(), RESP_NOTHING);
    assert!(matches!(
        client.read_byte().await,
        Err(crate::error::HkvError::Eof { .. })
    ));
}

// == UNIT TESTS: cross-connection mutual exclusion ==

#[tokio::test]
async fn a_begin_on_one_connection_blocks_a_second_connection_until_finish() {
    let server = Server::new();
    let (addr, _handle) = server.listen("127.0.0.1:0".parse().unwrap()).await.unwrap();

    let mut a = connect(addr).await;
    a.write_byte(CMD_OPEN).await.unwrap();
    a.write_bytes(b"shared").await.unwrap();
    a.flush().await.unwrap();
    assert_eq!(a.read_byte().await.unwrap(), RESP_NOTHING);
    a.write_byte(CMD_BEGIN).await.unwrap();
    a.flush().await.unwrap();
    assert_eq!(a.read_byte().await.unwrap(), RESP_NOTHING);

    let waiter = tokio::spawn(async move {
        let mut b = connect(addr).await;
        b.write_byte(CMD_OPEN).await.unwrap();
        b.write_bytes(b"shared").await.unwrap();
        b.flush().await.unwrap();
        assert_eq!(b.read_byte().await.unwrap(), RESP_NOTHING);

        b.write_byte(CMD_BEGIN).await.unwrap();
        b.flush().await.unwrap();
        assert_eq!(b.read_byte().await.unwrap(), RESP_NOTHING);

        b.write_byte(CMD_GET).await.unwrap();
        b.write_list(&[b"k".to_vec()]).await.unwrap();
        b.flush().await.unwrap();
        assert_eq!(b.read_byte().await.unwrap(), RESP_BYTES);
        assert_eq!(b.read_bytes().await.unwrap(), b"late".to_vec());

        b.write_byte(CMD_FINISH).await.unwrap();
        b.flush().await.unwrap();
        assert_eq!(b.read_byte().await.unwrap(), RESP_NOTHING);
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    a.write_byte(CMD_PUT).await.unwrap();
    a.write_list(&[b"k".to_vec()]).await.unwrap();
    a.write_bytes(b"late").await.unwrap();
    a.flush().await.unwrap();
    assert_eq!(a.read_byte().await.unwrap(), RESP_NOTHING);

    a.write_byte(CMD_FINISH).await.unwrap();
    a.flush().await.unwrap();
    assert_eq!(a.read_byte().await.unwrap(), RESP_NOTHING);

    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("second connection should unblock once the first finishes")
        .unwrap();
}

// == UNIT TESTS: a stale bracket is released on disconnect ==

#[tokio::test]
async fn dropping_a_connection_while_locked_releases_the_store_for_others() {
    let server = Server::new();
    let (addr, _handle) = server.listen("127.0.0.1:0".parse().unwrap()).await.unwrap();

    {
        let mut a = connect(addr).await;
        a.write_byte(CMD_OPEN).await.unwrap();
        a.write_bytes(b"orphaned").await.unwrap();
        a.flush().await.unwrap();
        assert_eq!(a.read_byte().await.unwrap(), RESP_NOTHING);
        a.write_byte(CMD_BEGIN).await.unwrap();
        a.flush().await.unwrap();
        assert_eq!(a.read_byte().await.unwrap(), RESP_NOTHING);
        // `a` drops here without a matching `f`.
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut b = connect(addr).await;
    b.write_byte(CMD_OPEN).await.unwrap();
    b.write_bytes(b"orphaned").await.unwrap();
    b.flush().await.unwrap();
    assert_eq!(b.read_byte().await.unwrap(), RESP_NOTHING);

    let acquired = tokio::time::timeout(Duration::from_secs(1), async {
        b.write_byte(CMD_BEGIN).await.unwrap();
        b.flush().await.unwrap();
        b.read_byte().await.unwrap()
    })
    .await
    .expect("the orphaned lock should have been released on disconnect");
    assert_eq!(acquired, RESP_NOTHING);
}
