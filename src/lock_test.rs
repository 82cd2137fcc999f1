// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0
//
// Test file for: src/lock.rs

use super::*;
use crate::store::tree::Node;
use std::sync::Arc;
use std::time::Duration;

// == UNIT TESTS: reentrance ==

#[tokio::test]
async fn same_owner_may_enter_n_times_and_must_exit_n_times() {
    let lock = ReentrantLock::new(Node::empty_nested());
    lock.enter(1).await;
    lock.enter(1).await;
    lock.enter(1).await;
    assert!(!lock.is_idle().await);
    lock.exit(1).await.unwrap();
    lock.exit(1).await.unwrap();
    assert!(!lock.is_idle().await);
    lock.exit(1).await.unwrap();
    assert!(lock.is_idle().await);
    assert!(matches!(lock.exit(1).await, Err(HkvError::BadUnlock)));
}

#[tokio::test]
async fn unlock_by_non_holder_is_badunlock() {
    let lock = ReentrantLock::new(Node::empty_nested());
    lock.enter(1).await;
    assert!(matches!(lock.exit(2).await, Err(HkvError::BadUnlock)));
    lock.exit(1).await.unwrap();
}

// == UNIT TESTS: exclusion across owners ==

#[tokio::test]
async fn a_second_owner_blocks_until_the_first_releases() {
    let lock = Arc::new(ReentrantLock::new(Node::empty_nested()));
    lock.enter(1).await;

    let lock2 = lock.clone();
    let waiter = tokio::spawn(async move {
        lock2.enter(2).await;
        lock2.exit(2).await.unwrap();
    });

    // Give the waiter a chance to run and confirm it is blocked.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    lock.exit(1).await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should unblock once owner 1 releases")
        .unwrap();
}

#[tokio::test]
async fn with_value_mutates_under_the_lock() {
    let lock = ReentrantLock::new(Node::empty_nested());
    lock.with_value(1, |root| {
        crate::store::tree::put(root, &[b"a".to_vec()], b"v".to_vec()).unwrap();
    })
    .await;
    let value = lock
        .with_value(1, |root| crate::store::tree::get(root, &[b"a".to_vec()]))
        .await
        .unwrap();
    assert_eq!(value, b"v".to_vec());
}

// == UNIT TESTS: enter/exit split across separate calls (the RemoteLockGuard shape) ==

#[tokio::test]
async fn with_entered_value_works_between_a_separate_enter_and_exit() {
    let lock = ReentrantLock::new(Node::empty_nested());
    lock.enter(1).await;
    lock.with_entered_value(|root| {
        crate::store::tree::put(root, &[b"k".to_vec()], b"v".to_vec()).unwrap();
    })
    .await;
    let value = lock
        .with_entered_value(|root| crate::store::tree::get(root, &[b"k".to_vec()]))
        .await
        .unwrap();
    assert_eq!(value, b"v".to_vec());
    lock.exit(1).await.unwrap();
}
