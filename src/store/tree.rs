// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0

//! Pure tree operations over a `Node`.
//!
//! Everything in this module is synchronous and lock-free: `Store` holds the
//! lock and the tree, and calls into here once it has exclusive `&mut Node`
//! access. Keeping the tree walk pure makes it trivial to test the data
//! model's edge cases without any concurrency machinery.

use std::collections::HashMap;

use crate::error::HkvError;
use crate::wire::{LCLASS_ANY, LCLASS_NESTED, LCLASS_SCALAR};

pub type Key = Vec<u8>;
pub type Path = Vec<Key>;

/// A single node in the tree: either an opaque byte string, or a nested
/// mapping of keys to child nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Scalar(Vec<u8>),
    Nested(HashMap<Key, Node>),
}

impl Node {
    /// A freshly created, empty nested node — what a store's root starts as,
    /// and what auto-creation installs at missing intermediates.
    pub fn empty_nested() -> Self {
        Node::Nested(HashMap::new())
    }

    pub fn as_nested(&self) -> Option<&HashMap<Key, Node>> {
        match self {
            Node::Nested(m) => Some(m),
            Node::Scalar(_) => None,
        }
    }

    pub fn as_nested_mut(&mut self) -> Option<&mut HashMap<Key, Node>> {
        match self {
            Node::Nested(m) => Some(m),
            Node::Scalar(_) => None,
        }
    }
}

fn path_label(path: &[Key]) -> String {
    if path.is_empty() {
        return "<root>".to_string();
    }
    path.iter()
        .map(|k| String::from_utf8_lossy(k).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walks `path` from `root`, returning the node reached after consuming all
/// keys.
///
/// ## Errors
/// - `BadNest` if a non-final path component resolves to a scalar.
/// - `NoKey` if a key is absent and `create` is false.
///
/// ## Behaviour
/// When `create` is true, a missing key installs a fresh empty `Nested`
/// child and descent continues instead of failing.
pub fn follow<'a>(root: &'a mut Node, path: &[Key], create: bool) -> Result<&'a mut Node, HkvError> {
    let mut cur = root;
    for (i, key) in path.iter().enumerate() {
        let map = cur.as_nested_mut().ok_or_else(|| HkvError::BadNest {
            path: path_label(&path[..i]),
        })?;
        if !map.contains_key(key) {
            if create {
                map.insert(key.clone(), Node::empty_nested());
            } else {
                return Err(HkvError::NoKey {
                    path: path_label(&path[..=i]),
                });
            }
        }
        cur = map.get_mut(key).expect("just inserted or present");
    }
    Ok(cur)
}

/// `split_follow` requires a non-empty path, follows the prefix, and
/// returns the parent node plus the final key.
///
/// ## Errors
/// - `BadPath` if `path` is empty.
/// - `BadNest`/`NoKey` as `follow` on the prefix.
/// - `BadNest` if the resolved prefix is not itself `Nested`.
pub fn split_follow<'a>(
    root: &'a mut Node,
    path: &[Key],
    create: bool,
) -> Result<(&'a mut HashMap<Key, Node>, &'a Key), HkvError> {
    if path.is_empty() {
        return Err(HkvError::BadPath);
    }
    let (prefix, last) = path.split_at(path.len() - 1);
    let last = &last[0];
    let parent = follow(root, prefix, create)?;
    let map = parent.as_nested_mut().ok_or_else(|| HkvError::BadNest {
        path: path_label(prefix),
    })?;
    Ok((map, last))
}

pub fn get(root: &mut Node, path: &[Key]) -> Result<Vec<u8>, HkvError> {
    match follow(root, path, false)? {
        Node::Scalar(data) => Ok(data.clone()),
        Node::Nested(_) => Err(HkvError::BadType {
            path: path_label(path),
        }),
    }
}

pub fn get_all(root: &mut Node, path: &[Key]) -> Result<HashMap<Key, Vec<u8>>, HkvError> {
    let map = follow(root, path, false)?
        .as_nested()
        .ok_or_else(|| HkvError::BadType {
            path: path_label(path),
        })?;
    Ok(map
        .iter()
        .filter_map(|(k, v)| match v {
            Node::Scalar(data) => Some((k.clone(), data.clone())),
            Node::Nested(_) => None,
        })
        .collect())
}

pub fn list(root: &mut Node, path: &[Key], lclass: u32) -> Result<Vec<Key>, HkvError> {
    let map = follow(root, path, false)?
        .as_nested()
        .ok_or_else(|| HkvError::BadType {
            path: path_label(path),
        })?;
    let lclass = crate::wire::validate_lclass(lclass)?;
    Ok(map
        .iter()
        .filter(|(_, v)| match (lclass, v) {
            (LCLASS_ANY, _) => true,
            (LCLASS_SCALAR, Node::Scalar(_)) => true,
            (LCLASS_NESTED, Node::Nested(_)) => true,
            _ => false,
        })
        .map(|(k, _)| k.clone())
        .collect())
}

pub fn put(root: &mut Node, path: &[Key], value: Vec<u8>) -> Result<(), HkvError> {
    let (map, key) = split_follow(root, path, true)?;
    map.insert(key.clone(), Node::Scalar(value));
    Ok(())
}

pub fn put_all(root: &mut Node, path: &[Key], values: HashMap<Key, Vec<u8>>) -> Result<(), HkvError> {
    let map = follow(root, path, true)?
        .as_nested_mut()
        .ok_or_else(|| HkvError::BadType {
            path: path_label(path),
        })?;
    for (k, v) in values {
        map.insert(k, Node::Scalar(v));
    }
    Ok(())
}

pub fn replace(root: &mut Node, path: &[Key], values: HashMap<Key, Vec<u8>>) -> Result<(), HkvError> {
    let (map, key) = split_follow(root, path, true)?;
    let nested = values.into_iter().map(|(k, v)| (k, Node::Scalar(v))).collect();
    map.insert(key.clone(), Node::Nested(nested));
    Ok(())
}

pub fn delete(root: &mut Node, path: &[Key]) -> Result<(), HkvError> {
    let (map, key) = split_follow(root, path, false)?;
    map.remove(key).map(|_| ()).ok_or_else(|| HkvError::NoKey {
        path: path_label(path),
    })
}

pub fn delete_all(root: &mut Node, path: &[Key]) -> Result<(), HkvError> {
    let map = follow(root, path, false)?
        .as_nested_mut()
        .ok_or_else(|| HkvError::BadType {
            path: path_label(path),
        })?;
    map.clear();
    Ok(())
}

#[cfg(test)]
mod tree_test;
