//! Persistent key-value state for the annotation engine
//!
//! This module provides:
//! - The `KeyValueStore` contract (`get` with a default, `set`)
//! - `NodeStore`, the typed view over the three persisted fields
//! - A JSON file backend and an in-memory backend

pub mod file;
pub mod memory;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{Node, NodeId};

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Key holding the user's custom nodes
pub const CUSTOM_NODES: &str = "custom_nodes";
/// Key holding ids marked as discovered
pub const DISCOVERED_NODE_IDS: &str = "discovered_node_ids";
/// Key holding filter buckets the user has hidden
pub const DESELECTED_FILTERS: &str = "deselected_filters";

/// Durable key-value storage
///
/// Each `set_value` is atomic for its own key only. Nothing arbitrates
/// between writers: the last write wins.
pub trait KeyValueStore {
    /// Stored value for `key`, if any
    fn get_value(&self, key: &str) -> Option<serde_json::Value>;

    /// Replace the value for `key` and make it durable
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<()>;
}

/// Read `key`, falling back to `default` when it is missing or unreadable
pub fn get<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str, default: T) -> T {
    let Some(value) = store.get_value(key) else {
        return default;
    };
    match serde_json::from_value(value) {
        Ok(parsed) => parsed,
        Err(err) => {
            log::warn!("Stored value for {} is malformed, using default: {}", key, err);
            default
        }
    }
}

/// Read `key` ahead of rewriting it
///
/// A missing key gives `default`, but a value that does not parse is an
/// error: writing back a default would destroy what is stored.
pub fn get_for_update<T: DeserializeOwned>(
    store: &impl KeyValueStore,
    key: &str,
    default: T,
) -> Result<T> {
    match store.get_value(key) {
        Some(value) => serde_json::from_value(value)
            .with_context(|| format!("Stored value for {} is malformed, not overwriting it", key)),
        None => Ok(default),
    }
}

/// Serialize `value` and write it under `key`
pub fn set<T: Serialize>(store: &mut impl KeyValueStore, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_value(value)
        .with_context(|| format!("Failed to serialize value for {}", key))?;
    store.set_value(key, json)
}

/// Typed access to the persisted annotation state
#[derive(Debug)]
pub struct NodeStore<S> {
    backend: S,
}

impl<S: KeyValueStore> NodeStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// User-owned nodes, in iteration order
    pub fn custom_nodes(&self) -> Vec<Node> {
        get(&self.backend, CUSTOM_NODES, Vec::new())
    }

    /// Custom nodes for a read-modify-write; fails on a malformed value
    pub fn load_custom_nodes(&self) -> Result<Vec<Node>> {
        get_for_update(&self.backend, CUSTOM_NODES, Vec::new())
    }

    pub fn set_custom_nodes(&mut self, nodes: &[Node]) -> Result<()> {
        log::debug!("Persisting {} custom nodes", nodes.len());
        set(&mut self.backend, CUSTOM_NODES, &nodes)
    }

    /// Ids of nodes the user has marked as found
    pub fn discovered_node_ids(&self) -> Vec<NodeId> {
        get(&self.backend, DISCOVERED_NODE_IDS, Vec::new())
    }

    pub fn load_discovered_node_ids(&self) -> Result<Vec<NodeId>> {
        get_for_update(&self.backend, DISCOVERED_NODE_IDS, Vec::new())
    }

    pub fn set_discovered_node_ids(&mut self, ids: &[NodeId]) -> Result<()> {
        log::debug!("Persisting {} discovered node ids", ids.len());
        set(&mut self.backend, DISCOVERED_NODE_IDS, &ids)
    }

    /// Filter buckets currently hidden
    pub fn deselected_filters(&self) -> Vec<String> {
        get(&self.backend, DESELECTED_FILTERS, Vec::new())
    }

    pub fn load_deselected_filters(&self) -> Result<Vec<String>> {
        get_for_update(&self.backend, DESELECTED_FILTERS, Vec::new())
    }

    pub fn set_deselected_filters(&mut self, filters: &[String]) -> Result<()> {
        log::debug!("Persisting deselected filters: {:?}", filters);
        set(&mut self.backend, DESELECTED_FILTERS, &filters)
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn into_inner(self) -> S {
        self.backend
    }
}
