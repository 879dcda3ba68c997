//! Built-in, read-only node catalog and type registry
//!
//! The catalog is loaded once (from `nodes.json` and `types.json`) and never
//! mutated afterwards.

use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::path::Path;

use crate::domain::{CUSTOM_FILTER, Node, NodeType};

/// File name of the catalog node list inside a catalog directory
pub const NODES_FILE: &str = "nodes.json";
/// File name of the type registry inside a catalog directory
pub const TYPES_FILE: &str = "types.json";

#[derive(Clone, Debug)]
pub struct Catalog {
    nodes: Vec<Node>,
    types: Vec<NodeType>,
}

impl Catalog {
    /// Build a catalog; the type registry must not be empty
    pub fn new(nodes: Vec<Node>, types: Vec<NodeType>) -> Result<Self> {
        if types.is_empty() {
            bail!("Type registry is empty");
        }

        let known: HashSet<&str> = types.iter().map(|t| t.value.as_str()).collect();
        for node in &nodes {
            if !known.contains(node.node_type.as_str()) {
                log::warn!(
                    "Catalog node {} references unknown type {:?}, falling back to {:?}",
                    node.id,
                    node.node_type,
                    types[0].value
                );
            }
        }

        log::info!(
            "Catalog loaded: {} nodes, {} types",
            nodes.len(),
            types.len()
        );
        Ok(Self { nodes, types })
    }

    /// Parse a catalog from its two JSON documents
    pub fn from_json(nodes_json: &str, types_json: &str) -> Result<Self> {
        let nodes: Vec<Node> =
            serde_json::from_str(nodes_json).context("Failed to parse catalog nodes")?;
        let types: Vec<NodeType> =
            serde_json::from_str(types_json).context("Failed to parse node types")?;
        Self::new(nodes, types)
    }

    /// Load `nodes.json` and `types.json` from `dir`
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let nodes_path = dir.join(NODES_FILE);
        let types_path = dir.join(TYPES_FILE);
        let nodes_json = std::fs::read_to_string(&nodes_path)
            .with_context(|| format!("Failed to read {}", nodes_path.display()))?;
        let types_json = std::fs::read_to_string(&types_path)
            .with_context(|| format!("Failed to read {}", types_path.display()))?;
        Self::from_json(&nodes_json, &types_json)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn types(&self) -> &[NodeType] {
        &self.types
    }

    /// Registered type with this key, if any
    pub fn find_type(&self, value: &str) -> Option<&NodeType> {
        self.types.iter().find(|t| t.value == value)
    }

    /// Registered type with this key, or the first registered type
    pub fn resolve_type(&self, value: &str) -> &NodeType {
        self.find_type(value).unwrap_or_else(|| self.default_type())
    }

    /// First registered type, used wherever a type cannot be resolved
    pub fn default_type(&self) -> &NodeType {
        &self.types[0]
    }

    /// Distinct filter buckets in registration order, then `custom`
    pub fn filter_buckets(&self) -> Vec<String> {
        let mut buckets: Vec<String> = Vec::new();
        for bucket in self.types.iter().filter_map(|t| t.filter.as_ref()) {
            if !buckets.contains(bucket) {
                buckets.push(bucket.clone());
            }
        }
        if !buckets.iter().any(|b| b == CUSTOM_FILTER) {
            buckets.push(CUSTOM_FILTER.to_string());
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: &str = r#"[
        {"value": "chest", "title": "Chest", "filter": "loot", "icon": "chest"},
        {"value": "ore", "title": "Ore", "filter": "resources", "icon": "ore"},
        {"value": "gem", "title": "Gem", "filter": "resources", "icon": "gem"},
        {"value": "spawn", "title": "Spawn", "icon": "spawn"}
    ]"#;

    const NODES: &str = r#"[
        {"id": "c1", "title": "Chest 1", "type": "chest", "x": 1, "y": 2, "z": 3},
        {"id": "o1", "title": "Iron", "type": "ore", "x": 4, "y": 5}
    ]"#;

    #[test]
    fn test_from_json() {
        let catalog = Catalog::from_json(NODES, TYPES).unwrap();
        assert_eq!(catalog.nodes().len(), 2);
        assert_eq!(catalog.types().len(), 4);
        assert_eq!(catalog.nodes()[1].z, 0.0);
    }

    #[test]
    fn test_resolve_type_falls_back_to_first() {
        let catalog = Catalog::from_json(NODES, TYPES).unwrap();
        assert_eq!(catalog.resolve_type("ore").title, "Ore");
        assert!(catalog.find_type("missing").is_none());
        assert_eq!(catalog.resolve_type("missing").value, "chest");
    }

    #[test]
    fn test_empty_registry_is_rejected() {
        assert!(Catalog::from_json(NODES, "[]").is_err());
    }

    #[test]
    fn test_filter_buckets_are_distinct_and_end_with_custom() {
        let catalog = Catalog::from_json(NODES, TYPES).unwrap();
        assert_eq!(
            catalog.filter_buckets(),
            vec!["loot".to_string(), "resources".to_string(), "custom".to_string()]
        );
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(NODES_FILE), NODES).unwrap();
        std::fs::write(dir.path().join(TYPES_FILE), TYPES).unwrap();
        let catalog = Catalog::load_dir(dir.path()).unwrap();
        assert_eq!(catalog.nodes()[0].title, "Chest 1");

        let empty = tempfile::tempdir().unwrap();
        assert!(Catalog::load_dir(empty.path()).is_err());
    }
}
