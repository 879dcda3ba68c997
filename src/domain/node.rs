//! Point-of-interest types shared by the catalog, the store and the engine
//!
//! Positions use the map's geographic frame: `x` is longitude, `y` is latitude.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::geometry::LatLng;

/// Filter bucket that governs every custom node at once
pub const CUSTOM_FILTER: &str = "custom";

/// Stable identifier of a node
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for a user-created node
    pub fn generate() -> Self {
        Self(format!("custom-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One point of interest on the map
///
/// Whether a node is custom is not stored here: it follows from membership
/// in the persisted custom-node list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub title: String,
    /// Free text; embedded `\n` are rendered as line breaks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Key into the type registry
    #[serde(rename = "type")]
    pub node_type: String,
    /// Icon color override (`#rrggbb`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub x: f64,
    pub y: f64,
    /// Elevation, kept for catalog parity but never rendered
    #[serde(default)]
    pub z: f64,
}

impl Node {
    /// Map position of this node
    pub fn position(&self) -> LatLng {
        LatLng::new(self.y, self.x)
    }

    /// Description split into the lines it renders as
    pub fn description_lines(&self) -> Vec<String> {
        self.description
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(|text| text.split('\n').map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Registered node type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeType {
    /// Registry key referenced by `Node::node_type`
    pub value: String,
    pub title: String,
    /// Filter bucket; `None` means the type is always shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Icon reference understood by the host's icon set
    pub icon: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_json_uses_type_key() {
        let json = r#"{"id":"a1","title":"Chest","type":"chest","x":10.5,"y":-3.0,"z":12.0}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.id, NodeId::from("a1"));
        assert_eq!(node.node_type, "chest");
        assert_eq!(node.description, None);
        assert_eq!(node.position(), LatLng::new(-3.0, 10.5));

        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["type"], "chest");
        assert!(back.get("color").is_none());
    }

    #[test]
    fn test_description_lines() {
        let mut node = Node {
            id: NodeId::from("n"),
            title: "t".into(),
            description: Some("first\nsecond".into()),
            node_type: "chest".into(),
            color: None,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        };
        assert_eq!(node.description_lines(), vec!["first", "second"]);

        node.description = Some(String::new());
        assert!(node.description_lines().is_empty());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = NodeId::generate();
        let b = NodeId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("custom-"));
    }
}
