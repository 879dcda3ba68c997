//! Tooltip, context menu and edit form content
//!
//! Content is plain data; the host decides how to render it.

use std::fmt;

use crate::domain::{LatLng, Node, NodeId, NodeType};

use super::host::{IconElement, IconSet, Label, MarkerId, Translate};

/// Color offered by the edit form when the node has none
pub const DEFAULT_FORM_COLOR: &str = "#ffffff";

/// Static hover tooltip of a marker
#[derive(Clone, Debug, PartialEq)]
pub struct NodeTooltip {
    pub title: String,
    /// Type title, or the custom-node label
    pub subtitle: String,
    pub description_lines: Vec<String>,
    pub hint: String,
}

impl NodeTooltip {
    pub fn new(node: &Node, node_type: &NodeType, is_custom: bool, t: &dyn Translate) -> Self {
        let subtitle = if is_custom {
            t.translate(Label::CustomNode)
        } else {
            node_type.title.clone()
        };
        Self {
            title: node.title.clone(),
            subtitle,
            description_lines: node.description_lines(),
            hint: t.translate(Label::MenuHint),
        }
    }
}

/// One radio option of the type picker
#[derive(Clone, Debug, PartialEq)]
pub struct TypeChoice {
    pub value: String,
    pub icon: IconElement,
    pub checked: bool,
}

/// Interactive edit form bound to a custom node marker
#[derive(Clone, Debug, PartialEq)]
pub struct EditForm {
    pub node_id: NodeId,
    pub title: String,
    pub description: String,
    pub color: String,
    pub types: Vec<TypeChoice>,
    pub title_label: String,
    pub description_label: String,
    pub color_label: String,
    pub icon_label: String,
    pub save_label: String,
    pub delete_label: String,
    pub cancel_label: String,
    pub drag_hint: String,
}

impl EditForm {
    /// Form pre-filled from `node`
    pub fn new(node: &Node, types: &[NodeType], icons: &dyn IconSet, t: &dyn Translate) -> Self {
        let types = types
            .iter()
            .map(|node_type| TypeChoice {
                value: node_type.value.clone(),
                icon: icons.icon_element(node_type),
                checked: node_type.value == node.node_type,
            })
            .collect();

        Self {
            node_id: node.id.clone(),
            title: node.title.clone(),
            description: node.description.clone().unwrap_or_default(),
            color: node
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_FORM_COLOR.to_string()),
            types,
            title_label: t.translate(Label::FieldTitle),
            description_label: t.translate(Label::FieldDescription),
            color_label: t.translate(Label::FieldColor),
            icon_label: t.translate(Label::FieldIcon),
            save_label: t.translate(Label::Save),
            delete_label: t.translate(Label::Delete),
            cancel_label: t.translate(Label::Cancel),
            drag_hint: t.translate(Label::DragHint),
        }
    }

    /// Submission carrying the form's current values
    pub fn values(&self) -> NodeForm {
        NodeForm {
            title: self.title.clone(),
            description: self.description.clone(),
            color: self.color.clone(),
            node_type: self
                .types
                .iter()
                .find(|choice| choice.checked)
                .map(|choice| choice.value.clone()),
        }
    }
}

/// Either kind of content a marker tooltip can hold
#[derive(Clone, Debug, PartialEq)]
pub enum TooltipContent {
    Info(NodeTooltip),
    Form(EditForm),
}

/// Entry selected from a marker's context menu
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    ToggleDiscovered,
    Edit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MenuEntry {
    pub label: String,
    pub action: MenuAction,
}

/// Context menu of one marker
#[derive(Clone, Debug, PartialEq)]
pub struct ContextMenu {
    pub marker: MarkerId,
    pub at: LatLng,
    pub entries: Vec<MenuEntry>,
}

impl ContextMenu {
    /// Discovery toggle always, edit only for custom nodes
    pub fn new(
        marker: MarkerId,
        at: LatLng,
        is_custom: bool,
        is_discovered: bool,
        t: &dyn Translate,
    ) -> Self {
        let toggle = if is_discovered {
            Label::SetUndiscovered
        } else {
            Label::SetDiscovered
        };
        let mut entries = vec![MenuEntry {
            label: t.translate(toggle),
            action: MenuAction::ToggleDiscovered,
        }];
        if is_custom {
            entries.push(MenuEntry {
                label: t.translate(Label::EditCustomNode),
                action: MenuAction::Edit,
            });
        }
        Self {
            marker,
            at,
            entries,
        }
    }

    pub fn has_action(&self, action: MenuAction) -> bool {
        self.entries.iter().any(|entry| entry.action == action)
    }
}

/// Submitted edit form values
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeForm {
    pub title: String,
    pub description: String,
    pub color: String,
    /// Selected type; `None` keeps the node's current type
    pub node_type: Option<String>,
}

/// Local validation failure of a form submission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormError {
    TitleRequired,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::TitleRequired => f.write_str("title is required"),
        }
    }
}

impl std::error::Error for FormError {}

impl NodeForm {
    pub fn validate(&self) -> Result<(), FormError> {
        if self.title.is_empty() {
            return Err(FormError::TitleRequired);
        }
        Ok(())
    }

    /// Custom node built from this form; custom nodes always sit at `z = 0`
    pub fn into_node(self, id: NodeId, fallback_type: &str, position: LatLng) -> Node {
        Node {
            id,
            title: self.title,
            description: Some(self.description).filter(|d| !d.is_empty()),
            node_type: self
                .node_type
                .unwrap_or_else(|| fallback_type.to_string()),
            color: Some(self.color).filter(|c| !c.is_empty()),
            x: position.lng,
            y: position.lat,
            z: 0.0,
        }
    }
}
