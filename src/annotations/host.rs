//! Contracts the annotation engine consumes from its host
//!
//! The host map widget, its icon sprites and its string table are external.
//! The engine only talks to them through the traits in this module, so any
//! rendering library can sit behind an adapter.

use crate::domain::{LatLng, NodeType};

use super::content::{ContextMenu, TooltipContent};

/// Handle of a marker created by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// Handle of a popup opened by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupId(pub u64);

/// The two marker layer groups owned by the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Built-in catalog nodes
    Catalog,
    /// User-owned nodes
    Custom,
}

/// Visual state modifier applied to a marker icon
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IconState {
    #[default]
    Normal,
    Discovered,
}

impl IconState {
    /// CSS-style modifier name
    pub fn modifier(self) -> &'static str {
        match self {
            IconState::Normal => "",
            IconState::Discovered => "discovered",
        }
    }
}

/// Everything the host needs to draw a marker icon
#[derive(Clone, Debug, PartialEq)]
pub struct IconDescriptor {
    /// Sprite reference from the node type
    pub icon: String,
    /// Class list (`node-icon`, plus `custom` and the state modifier)
    pub class_name: String,
    /// Color override, if any
    pub color: Option<String>,
    pub is_custom: bool,
    pub state: IconState,
}

/// Renderable type icon used in the edit form's type picker
#[derive(Clone, Debug, PartialEq)]
pub struct IconElement {
    pub icon: String,
    pub title: String,
}

/// Icon lookup (`getIcon` / `getIconElement`)
pub trait IconSet {
    fn icon(
        &self,
        node_type: &NodeType,
        is_custom: bool,
        color: Option<&str>,
        state: IconState,
    ) -> IconDescriptor;

    fn icon_element(&self, node_type: &NodeType) -> IconElement;
}

/// Every user-visible string the engine produces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    CustomNode,
    MenuHint,
    SetDiscovered,
    SetUndiscovered,
    EditCustomNode,
    FieldTitle,
    FieldDescription,
    FieldColor,
    FieldIcon,
    Save,
    Delete,
    Cancel,
    DragHint,
}

impl Label {
    /// Built-in English text
    pub fn text(self) -> &'static str {
        match self {
            Label::CustomNode => "Custom Node",
            Label::MenuHint => "Right-Click to open menu",
            Label::SetDiscovered => "Set as discovered",
            Label::SetUndiscovered => "Set as undiscovered",
            Label::EditCustomNode => "Edit Custom Node",
            Label::FieldTitle => "Title",
            Label::FieldDescription => "Description",
            Label::FieldColor => "Color",
            Label::FieldIcon => "Icon",
            Label::Save => "Save",
            Label::Delete => "Delete",
            Label::Cancel => "Cancel",
            Label::DragHint => "Drag icon to move the node position",
        }
    }
}

/// String lookup (`translate`)
pub trait Translate {
    fn translate(&self, label: Label) -> String {
        label.text().to_string()
    }
}

/// Returns the built-in English strings
#[derive(Clone, Copy, Debug, Default)]
pub struct Untranslated;

impl Translate for Untranslated {}

/// Where a tooltip sits relative to its anchor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Top,
    Bottom,
}

/// Placement and behavior of a bound tooltip or popup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TooltipOptions {
    pub direction: Direction,
    /// Receives pointer events
    pub interactive: bool,
    /// Stays open without hover
    pub permanent: bool,
    pub class_name: Option<&'static str>,
}

impl TooltipOptions {
    /// Static hover tooltip above the marker
    pub fn hover() -> Self {
        Self {
            direction: Direction::Top,
            interactive: false,
            permanent: false,
            class_name: None,
        }
    }

    /// Always-open edit form above the marker
    pub fn form() -> Self {
        Self {
            direction: Direction::Top,
            interactive: true,
            permanent: true,
            class_name: None,
        }
    }

    /// Context menu below the click point
    pub fn context_menu() -> Self {
        Self {
            direction: Direction::Bottom,
            interactive: true,
            permanent: true,
            class_name: Some("contextmenu"),
        }
    }
}

/// Marker primitives of the host map widget
///
/// Markers are created opted out of the widget's generic edit mode; only the
/// engine decides when a marker becomes draggable.
pub trait MarkerSink {
    /// Attach a layer group to the map
    fn add_layer_to_map(&mut self, layer: LayerKind);

    /// Remove and destroy every marker in a layer group
    fn clear_layer(&mut self, layer: LayerKind);

    fn add_marker(&mut self, layer: LayerKind, at: LatLng, icon: IconDescriptor) -> MarkerId;

    fn bind_tooltip(&mut self, marker: MarkerId, content: TooltipContent, options: TooltipOptions);

    fn unbind_tooltip(&mut self, marker: MarkerId);

    /// Re-add the marker on top of the map so its form is not covered
    fn raise_marker(&mut self, marker: MarkerId);

    /// Flip the edit-mode opt-out flag and re-initialise the marker
    fn set_edit_ignored(&mut self, marker: MarkerId, ignored: bool);

    fn set_drag_enabled(&mut self, marker: MarkerId, enabled: bool);

    /// Current (possibly dragged) position
    fn marker_position(&self, marker: MarkerId) -> Option<LatLng>;

    fn open_popup(&mut self, at: LatLng, menu: ContextMenu) -> PopupId;

    fn remove_popup(&mut self, popup: PopupId);
}
