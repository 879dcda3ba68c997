//! Node message handlers
//!
//! Routes host events (`NodeMsg`) to the annotation engine.

use anyhow::Result;

use crate::domain::{LatLng, NodeId};
use crate::store::KeyValueStore;

use super::content::{MenuAction, NodeForm};
use super::engine::NodeEngine;
use super::host::{MarkerId, MarkerSink};

/// Every interaction the host can report
#[derive(Debug, Clone)]
pub enum NodeMsg {
    /// Right-click on a marker at a map position
    ContextMenu(MarkerId, LatLng),
    /// Entry picked from the open context menu
    MenuAction(MarkerId, MenuAction),
    /// Flip discovery of a node by id
    ToggleDiscovered(NodeId),
    /// Edit form submitted
    Save(MarkerId, NodeForm),
    /// Delete button of the edit form
    Delete(MarkerId),
    /// Cancel button of the edit form
    Cancel(MarkerId),
    /// Show or hide a filter bucket
    ToggleFilter(String),
    /// Place a new custom node
    Create(LatLng, NodeForm),
    /// Rebuild all markers
    Refresh,
}

/// Handle a NodeMsg, mutating the engine and its store
pub fn handle_node_msg<S: KeyValueStore, M: MarkerSink>(
    engine: &mut NodeEngine<S, M>,
    msg: NodeMsg,
) -> Result<()> {
    match msg {
        NodeMsg::ContextMenu(marker, at) => engine.open_context_menu(marker, at),
        NodeMsg::MenuAction(marker, action) => engine.select_menu_action(marker, action),
        NodeMsg::ToggleDiscovered(id) => engine.toggle_discovered(&id).map(|_| ()),
        NodeMsg::Save(marker, form) => engine.save_edit(marker, form),
        NodeMsg::Delete(marker) => engine.delete_edit(marker),
        NodeMsg::Cancel(marker) => engine.cancel_edit(marker),
        NodeMsg::ToggleFilter(bucket) => engine.toggle_filter(&bucket).map(|_| ()),
        NodeMsg::Create(at, form) => engine.create_custom_node(at, form).map(|_| ()),
        NodeMsg::Refresh => {
            engine.refresh();
            Ok(())
        }
    }
}
