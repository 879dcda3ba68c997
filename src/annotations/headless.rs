//! In-memory `MarkerSink` that records the scene instead of drawing it
//!
//! Used by the command-line front end and by tests to observe layer
//! membership, tooltips, drag state and open popups.

use anyhow::{Result, bail};
use std::collections::BTreeMap;

use crate::domain::LatLng;

use super::content::{ContextMenu, TooltipContent};
use super::host::{IconDescriptor, LayerKind, MarkerId, MarkerSink, PopupId, TooltipOptions};

/// Tooltip currently bound to a marker
#[derive(Clone, Debug, PartialEq)]
pub struct BoundTooltip {
    pub content: TooltipContent,
    pub options: TooltipOptions,
}

/// Recorded state of one marker
#[derive(Clone, Debug)]
pub struct HeadlessMarker {
    pub layer: LayerKind,
    pub position: LatLng,
    pub icon: IconDescriptor,
    pub tooltip: Option<BoundTooltip>,
    pub drag_enabled: bool,
    pub edit_ignored: bool,
    pub raised: bool,
}

#[derive(Debug, Default)]
pub struct HeadlessMap {
    next_id: u64,
    layers: Vec<LayerKind>,
    markers: BTreeMap<MarkerId, HeadlessMarker>,
    popups: BTreeMap<PopupId, ContextMenu>,
}

impl HeadlessMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Layer groups attached to the map
    pub fn layers_on_map(&self) -> &[LayerKind] {
        &self.layers
    }

    pub fn marker(&self, marker: MarkerId) -> Option<&HeadlessMarker> {
        self.markers.get(&marker)
    }

    /// Markers of one layer, in creation order
    pub fn markers_in(&self, layer: LayerKind) -> Vec<MarkerId> {
        self.markers
            .iter()
            .filter(|(_, m)| m.layer == layer)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn popups(&self) -> impl Iterator<Item = &ContextMenu> {
        self.popups.values()
    }

    pub fn popup_count(&self) -> usize {
        self.popups.len()
    }

    /// Simulate the user dragging a marker
    pub fn drag_marker(&mut self, marker: MarkerId, to: LatLng) -> Result<()> {
        let Some(state) = self.markers.get_mut(&marker) else {
            bail!("No marker {:?} on the map", marker);
        };
        if !state.drag_enabled {
            bail!("Marker {:?} is not draggable", marker);
        }
        state.position = to;
        Ok(())
    }

    fn with_marker(&mut self, marker: MarkerId, f: impl FnOnce(&mut HeadlessMarker)) {
        match self.markers.get_mut(&marker) {
            Some(state) => f(state),
            None => log::warn!("Ignoring operation on removed marker {:?}", marker),
        }
    }
}

impl MarkerSink for HeadlessMap {
    fn add_layer_to_map(&mut self, layer: LayerKind) {
        if !self.layers.contains(&layer) {
            self.layers.push(layer);
        }
    }

    fn clear_layer(&mut self, layer: LayerKind) {
        self.markers.retain(|_, m| m.layer != layer);
    }

    fn add_marker(&mut self, layer: LayerKind, at: LatLng, icon: IconDescriptor) -> MarkerId {
        let id = MarkerId(self.next_id());
        self.markers.insert(
            id,
            HeadlessMarker {
                layer,
                position: at,
                icon,
                tooltip: None,
                drag_enabled: false,
                edit_ignored: true,
                raised: false,
            },
        );
        id
    }

    fn bind_tooltip(&mut self, marker: MarkerId, content: TooltipContent, options: TooltipOptions) {
        self.with_marker(marker, |m| m.tooltip = Some(BoundTooltip { content, options }));
    }

    fn unbind_tooltip(&mut self, marker: MarkerId) {
        self.with_marker(marker, |m| m.tooltip = None);
    }

    fn raise_marker(&mut self, marker: MarkerId) {
        self.with_marker(marker, |m| m.raised = true);
    }

    fn set_edit_ignored(&mut self, marker: MarkerId, ignored: bool) {
        self.with_marker(marker, |m| m.edit_ignored = ignored);
    }

    fn set_drag_enabled(&mut self, marker: MarkerId, enabled: bool) {
        self.with_marker(marker, |m| m.drag_enabled = enabled);
    }

    fn marker_position(&self, marker: MarkerId) -> Option<LatLng> {
        self.markers.get(&marker).map(|m| m.position)
    }

    fn open_popup(&mut self, _at: LatLng, menu: ContextMenu) -> PopupId {
        let id = PopupId(self.next_id());
        self.popups.insert(id, menu);
        id
    }

    fn remove_popup(&mut self, popup: PopupId) {
        self.popups.remove(&popup);
    }
}
