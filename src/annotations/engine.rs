//! Annotation engine: reconciles catalog and custom nodes into map markers
//!
//! `refresh()` is the only read path. It tears both marker layers down and
//! rebuilds them from the persisted state, so every mutation below simply
//! persists its field and refreshes. Marker ids from an earlier generation
//! are rejected. A stored field that does not parse is never overwritten by
//! a mutation; the mutation fails instead.

use anyhow::{Context, Result, bail};
use std::collections::{HashMap, HashSet};

use crate::catalog::Catalog;
use crate::domain::{CUSTOM_FILTER, LatLng, Node, NodeId, NodeType};
use crate::store::{KeyValueStore, NodeStore};

use super::content::{ContextMenu, EditForm, MenuAction, NodeForm, NodeTooltip, TooltipContent};
use super::host::{
    IconSet, IconState, LayerKind, MarkerId, MarkerSink, PopupId, TooltipOptions, Translate,
    Untranslated,
};
use super::icons::SpriteIconSet;

/// Per-marker interaction state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interaction {
    /// Static tooltip, not draggable
    #[default]
    Viewing,
    /// Edit form bound, drag enabled
    Editing,
}

/// A node materialised as a marker in the current generation
#[derive(Clone, Debug)]
pub struct MarkerEntry {
    pub node: Node,
    /// Resolved type (first registered type when unknown)
    pub node_type: NodeType,
    pub is_custom: bool,
    pub is_discovered: bool,
    pub interaction: Interaction,
}

#[derive(Clone, Copy, Debug)]
struct OpenMenu {
    marker: MarkerId,
    popup: PopupId,
}

pub struct NodeEngine<S, M> {
    catalog: Catalog,
    store: NodeStore<S>,
    sink: M,
    icons: Box<dyn IconSet>,
    translator: Box<dyn Translate>,
    markers: HashMap<MarkerId, MarkerEntry>,
    /// Materialisation order of the current generation
    order: Vec<MarkerId>,
    by_node: HashMap<NodeId, MarkerId>,
    context_menu: Option<OpenMenu>,
    generation: u64,
}

impl<S: KeyValueStore, M: MarkerSink> NodeEngine<S, M> {
    /// Engine with the sprite icon set and English strings; call `mount` to render
    pub fn new(catalog: Catalog, store: S, sink: M) -> Self {
        Self {
            catalog,
            store: NodeStore::new(store),
            sink,
            icons: Box::new(SpriteIconSet),
            translator: Box::new(Untranslated),
            markers: HashMap::new(),
            order: Vec::new(),
            by_node: HashMap::new(),
            context_menu: None,
            generation: 0,
        }
    }

    pub fn with_icons(mut self, icons: impl IconSet + 'static) -> Self {
        self.icons = Box::new(icons);
        self
    }

    pub fn with_translator(mut self, translator: impl Translate + 'static) -> Self {
        self.translator = Box::new(translator);
        self
    }

    /// Attach both layer groups to the map and render the first generation
    pub fn mount(&mut self) {
        self.sink.add_layer_to_map(LayerKind::Catalog);
        self.sink.add_layer_to_map(LayerKind::Custom);
        self.refresh();
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Rebuild both marker layers from the persisted state
    pub fn refresh(&mut self) {
        let deselected_filters = self.store.deselected_filters();
        let custom_nodes = self.store.custom_nodes();
        let discovered: HashSet<NodeId> = self.store.discovered_node_ids().into_iter().collect();

        self.close_context_menu();
        self.markers.clear();
        self.order.clear();
        self.by_node.clear();
        self.sink.clear_layer(LayerKind::Custom);
        self.sink.clear_layer(LayerKind::Catalog);
        self.generation += 1;

        let show_custom = !deselected_filters.iter().any(|f| f == CUSTOM_FILTER);
        let custom_count = if show_custom { custom_nodes.len() } else { 0 };
        if show_custom {
            for node in custom_nodes {
                let is_discovered = discovered.contains(&node.id);
                self.materialize(node, true, is_discovered);
            }
        }

        let visible_catalog: Vec<Node> = self
            .catalog
            .nodes()
            .iter()
            .filter(|node| {
                match &self.catalog.resolve_type(&node.node_type).filter {
                    Some(bucket) => !deselected_filters.contains(bucket),
                    None => true,
                }
            })
            .cloned()
            .collect();
        let catalog_count = visible_catalog.len();
        for node in visible_catalog {
            let is_discovered = discovered.contains(&node.id);
            self.materialize(node, false, is_discovered);
        }

        log::debug!(
            "Refresh #{}: {} custom markers, {} catalog markers, {} filters deselected",
            self.generation,
            custom_count,
            catalog_count,
            deselected_filters.len()
        );
    }

    fn materialize(&mut self, node: Node, is_custom: bool, is_discovered: bool) {
        let node_type = self.catalog.resolve_type(&node.node_type).clone();
        let state = if is_discovered {
            IconState::Discovered
        } else {
            IconState::Normal
        };
        let icon = self
            .icons
            .icon(&node_type, is_custom, node.color.as_deref(), state);
        let layer = if is_custom {
            LayerKind::Custom
        } else {
            LayerKind::Catalog
        };

        let marker = self.sink.add_marker(layer, node.position(), icon);
        let tooltip = NodeTooltip::new(&node, &node_type, is_custom, self.translator.as_ref());
        self.sink
            .bind_tooltip(marker, TooltipContent::Info(tooltip), TooltipOptions::hover());

        self.order.push(marker);
        self.by_node.insert(node.id.clone(), marker);
        self.markers.insert(
            marker,
            MarkerEntry {
                node,
                node_type,
                is_custom,
                is_discovered,
                interaction: Interaction::Viewing,
            },
        );
    }

    // ========================================================================
    // Context menu
    // ========================================================================

    /// Open the context menu of `marker`, closing any other one first
    pub fn open_context_menu(&mut self, marker: MarkerId, at: LatLng) -> Result<()> {
        let entry = self.entry(marker)?;
        let menu = ContextMenu::new(
            marker,
            at,
            entry.is_custom,
            entry.is_discovered,
            self.translator.as_ref(),
        );

        self.close_context_menu();
        let popup = self.sink.open_popup(at, menu);
        self.context_menu = Some(OpenMenu { marker, popup });
        Ok(())
    }

    pub fn close_context_menu(&mut self) {
        if let Some(menu) = self.context_menu.take() {
            self.sink.remove_popup(menu.popup);
        }
    }

    /// Run an entry of a marker's context menu
    pub fn select_menu_action(&mut self, marker: MarkerId, action: MenuAction) -> Result<()> {
        match action {
            MenuAction::ToggleDiscovered => self.toggle_discovered_marker(marker),
            MenuAction::Edit => self.begin_edit(marker),
        }
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    pub fn toggle_discovered_marker(&mut self, marker: MarkerId) -> Result<()> {
        let id = self.entry(marker)?.node.id.clone();
        self.toggle_discovered(&id)?;
        Ok(())
    }

    /// Flip discovery of `id`, persist and refresh; returns the new state
    pub fn toggle_discovered(&mut self, id: &NodeId) -> Result<bool> {
        let mut ids = self.store.load_discovered_node_ids()?;
        let discovered = if ids.contains(id) {
            ids.retain(|d| d != id);
            false
        } else {
            ids.push(id.clone());
            true
        };
        self.store.set_discovered_node_ids(&ids)?;
        log::info!(
            "Node {} marked as {}",
            id,
            if discovered { "discovered" } else { "undiscovered" }
        );
        self.refresh();
        Ok(discovered)
    }

    // ========================================================================
    // Edit lifecycle
    // ========================================================================

    /// Bind the edit form to a custom node marker and make it draggable
    pub fn begin_edit(&mut self, marker: MarkerId) -> Result<()> {
        let entry = self.entry(marker)?;
        if !entry.is_custom {
            bail!("Node {} is not a custom node", entry.node.id);
        }
        if entry.interaction == Interaction::Editing {
            return Ok(());
        }
        let form = EditForm::new(
            &entry.node,
            self.catalog.types(),
            self.icons.as_ref(),
            self.translator.as_ref(),
        );
        let id = entry.node.id.clone();

        self.close_context_menu();
        self.sink.set_edit_ignored(marker, false);
        self.sink.unbind_tooltip(marker);
        self.sink.raise_marker(marker);
        self.sink
            .bind_tooltip(marker, TooltipContent::Form(form), TooltipOptions::form());
        self.sink.set_drag_enabled(marker, true);
        self.set_interaction(marker, Interaction::Editing);
        log::debug!("Editing custom node {}", id);
        Ok(())
    }

    /// Store the form and the dragged position, then refresh
    ///
    /// The edited node moves to the end of the custom-node list.
    pub fn save_edit(&mut self, marker: MarkerId, form: NodeForm) -> Result<()> {
        let entry = self.editing_entry(marker)?;
        form.validate()?;
        let position = self
            .sink
            .marker_position(marker)
            .unwrap_or_else(|| entry.node.position());
        let node = form.into_node(entry.node.id.clone(), &entry.node.node_type, position);
        let id = node.id.clone();

        let mut nodes = self.store.load_custom_nodes()?;
        nodes.retain(|n| n.id != id);
        nodes.push(node);
        self.store.set_custom_nodes(&nodes)?;

        self.sink.set_drag_enabled(marker, false);
        log::info!("Saved custom node {}", id);
        self.refresh();
        Ok(())
    }

    /// Delete the node being edited, then refresh
    pub fn delete_edit(&mut self, marker: MarkerId) -> Result<()> {
        let id = self.editing_entry(marker)?.node.id.clone();
        self.remove_custom_node(&id)?;
        self.sink.set_drag_enabled(marker, false);
        self.refresh();
        Ok(())
    }

    /// Drop the edit form without touching persisted state
    pub fn cancel_edit(&mut self, marker: MarkerId) -> Result<()> {
        let entry = self.editing_entry(marker)?;
        let tooltip = NodeTooltip::new(
            &entry.node,
            &entry.node_type,
            entry.is_custom,
            self.translator.as_ref(),
        );
        let id = entry.node.id.clone();

        self.sink.unbind_tooltip(marker);
        self.sink
            .bind_tooltip(marker, TooltipContent::Info(tooltip), TooltipOptions::hover());
        self.sink.set_drag_enabled(marker, false);
        self.sink.set_edit_ignored(marker, true);
        self.set_interaction(marker, Interaction::Viewing);
        log::debug!("Cancelled editing of custom node {}", id);
        Ok(())
    }

    // ========================================================================
    // Custom nodes by id
    // ========================================================================

    /// Append a new custom node at `at`, persist and refresh
    pub fn create_custom_node(&mut self, at: LatLng, form: NodeForm) -> Result<NodeId> {
        form.validate()?;
        let fallback_type = self.catalog.default_type().value.clone();
        let node = form.into_node(NodeId::generate(), &fallback_type, at);
        let id = node.id.clone();

        let mut nodes = self.store.load_custom_nodes()?;
        nodes.push(node);
        self.store.set_custom_nodes(&nodes)?;
        log::info!("Created custom node {}", id);
        self.refresh();
        Ok(id)
    }

    /// Remove a custom node by id; returns whether it existed
    pub fn delete_custom_node(&mut self, id: &NodeId) -> Result<bool> {
        let removed = self.remove_custom_node(id)?;
        if removed {
            self.refresh();
        }
        Ok(removed)
    }

    fn remove_custom_node(&mut self, id: &NodeId) -> Result<bool> {
        let mut nodes = self.store.load_custom_nodes()?;
        let before = nodes.len();
        nodes.retain(|n| &n.id != id);
        if nodes.len() == before {
            log::warn!("Custom node {} not found", id);
            return Ok(false);
        }
        self.store.set_custom_nodes(&nodes)?;
        log::info!("Deleted custom node {}", id);
        Ok(true)
    }

    // ========================================================================
    // Filters
    // ========================================================================

    /// Filter buckets offered to the user
    pub fn filter_buckets(&self) -> Vec<String> {
        self.catalog.filter_buckets()
    }

    pub fn deselected_filters(&self) -> Vec<String> {
        self.store.deselected_filters()
    }

    /// Show or hide one bucket; returns whether it is now shown
    pub fn toggle_filter(&mut self, bucket: &str) -> Result<bool> {
        let mut filters = self.store.load_deselected_filters()?;
        let shown = if filters.iter().any(|f| f == bucket) {
            filters.retain(|f| f != bucket);
            true
        } else {
            filters.push(bucket.to_string());
            false
        };
        self.store.set_deselected_filters(&filters)?;
        log::info!(
            "Filter {} {}",
            bucket,
            if shown { "selected" } else { "deselected" }
        );
        self.refresh();
        Ok(shown)
    }

    pub fn set_deselected_filters(&mut self, filters: Vec<String>) -> Result<()> {
        self.store.set_deselected_filters(&filters)?;
        self.refresh();
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn entry(&self, marker: MarkerId) -> Result<&MarkerEntry> {
        self.markers
            .get(&marker)
            .with_context(|| format!("Marker {:?} is not part of the current generation", marker))
    }

    fn editing_entry(&self, marker: MarkerId) -> Result<&MarkerEntry> {
        let entry = self.entry(marker)?;
        if entry.interaction != Interaction::Editing {
            bail!("Node {} is not being edited", entry.node.id);
        }
        Ok(entry)
    }

    fn set_interaction(&mut self, marker: MarkerId, interaction: Interaction) {
        if let Some(entry) = self.markers.get_mut(&marker) {
            entry.interaction = interaction;
        }
    }

    /// Markers of the current generation, in materialisation order
    pub fn markers(&self) -> impl Iterator<Item = (MarkerId, &MarkerEntry)> {
        self.order
            .iter()
            .filter_map(|id| self.markers.get(id).map(|entry| (*id, entry)))
    }

    pub fn marker_entry(&self, marker: MarkerId) -> Option<&MarkerEntry> {
        self.markers.get(&marker)
    }

    /// Current marker of a node, if the node is visible
    pub fn marker_for(&self, id: &NodeId) -> Option<MarkerId> {
        self.by_node.get(id).copied()
    }

    pub fn interaction(&self, marker: MarkerId) -> Option<Interaction> {
        self.markers.get(&marker).map(|entry| entry.interaction)
    }

    /// Marker whose context menu is open
    pub fn context_menu_marker(&self) -> Option<MarkerId> {
        self.context_menu.map(|menu| menu.marker)
    }

    /// Number of completed refreshes
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn custom_nodes(&self) -> Vec<Node> {
        self.store.custom_nodes()
    }

    pub fn discovered_node_ids(&self) -> Vec<NodeId> {
        self.store.discovered_node_ids()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn sink(&self) -> &M {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut M {
        &mut self.sink
    }

    pub fn store(&self) -> &S {
        self.store.backend()
    }
}
