//! Node annotation engine
//!
//! This module provides:
//! - The engine that turns catalog and custom nodes into map markers
//! - The per-marker interaction state machine (context menu, edit form, drag)
//! - Host contracts (`MarkerSink`, `IconSet`, `Translate`) and a headless host
//! - Message handlers for NodeMsg

pub mod content;
pub mod engine;
pub mod handlers;
pub mod headless;
pub mod host;
pub mod icons;

pub use content::{ContextMenu, EditForm, FormError, MenuAction, NodeForm, NodeTooltip, TooltipContent};
pub use engine::{Interaction, MarkerEntry, NodeEngine};
pub use handlers::{NodeMsg, handle_node_msg};
pub use headless::HeadlessMap;
pub use host::{IconSet, LayerKind, MarkerId, MarkerSink, Translate, Untranslated};
pub use icons::SpriteIconSet;
