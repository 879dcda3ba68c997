//! Editable points of interest and offset tile loading for zoomable maps

pub mod annotations;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod localize;
pub mod render;
pub mod store;
pub mod tiles;
