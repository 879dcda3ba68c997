//! Command-line front end
//!
//! Drives the annotation engine and the tile layer without a map widget:
//! markers go to a `HeadlessMap` and tiles are written out as PNG files.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;

use nodemap::annotations::{HeadlessMap, NodeEngine, NodeForm};
use nodemap::catalog::Catalog;
use nodemap::config::MapConfig;
use nodemap::domain::{LatLng, NodeId, TileCoord};
use nodemap::localize::FluentTranslator;
use nodemap::render::Tile;
use nodemap::store::JsonFileStore;
use nodemap::tiles::{CanvasTileLayer, DirectoryImageSource};

#[derive(Parser)]
#[command(
    name = "nodemap",
    about = "Points of interest and offset tiles for zoomable game maps",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: <config_dir>/nodemap/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the nodes currently shown on the map
    List,
    /// Toggle the discovered state of a node
    Discover {
        /// Node id
        id: String,
    },
    /// Toggle a filter bucket, or list buckets when none is given
    Filter {
        bucket: Option<String>,
    },
    /// Add a custom node
    Add {
        #[arg(long)]
        title: String,
        /// Node type (default: first registered type)
        #[arg(long = "type")]
        node_type: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        #[arg(long, default_value = "")]
        description: String,
        /// Marker color override, e.g. #ff8800
        #[arg(long, default_value = "")]
        color: String,
    },
    /// Delete a custom node
    Delete {
        /// Node id
        id: String,
    },
    /// Render one map tile to a PNG file
    Tile {
        #[arg(long)]
        z: i32,
        #[arg(long, allow_negative_numbers = true)]
        x: i32,
        #[arg(long, allow_negative_numbers = true)]
        y: i32,
        #[arg(short, long)]
        out: PathBuf,
    },
}

type Engine = NodeEngine<JsonFileStore, HeadlessMap>;

pub fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => MapConfig::load_from(path),
        None => MapConfig::load(),
    };

    match cli.command {
        Commands::List => {
            let engine = open_engine(&config)?;
            print_markers(&engine);
        }
        Commands::Discover { id } => {
            let mut engine = open_engine(&config)?;
            let discovered = engine.toggle_discovered(&NodeId::new(id.as_str()))?;
            println!(
                "{} is now {}",
                id,
                if discovered { "discovered" } else { "undiscovered" }
            );
        }
        Commands::Filter { bucket: None } => {
            let engine = open_engine(&config)?;
            let deselected = engine.deselected_filters();
            for bucket in engine.filter_buckets() {
                let mark = if deselected.contains(&bucket) { " " } else { "x" };
                println!("[{}] {}", mark, bucket);
            }
        }
        Commands::Filter { bucket: Some(bucket) } => {
            let mut engine = open_engine(&config)?;
            let shown = engine.toggle_filter(&bucket)?;
            println!("{} {}", bucket, if shown { "shown" } else { "hidden" });
        }
        Commands::Add {
            title,
            node_type,
            x,
            y,
            description,
            color,
        } => {
            let mut engine = open_engine(&config)?;
            let form = NodeForm {
                title,
                description,
                color,
                node_type,
            };
            let id = engine.create_custom_node(LatLng::new(y, x), form)?;
            println!("{}", id);
        }
        Commands::Delete { id } => {
            let mut engine = open_engine(&config)?;
            if !engine.delete_custom_node(&NodeId::new(id.as_str()))? {
                bail!("No custom node with id {}", id);
            }
        }
        Commands::Tile { z, x, y, out } => {
            render_tile(&config, TileCoord::new(x, y, z), &out)?;
            println!("Wrote {}", out.display());
        }
    }
    Ok(())
}

fn open_engine(config: &MapConfig) -> Result<Engine> {
    let catalog = Catalog::load_dir(&config.catalog_dir)?;
    let store_path = match &config.store_path {
        Some(path) => path.clone(),
        None => JsonFileStore::default_path()?,
    };
    let store = JsonFileStore::open(store_path)?;

    let mut engine =
        NodeEngine::new(catalog, store, HeadlessMap::new()).with_translator(FluentTranslator);
    engine.mount();
    Ok(engine)
}

fn print_markers(engine: &Engine) {
    for (_, entry) in engine.markers() {
        println!(
            "{:<40} {:<20} {}{}{}",
            entry.node.id.as_str(),
            entry.node_type.title,
            entry.node.title,
            if entry.is_custom { " [custom]" } else { "" },
            if entry.is_discovered { " [discovered]" } else { "" },
        );
    }
}

fn render_tile(config: &MapConfig, coords: TileCoord, out: &Path) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start tokio runtime")?;

    let tile = runtime.block_on(async {
        let source = DirectoryImageSource::new(&config.tile_root);
        let mut layer = CanvasTileLayer::new(config.tile_url.as_str(), config.tile_options(), source)?;
        layer.set_view_zoom(coords.z as f64);

        let (tx, rx) = oneshot::channel();
        layer.create_tile(
            coords,
            Box::new(move |err: Option<anyhow::Error>, tile: Tile| {
                let _ = tx.send((err, tile));
            }),
        );
        let (err, tile) = rx.await.context("Tile load was cancelled")?;
        if let Some(err) = err {
            return Err(err);
        }
        anyhow::Ok(tile)
    })?;

    if !tile.is_complete() {
        bail!("Tile {:?} has no image", coords);
    }
    let png = tile.to_png()?;
    std::fs::write(out, png).with_context(|| format!("Failed to write {}", out.display()))?;
    Ok(())
}
