//! Canvas tile layer with offset tile indices and deferred loads
//!
//! Each requested tile gets a blank canvas right away. With a timeout set,
//! the fetch is scheduled after the delay and its cancellation handle is
//! kept under the request's zoom. A request for a different zoom than the
//! previous one cancels every delay still pending for the previous zoom;
//! requests at the same zoom never cancel each other. Once a delay fires
//! the fetch runs detached and is never cancelled.

use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use super::offsets;
use super::options::TileLayerOptions;
use super::source::{ImageRequest, ImageSource};
use super::url;
use crate::domain::{TileCoord, TileSize};
use crate::render::tile::Tile;

/// Completion callback: error (if any) first, the tile always
pub type TileDone = Box<dyn FnOnce(Option<anyhow::Error>, Tile) + Send + 'static>;

pub struct CanvasTileLayer<I> {
    url_template: String,
    options: TileLayerOptions,
    source: Arc<I>,
    runtime: Handle,
    /// Zoom the map is currently showing, `None` until known
    view_zoom: Option<i32>,
    /// Outstanding delayed loads, by zoom
    delays: HashMap<i32, Vec<AbortHandle>>,
    /// Zoom of the most recent delayed request
    delays_for_zoom: Option<i32>,
}

impl<I: ImageSource> CanvasTileLayer<I> {
    /// Create a layer; must be called inside a tokio runtime
    pub fn new(url_template: impl Into<String>, options: TileLayerOptions, source: I) -> Result<Self> {
        options.validate()?;
        let runtime = Handle::try_current().context("Tile layer needs a tokio runtime")?;
        Ok(Self {
            url_template: url_template.into(),
            options,
            source: Arc::new(source),
            runtime,
            view_zoom: None,
            delays: HashMap::new(),
            delays_for_zoom: None,
        })
    }

    pub fn options(&self) -> &TileLayerOptions {
        &self.options
    }

    /// Record the map zoom; non-finite values mean "unknown"
    pub fn set_view_zoom(&mut self, zoom: f64) {
        self.view_zoom = zoom.is_finite().then(|| zoom.round() as i32);
    }

    /// Zoom placed in the URL of a tile at `tile_zoom`, `None` while the view zoom is unknown
    ///
    /// The host requests tiles at the zoom it shows; the URL follows the
    /// tile's own zoom so the `{z}` value and the offset row always agree.
    pub fn zoom_for_url(&self, tile_zoom: i32) -> Result<Option<i32>> {
        if self.view_zoom.is_none() {
            return Ok(None);
        }
        let zoom = if self.options.zoom_reverse {
            self.options.max_zoom.checked_sub(tile_zoom)
        } else {
            Some(tile_zoom)
        };
        zoom.and_then(|z| z.checked_add(self.options.zoom_offset))
            .map(Some)
            .with_context(|| format!("URL zoom for tile zoom {} is out of range", tile_zoom))
    }

    /// Requested tile shifted by the offset table
    pub fn source_coords(&self, coords: TileCoord) -> Result<TileCoord> {
        offsets::source_coords(coords, self.options.min_zoom).ok_or_else(|| {
            anyhow!(
                "Zoom {} is outside the offset table for min_zoom {}",
                coords.z,
                self.options.min_zoom
            )
        })
    }

    /// Source URL of a tile; empty while the view zoom is unknown
    pub fn tile_url(&self, coords: TileCoord) -> Result<String> {
        let Some(url_zoom) = self.zoom_for_url(coords.z)? else {
            return Ok(String::new());
        };
        let source = self.source_coords(coords)?;
        url::expand(&self.url_template, source, url_zoom, &self.options)
    }

    /// Canvas size of every tile of this layer
    pub fn canvas_size(&self) -> TileSize {
        self.options.canvas_size()
    }

    /// Allocate a tile and schedule its load; `done` runs once the load ends
    pub fn create_tile(&mut self, coords: TileCoord, done: TileDone) -> Tile {
        let tile = Tile::new(self.canvas_size());
        let url = self.tile_url(coords);
        let source = Arc::clone(&self.source);

        let Some(timeout) = self.options.timeout() else {
            self.runtime.spawn(load_tile(source, url, tile.clone(), done));
            return tile;
        };

        let zoom = coords.z;
        if self.delays_for_zoom != Some(zoom) {
            self.clear_delays_for_zoom();
            self.delays_for_zoom = Some(zoom);
        }

        let runtime = self.runtime.clone();
        let pending_tile = tile.clone();
        let delay = self.runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            runtime.spawn(load_tile(source, url, pending_tile, done));
        });

        let pending = self.delays.entry(zoom).or_default();
        pending.retain(|handle| !handle.is_finished());
        pending.push(delay.abort_handle());
        log::trace!(
            "Scheduled tile {:?} in {:?} ({} pending at zoom {})",
            coords,
            timeout,
            pending.len(),
            zoom
        );
        tile
    }

    /// Cancel every pending delayed load of `zoom`; returns how many were still waiting
    pub fn cancel_all(&mut self, zoom: i32) -> usize {
        let Some(handles) = self.delays.remove(&zoom) else {
            return 0;
        };
        let mut cancelled = 0;
        for handle in handles {
            if !handle.is_finished() {
                cancelled += 1;
            }
            handle.abort();
        }
        if cancelled > 0 {
            log::debug!("Cancelled {} pending tile loads at zoom {}", cancelled, zoom);
        }
        cancelled
    }

    /// Delayed loads of `zoom` that have not fired yet
    pub fn pending_delays(&self, zoom: i32) -> usize {
        self.delays
            .get(&zoom)
            .map(|handles| handles.iter().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }

    fn clear_delays_for_zoom(&mut self) {
        if let Some(previous) = self.delays_for_zoom {
            self.cancel_all(previous);
        }
    }
}

impl<I> Drop for CanvasTileLayer<I> {
    fn drop(&mut self) {
        for handle in self.delays.drain().flat_map(|(_, handles)| handles) {
            handle.abort();
        }
    }
}

/// Fetch, decode and draw one tile, then report through `done`
async fn load_tile<I: ImageSource>(
    source: Arc<I>,
    url: Result<String>,
    tile: Tile,
    done: TileDone,
) {
    let url = match url {
        Ok(url) => url,
        Err(err) => {
            done(Some(err), tile);
            return;
        }
    };
    if url.is_empty() {
        log::debug!("No zoom for tile URL yet, leaving tile blank");
        done(None, tile);
        return;
    }

    let result = match source.fetch(ImageRequest::anonymous(url.clone())).await {
        Ok(bytes) => tile.draw_encoded(&bytes),
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => done(None, tile),
        Err(err) => {
            let err = err.context(format!("Tile {} failed to load", url));
            log::warn!("{:#}", err);
            done(Some(err), tile);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Serves a solid PNG for every URL and records what was asked for
    #[derive(Clone, Default)]
    struct RecordingSource {
        requests: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl RecordingSource {
        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ImageSource for RecordingSource {
        async fn fetch(&self, request: ImageRequest) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push(request.url);
            if self.fail {
                anyhow::bail!("connection refused");
            }
            let img = RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]));
            let mut bytes = Vec::new();
            img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
            Ok(bytes)
        }
    }

    type Outcome = (Option<String>, Tile);

    fn channel_done(tx: &mpsc::UnboundedSender<Outcome>) -> TileDone {
        let tx = tx.clone();
        Box::new(move |err: Option<anyhow::Error>, tile: Tile| {
            let _ = tx.send((err.map(|e| format!("{:#}", e)), tile));
        })
    }

    fn options(timeout_ms: Option<u64>) -> TileLayerOptions {
        TileLayerOptions {
            min_zoom: 0,
            max_zoom: 6,
            tile_size: 4,
            timeout_ms,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tile_url_applies_offsets() {
        let mut layer =
            CanvasTileLayer::new("{z}/{x}/{y}.png", options(None), RecordingSource::default())
                .unwrap();
        assert_eq!(layer.tile_url(TileCoord::new(10, 10, 3)).unwrap(), "");

        layer.set_view_zoom(3.0);
        assert_eq!(layer.tile_url(TileCoord::new(10, 10, 3)).unwrap(), "3/14/14.png");
        assert!(layer.tile_url(TileCoord::new(0, 0, 9)).is_err());

        layer.set_view_zoom(f64::NAN);
        assert_eq!(layer.zoom_for_url(3).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_url_zoom_follows_tile_zoom() {
        let mut layer =
            CanvasTileLayer::new("{z}/{x}/{y}", options(None), RecordingSource::default()).unwrap();
        layer.set_view_zoom(6.0);
        assert_eq!(layer.tile_url(TileCoord::new(0, 0, 5)).unwrap(), "5/16/16");
        assert_eq!(layer.tile_url(TileCoord::new(0, 0, 6)).unwrap(), "6/32/32");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zoom_for_url_reverse_and_offset() {
        let opts = TileLayerOptions {
            zoom_reverse: true,
            zoom_offset: 10,
            ..options(None)
        };
        let mut layer = CanvasTileLayer::new("{z}", opts, RecordingSource::default()).unwrap();
        assert_eq!(layer.zoom_for_url(2).unwrap(), None);
        layer.set_view_zoom(2.4);
        assert_eq!(layer.zoom_for_url(2).unwrap(), Some(6 - 2 + 10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_url_zoom_overflow_is_an_error() {
        let opts = TileLayerOptions {
            zoom_offset: i32::MAX,
            ..options(None)
        };
        let mut layer = CanvasTileLayer::new("{z}", opts, RecordingSource::default()).unwrap();
        layer.set_view_zoom(1e12);
        assert!(layer.zoom_for_url(1).is_err());
        assert!(layer.tile_url(TileCoord::new(0, 0, 1)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_options_are_rejected() {
        let opts = TileLayerOptions {
            max_zoom: 20,
            ..options(None)
        };
        assert!(CanvasTileLayer::new("{z}", opts, RecordingSource::default()).is_err());
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        assert!(CanvasTileLayer::new("{z}", options(None), RecordingSource::default()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_load_draws_tile() {
        let source = RecordingSource::default();
        let mut layer = CanvasTileLayer::new("{z}/{x}/{y}", options(None), source.clone()).unwrap();
        layer.set_view_zoom(1.0);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let tile = layer.create_tile(TileCoord::new(0, 0, 1), channel_done(&tx));
        assert_eq!(tile.size(), TileSize::square(4));

        let (err, done_tile) = rx.recv().await.unwrap();
        assert_eq!(err, None);
        assert!(done_tile.is_complete());
        assert!(tile.is_complete());
        assert_eq!(source.requests(), vec!["1/1/1".to_string()]);
        assert_eq!(layer.pending_delays(1), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_size_canvas() {
        let opts = TileLayerOptions {
            double_size: true,
            ..options(None)
        };
        let mut layer = CanvasTileLayer::new("{z}", opts, RecordingSource::default()).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let tile = layer.create_tile(TileCoord::new(0, 0, 0), channel_done(&tx));
        assert_eq!(tile.size(), TileSize::square(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_zoom_leaves_tile_blank() {
        let source = RecordingSource::default();
        let mut layer = CanvasTileLayer::new("{z}/{x}/{y}", options(None), source.clone()).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        layer.create_tile(TileCoord::new(0, 0, 1), channel_done(&tx));
        let (err, tile) = rx.recv().await.unwrap();
        assert_eq!(err, None);
        assert!(!tile.is_complete());
        assert!(source.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_reaches_done() {
        let source = RecordingSource {
            fail: true,
            ..Default::default()
        };
        let mut layer = CanvasTileLayer::new("{z}/{x}/{y}", options(None), source).unwrap();
        layer.set_view_zoom(0.0);
        let (tx, mut rx) = mpsc::unbounded_channel();

        layer.create_tile(TileCoord::new(0, 0, 0), channel_done(&tx));
        let (err, tile) = rx.recv().await.unwrap();
        assert!(err.unwrap().contains("connection refused"));
        assert!(!tile.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_load_waits_for_timeout() {
        let source = RecordingSource::default();
        let mut layer =
            CanvasTileLayer::new("{z}/{x}/{y}", options(Some(100)), source.clone()).unwrap();
        layer.set_view_zoom(2.0);
        let (tx, mut rx) = mpsc::unbounded_channel();

        layer.create_tile(TileCoord::new(0, 0, 2), channel_done(&tx));
        assert_eq!(layer.pending_delays(2), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(source.requests().is_empty());

        let (err, tile) = rx.recv().await.unwrap();
        assert_eq!(err, None);
        assert!(tile.is_complete());
        assert_eq!(source.requests(), vec!["2/2/2".to_string()]);
        assert_eq!(layer.pending_delays(2), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zoom_change_cancels_previous_zoom_only() {
        let source = RecordingSource::default();
        let mut layer =
            CanvasTileLayer::new("{z}/{x}/{y}", options(Some(100)), source.clone()).unwrap();
        layer.set_view_zoom(6.0);
        let (tx, mut rx) = mpsc::unbounded_channel();

        layer.create_tile(TileCoord::new(0, 0, 5), channel_done(&tx));
        tokio::time::sleep(Duration::from_millis(10)).await;
        layer.create_tile(TileCoord::new(0, 0, 6), channel_done(&tx));
        assert_eq!(layer.pending_delays(5), 0);
        assert_eq!(layer.pending_delays(6), 1);

        tokio::time::sleep(Duration::from_millis(10)).await;
        layer.create_tile(TileCoord::new(1, 0, 6), channel_done(&tx));
        assert_eq!(layer.pending_delays(6), 2);

        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());

        // zoom 5 never fired; both zoom 6 loads did (offset 32 at zoom 6)
        let mut requests = source.requests();
        requests.sort();
        assert_eq!(requests, vec!["6/32/32".to_string(), "6/33/32".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_and_drop() {
        let source = RecordingSource::default();
        let mut layer =
            CanvasTileLayer::new("{z}/{x}/{y}", options(Some(100)), source.clone()).unwrap();
        layer.set_view_zoom(1.0);
        let (tx, mut rx) = mpsc::unbounded_channel();

        layer.create_tile(TileCoord::new(0, 0, 1), channel_done(&tx));
        layer.create_tile(TileCoord::new(1, 0, 1), channel_done(&tx));
        assert_eq!(layer.cancel_all(1), 2);
        assert_eq!(layer.cancel_all(1), 0);

        layer.create_tile(TileCoord::new(0, 1, 1), channel_done(&tx));
        drop(layer);
        drop(tx);

        assert!(rx.recv().await.is_none());
        assert!(source.requests().is_empty());
    }
}
