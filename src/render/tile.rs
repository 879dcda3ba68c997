//! Tile canvas backed by a tiny-skia pixmap
//!
//! A tile is handed to the host as soon as it is requested and filled in
//! later, once its image has been fetched and decoded. Pixels are stored
//! premultiplied, as tiny-skia expects.

use anyhow::{Context, Result};
use image::RgbaImage;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tiny_skia::{ColorU8, IntSize, Pixmap, PixmapPaint, PremultipliedColorU8, Transform};

use crate::domain::TileSize;

struct TileCanvas {
    width: u32,
    height: u32,
    /// Premultiplied RGBA
    pixels: Vec<u8>,
    complete: bool,
}

/// Shared handle to one tile canvas
#[derive(Clone)]
pub struct Tile {
    inner: Arc<Mutex<TileCanvas>>,
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let canvas = self.lock();
        f.debug_struct("Tile")
            .field("width", &canvas.width)
            .field("height", &canvas.height)
            .field("complete", &canvas.complete)
            .finish()
    }
}

impl Tile {
    /// Transparent canvas of the given size
    pub fn new(size: TileSize) -> Self {
        let len = size.width as usize * size.height as usize * 4;
        Self {
            inner: Arc::new(Mutex::new(TileCanvas {
                width: size.width,
                height: size.height,
                pixels: vec![0; len],
                complete: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TileCanvas> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn size(&self) -> TileSize {
        let canvas = self.lock();
        TileSize {
            width: canvas.width,
            height: canvas.height,
        }
    }

    /// Whether an image has been drawn into the canvas
    pub fn is_complete(&self) -> bool {
        self.lock().complete
    }

    /// Decode an encoded image (PNG, JPEG, ...) and draw it
    pub fn draw_encoded(&self, bytes: &[u8]) -> Result<()> {
        let decoded = image::load_from_memory(bytes).context("Failed to decode tile image")?;
        self.draw_image(&decoded.to_rgba8())
    }

    /// Draw `img` at the canvas origin and mark the tile complete
    ///
    /// Parts of the image outside the canvas are clipped.
    pub fn draw_image(&self, img: &RgbaImage) -> Result<()> {
        let src_size =
            IntSize::from_wh(img.width(), img.height()).context("Tile image has no pixels")?;
        let src = Pixmap::from_vec(premultiply(img.as_raw()), src_size)
            .context("Tile image buffer does not match its size")?;

        let mut canvas = self.lock();
        let dst_size =
            IntSize::from_wh(canvas.width, canvas.height).context("Tile canvas has no pixels")?;
        let pixels = std::mem::take(&mut canvas.pixels);
        let mut pixmap =
            Pixmap::from_vec(pixels, dst_size).context("Tile canvas buffer is corrupt")?;

        pixmap.draw_pixmap(
            0,
            0,
            src.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );

        canvas.pixels = pixmap.take();
        canvas.complete = true;
        Ok(())
    }

    /// Canvas content as straight (non-premultiplied) RGBA
    pub fn to_rgba_image(&self) -> Result<RgbaImage> {
        let canvas = self.lock();
        RgbaImage::from_raw(canvas.width, canvas.height, demultiply(&canvas.pixels))
            .context("Tile canvas buffer does not match its size")
    }

    /// Canvas content encoded as PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let img = self.to_rgba_image()?;
        let mut buffer = Vec::new();
        write_png(&mut buffer, &img)?;
        Ok(buffer)
    }
}

fn write_png<W: io::Write>(w: W, image: &RgbaImage) -> Result<(), png::EncodingError> {
    let mut encoder = png::Encoder::new(w, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())
}

fn premultiply(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|px| {
            let color = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
            [color.red(), color.green(), color.blue(), color.alpha()]
        })
        .collect()
}

/// Invalid premultiplied pixels (a channel above alpha) come out transparent
fn demultiply(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|px| {
            let color = PremultipliedColorU8::from_rgba(px[0], px[1], px[2], px[3])
                .map(|premultiplied| premultiplied.demultiply())
                .unwrap_or(ColorU8::from_rgba(0, 0, 0, 0));
            [color.red(), color.green(), color.blue(), color.alpha()]
        })
        .collect()
}
