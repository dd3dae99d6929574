//! Fixed-size RGBA8 pixel storage with clipped drawing primitives: the
//! round-capped line used by brush and eraser strokes, and the
//! alpha-skipping copy the compositor stacks layers with.

use image::{Rgba, RgbaImage};

use crate::error::{EditorError, EditorResult};

/// Fully transparent pixel, used to initialise new layers.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

// ============================================================================
// PIXEL BUFFER – fixed-size RGBA8 grid owned by a single layer
// ============================================================================

/// Dense RGBA8 pixel grid.  Width and height are fixed at construction;
/// every draw and composite clips to `[0, width) × [0, height)`.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Allocate a `width × height` buffer, initially fully transparent.
    pub fn new(width: u32, height: u32) -> EditorResult<Self> {
        if width == 0 || height == 0 {
            return Err(EditorError::InvalidDimension { width, height });
        }
        Ok(Self {
            image: RgbaImage::new(width, height),
        })
    }

    /// Allocate a buffer with every pixel set to `color`.
    pub fn new_filled(width: u32, height: u32, color: Rgba<u8>) -> EditorResult<Self> {
        let mut buf = Self::new(width, height)?;
        buf.fill(color);
        Ok(buf)
    }

    /// Zero-size buffer; the compositor's result for an empty stack.
    pub fn empty() -> Self {
        Self {
            image: RgbaImage::new(0, 0),
        }
    }

    /// Wrap decoded pixels.  Zero-sized images are rejected.
    pub fn from_rgba_image(image: RgbaImage) -> EditorResult<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(EditorError::InvalidDimension { width, height });
        }
        Ok(Self { image })
    }

    /// Build from raw row-major RGBA bytes (project file loading).
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> EditorResult<Self> {
        if width == 0 || height == 0 {
            return Err(EditorError::InvalidDimension { width, height });
        }
        let expected = width as usize * height as usize * 4;
        let actual = data.len();
        RgbaImage::from_raw(width, height, data)
            .map(|image| Self { image })
            .ok_or_else(|| {
                EditorError::project(format!(
                    "pixel data is {} bytes, expected {} for {}x{}",
                    actual, expected, width, height
                ))
            })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Read a pixel, `None` outside the buffer.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        if x < self.width() && y < self.height() {
            Some(*self.image.get_pixel(x, y))
        } else {
            None
        }
    }

    /// Write a pixel; out-of-range coordinates are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>) {
        if x < self.width() && y < self.height() {
            self.image.put_pixel(x, y, pixel);
        }
    }

    /// Set every pixel to `color`.
    pub fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.image.pixels_mut() {
            *pixel = color;
        }
    }

    /// Rasterize a round-capped segment of diameter `stroke_width` from `p1`
    /// to `p2`.  A pixel is covered when its coordinate lies within
    /// `stroke_width / 2` of the segment.  Covered pixels are overwritten
    /// with `color`, or cleared to fully transparent when `erase` is set.
    pub fn draw_line(
        &mut self,
        p1: (i32, i32),
        p2: (i32, i32),
        color: Rgba<u8>,
        stroke_width: u32,
        erase: bool,
    ) {
        if self.is_empty() {
            return;
        }
        let radius = stroke_width.max(1) as f64 / 2.0;
        let radius_sq = radius * radius;
        let ink = if erase { TRANSPARENT } else { color };

        let (x0, y0) = (p1.0 as f64, p1.1 as f64);
        let (x1, y1) = (p2.0 as f64, p2.1 as f64);
        let (dx, dy) = (x1 - x0, y1 - y0);
        let len_sq = dx * dx + dy * dy;

        // Bounding box of the swept circle, clipped to the buffer
        let w = self.width() as i64;
        let h = self.height() as i64;
        let min_x = ((x0.min(x1) - radius).floor() as i64).max(0);
        let max_x = ((x0.max(x1) + radius).ceil() as i64).min(w - 1);
        let min_y = ((y0.min(y1) - radius).floor() as i64).max(0);
        let max_y = ((y0.max(y1) + radius).ceil() as i64).min(h - 1);
        if min_x > max_x || min_y > max_y {
            return;
        }

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let (fx, fy) = (px as f64, py as f64);
                // Closest point on the segment (degenerates to p1 for a dot)
                let t = if len_sq > 0.0 {
                    (((fx - x0) * dx + (fy - y0) * dy) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let cx = x0 + dx * t;
                let cy = y0 + dy * t;
                let dist_sq = (fx - cx) * (fx - cx) + (fy - cy) * (fy - cy);
                if dist_sq <= radius_sq {
                    self.image.put_pixel(px as u32, py as u32, ink);
                }
            }
        }
    }

    /// Copy every non-transparent pixel of `self` onto `dest`, offset by
    /// `origin`.  Pixels with zero alpha leave `dest` untouched; anything
    /// falling outside `dest` is clipped.
    pub fn composite_over(&self, dest: &mut PixelBuffer, origin: (i32, i32)) {
        let (ox, oy) = (origin.0 as i64, origin.1 as i64);
        let dw = dest.width() as i64;
        let dh = dest.height() as i64;

        // Overlap of self (shifted by origin) with dest, in source coordinates
        let sx0 = (-ox).max(0);
        let sy0 = (-oy).max(0);
        let sx1 = (self.width() as i64).min(dw - ox);
        let sy1 = (self.height() as i64).min(dh - oy);
        if sx0 >= sx1 || sy0 >= sy1 {
            return;
        }

        for sy in sy0..sy1 {
            for sx in sx0..sx1 {
                let px = *self.image.get_pixel(sx as u32, sy as u32);
                if px[3] != 0 {
                    dest.image
                        .put_pixel((sx + ox) as u32, (sy + oy) as u32, px);
                }
            }
        }
    }

    /// Number of pixels with non-zero alpha.
    pub fn opaque_count(&self) -> usize {
        self.image.pixels().filter(|p| p[3] != 0).count()
    }
}
