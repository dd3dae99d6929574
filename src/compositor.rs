//! Flattening of a [`LayerStack`] into one displayable image, and the
//! aspect-fit helpers the display surface uses to present it.

use image::imageops::{self, FilterType};

use crate::canvas::LayerStack;
use crate::pixels::{PixelBuffer, TRANSPARENT};

/// Composite every visible layer, bottom to top, into a new buffer sized
/// like the base layer.  Layers of a different size contribute only their
/// top-left-aligned overlap.  An empty stack yields a zero-size buffer.
///
/// The result never aliases layer storage, so it stays valid while the
/// stack keeps being edited.
pub fn flatten(stack: &LayerStack) -> PixelBuffer {
    let Some((width, height)) = stack.base_size() else {
        return PixelBuffer::empty();
    };
    let mut result = match PixelBuffer::new_filled(width, height, TRANSPARENT) {
        Ok(buf) => buf,
        Err(_) => return PixelBuffer::empty(),
    };

    for layer in stack.layers() {
        if !layer.visible {
            continue;
        }
        layer.pixels.composite_over(&mut result, (0, 0));
    }
    result
}

/// Largest size with the aspect ratio of `buffer` that fits in `area`.
/// Returns `(0, 0)` if either input is degenerate.
pub fn fit_size(buffer: (u32, u32), area: (u32, u32)) -> (u32, u32) {
    let (bw, bh) = buffer;
    let (aw, ah) = area;
    if bw == 0 || bh == 0 || aw == 0 || ah == 0 {
        return (0, 0);
    }
    let scale = (aw as f64 / bw as f64).min(ah as f64 / bh as f64);
    let w = ((bw as f64 * scale).round() as u32).clamp(1, aw);
    let h = ((bh as f64 * scale).round() as u32).clamp(1, ah);
    (w, h)
}

/// Resample `frame` to fit `area` while keeping its aspect ratio.
pub fn fit_to_surface(frame: &PixelBuffer, area: (u32, u32)) -> PixelBuffer {
    let (w, h) = fit_size(frame.dimensions(), area);
    if w == 0 || h == 0 {
        return PixelBuffer::empty();
    }
    if (w, h) == frame.dimensions() {
        return frame.clone();
    }
    let scaled = imageops::resize(frame.as_rgba_image(), w, h, FilterType::Triangle);
    PixelBuffer::from_rgba_image(scaled).unwrap_or_else(|_| PixelBuffer::empty())
}
