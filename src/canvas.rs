//! Layers and the ordered stack that owns them.  Index 0 is the bottom
//! layer; the active index picks where strokes land.

use crate::error::{EditorError, EditorResult};
use crate::pixels::{PixelBuffer, TRANSPARENT};

/// Name given to the single layer of a freshly opened image.
pub const BACKGROUND_LAYER_NAME: &str = "Background";

// ============================================================================
// LAYER
// ============================================================================

pub struct Layer {
    pub name: String,
    pub visible: bool,
    pub pixels: PixelBuffer,
}

impl Layer {
    pub fn new(name: impl Into<String>, pixels: PixelBuffer) -> Self {
        Self {
            name: name.into(),
            visible: true,
            pixels,
        }
    }
}

// ============================================================================
// LAYER STACK – bottom-to-top paint order plus the active selection
// ============================================================================

/// Ordered layers (index 0 is painted first) and the active layer.
///
/// `active` is `None` only while the stack is empty; otherwise it always
/// indexes an existing layer.
#[derive(Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: Option<usize>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack holding one visible layer, which becomes active.
    pub fn from_single_layer(pixels: PixelBuffer, name: impl Into<String>) -> Self {
        Self {
            layers: vec![Layer::new(name, pixels)],
            active: Some(0),
        }
    }

    /// Rebuild a stack from already-validated layers (project loading).
    /// An out-of-range `active` falls back to the top layer.
    pub fn from_layers(layers: Vec<Layer>, active: Option<usize>) -> Self {
        let active = if layers.is_empty() {
            None
        } else {
            Some(active.filter(|&i| i < layers.len()).unwrap_or(layers.len() - 1))
        };
        Self { layers, active }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    /// Dimensions of the first (base) layer.
    pub fn base_size(&self) -> Option<(u32, u32)> {
        self.layers.first().map(|l| l.pixels.dimensions())
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active.and_then(|i| self.layers.get(i))
    }

    pub fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        self.active.and_then(|i| self.layers.get_mut(i))
    }

    /// Select the active layer.  Stale indices are ignored.
    pub fn set_active(&mut self, index: usize) {
        if index < self.layers.len() {
            self.active = Some(index);
        }
    }

    /// Show or hide a layer.  Stale indices are ignored.
    pub fn set_visible(&mut self, index: usize, visible: bool) {
        if let Some(layer) = self.layers.get_mut(index) {
            layer.visible = visible;
        }
    }

    /// Auto-numbered name for the next appended layer ("Layer N", N = current count).
    pub fn next_layer_name(&self) -> String {
        format!("Layer {}", self.layers.len())
    }

    /// Append a fully transparent layer sized like the base layer and make
    /// it active.  Returns the new layer's index.
    pub fn append_transparent_layer(&mut self, name: impl Into<String>) -> EditorResult<usize> {
        let (width, height) = self.base_size().ok_or(EditorError::EmptyStack)?;
        let pixels = PixelBuffer::new_filled(width, height, TRANSPARENT)?;
        self.layers.push(Layer::new(name, pixels));
        let index = self.layers.len() - 1;
        self.active = Some(index);
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn opaque(w: u32, h: u32) -> PixelBuffer {
        PixelBuffer::new_filled(w, h, Rgba([255, 255, 255, 255])).unwrap()
    }

    #[test]
    fn single_layer_stack_is_active_and_visible() {
        let stack = LayerStack::from_single_layer(opaque(8, 6), BACKGROUND_LAYER_NAME);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.active_index(), Some(0));
        let layer = stack.active_layer().unwrap();
        assert_eq!(layer.name, "Background");
        assert!(layer.visible);
    }

    #[test]
    fn empty_stack_has_no_active_layer() {
        let mut stack = LayerStack::new();
        assert!(stack.active_layer().is_none());
        assert!(stack.active_layer_mut().is_none());
        stack.set_active(0);
        assert_eq!(stack.active_index(), None);
    }

    #[test]
    fn appending_to_an_empty_stack_fails() {
        let mut stack = LayerStack::new();
        assert!(matches!(
            stack.append_transparent_layer("Layer 0"),
            Err(EditorError::EmptyStack)
        ));
        assert!(stack.is_empty());
    }

    #[test]
    fn appended_layers_are_transparent_base_sized_and_active() {
        let mut stack = LayerStack::from_single_layer(opaque(12, 5), BACKGROUND_LAYER_NAME);
        let name = stack.next_layer_name();
        assert_eq!(name, "Layer 1");
        let idx = stack.append_transparent_layer(name).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(stack.active_index(), Some(1));

        let layer = stack.layer(1).unwrap();
        assert_eq!(layer.pixels.dimensions(), (12, 5));
        assert_eq!(layer.pixels.opaque_count(), 0);
        assert_eq!(stack.next_layer_name(), "Layer 2");
    }

    #[test]
    fn stale_indices_are_ignored() {
        let mut stack = LayerStack::from_single_layer(opaque(2, 2), BACKGROUND_LAYER_NAME);
        stack.append_transparent_layer("Layer 1").unwrap();
        stack.set_active(0);
        stack.set_active(7);
        assert_eq!(stack.active_index(), Some(0));

        stack.set_visible(9, false);
        assert!(stack.layers().iter().all(|l| l.visible));
        stack.set_visible(1, false);
        assert!(!stack.layer(1).unwrap().visible);
    }

    #[test]
    fn restored_stacks_keep_a_valid_active_index() {
        let layers = vec![Layer::new("a", opaque(2, 2)), Layer::new("b", opaque(2, 2))];
        let stack = LayerStack::from_layers(layers, Some(5));
        assert_eq!(stack.active_index(), Some(1));
        assert_eq!(LayerStack::from_layers(Vec::new(), Some(0)).active_index(), None);
    }
}
