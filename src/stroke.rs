//! Tool selection and the pointer-driven stroke engine that turns display
//! space drags into line segments on the active layer.

use image::Rgba;

use crate::canvas::LayerStack;

/// Inclusive brush diameter range offered by the UI.
pub const BRUSH_SIZE_MIN: u32 = 1;
pub const BRUSH_SIZE_MAX: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Brush => "Brush",
            Tool::Eraser => "Eraser",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[Tool::Brush, Tool::Eraser]
    }
}

/// Tool, color and diameter chosen in the toolbar.  Read by the stroke
/// engine on every segment; never saved with a document.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToolState {
    pub tool: Tool,
    pub color: Rgba<u8>,
    size: u32,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            tool: Tool::Brush,
            color: Rgba([255, 0, 0, 255]),
            size: 5,
        }
    }
}

impl ToolState {
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Set the brush diameter, clamped to `BRUSH_SIZE_MIN..=BRUSH_SIZE_MAX`.
    pub fn set_size(&mut self, size: u32) {
        self.size = size.clamp(BRUSH_SIZE_MIN, BRUSH_SIZE_MAX);
    }

    pub fn is_eraser(&self) -> bool {
        self.tool == Tool::Eraser
    }
}

/// Map a point on a `display`-sized surface to the pixel grid of a
/// `buffer`-sized layer: each axis is scaled by `buffer / display` and
/// rounded.  Returns `None` for a zero-sized display.
pub fn display_to_buffer(
    point: (f32, f32),
    display: (u32, u32),
    buffer: (u32, u32),
) -> Option<(i32, i32)> {
    let (dw, dh) = display;
    if dw == 0 || dh == 0 {
        return None;
    }
    let scale_x = buffer.0 as f64 / dw as f64;
    let scale_y = buffer.1 as f64 / dh as f64;
    Some((
        (point.0 as f64 * scale_x).round() as i32,
        (point.1 as f64 * scale_y).round() as i32,
    ))
}

// ============================================================================
// STROKE ENGINE – Idle / Stroking state machine over pointer events
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
enum StrokeState {
    Idle,
    Stroking {
        /// Layer index captured at press time.
        target: usize,
        last_display: (f32, f32),
    },
}

/// Turns pointer gestures in display coordinates into line segments on the
/// layer that was active when the gesture started.
#[derive(Debug)]
pub struct StrokeEngine {
    state: StrokeState,
}

impl Default for StrokeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StrokeEngine {
    pub fn new() -> Self {
        Self {
            state: StrokeState::Idle,
        }
    }

    pub fn is_stroking(&self) -> bool {
        matches!(self.state, StrokeState::Stroking { .. })
    }

    /// Layer the current gesture paints on, if any.
    pub fn target_layer(&self) -> Option<usize> {
        match self.state {
            StrokeState::Stroking { target, .. } => Some(target),
            StrokeState::Idle => None,
        }
    }

    /// Start a gesture when `point` lies on the surface and a layer is
    /// active.  Returns whether a stroke began.
    pub fn pointer_down(&mut self, point: (f32, f32), display: (u32, u32), stack: &LayerStack) -> bool {
        let Some(target) = stack.active_index() else {
            return false;
        };
        let (x, y) = point;
        let on_surface =
            x >= 0.0 && y >= 0.0 && x < display.0 as f32 && y < display.1 as f32;
        if !on_surface {
            return false;
        }
        self.state = StrokeState::Stroking {
            target,
            last_display: point,
        };
        true
    }

    /// Draw the segment from the previous point to `point` on the target
    /// layer.  Scale factors are recomputed from `display` on every call.
    /// Returns whether pixels were drawn (the caller then recomposites).
    pub fn pointer_move(
        &mut self,
        point: (f32, f32),
        display: (u32, u32),
        stack: &mut LayerStack,
        tools: &ToolState,
    ) -> bool {
        let StrokeState::Stroking { target, last_display } = self.state else {
            return false;
        };
        let Some(layer) = stack.layer_mut(target) else {
            self.state = StrokeState::Idle;
            return false;
        };

        let buffer = layer.pixels.dimensions();
        let (Some(p1), Some(p2)) = (
            display_to_buffer(last_display, display, buffer),
            display_to_buffer(point, display, buffer),
        ) else {
            return false;
        };

        layer
            .pixels
            .draw_line(p1, p2, tools.color, tools.size(), tools.is_eraser());
        self.state = StrokeState::Stroking {
            target,
            last_display: point,
        };
        true
    }

    /// End the gesture.  Returns whether a stroke was in progress.
    pub fn pointer_up(&mut self) -> bool {
        let was_stroking = self.is_stroking();
        self.state = StrokeState::Idle;
        was_stroking
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::BACKGROUND_LAYER_NAME;
    use crate::pixels::PixelBuffer;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn stack(w: u32, h: u32) -> LayerStack {
        LayerStack::from_single_layer(
            PixelBuffer::new_filled(w, h, WHITE).unwrap(),
            BACKGROUND_LAYER_NAME,
        )
    }

    #[test]
    fn display_center_maps_to_buffer_center() {
        let cases = [
            ((100, 100), (100, 100)),
            ((200, 100), (400, 200)),
            ((300, 150), (100, 50)),
            ((640, 480), (1920, 1080)),
            ((50, 80), (1000, 60)),
            ((1000, 1000), (10, 10)),
        ];
        for (display, buffer) in cases {
            let center = (display.0 as f32 / 2.0, display.1 as f32 / 2.0);
            assert_eq!(
                display_to_buffer(center, display, buffer),
                Some((buffer.0 as i32 / 2, buffer.1 as i32 / 2)),
                "display {:?} buffer {:?}",
                display,
                buffer
            );
        }
    }

    #[test]
    fn transform_rounds_to_nearest_pixel() {
        assert_eq!(display_to_buffer((1.0, 1.0), (3, 3), (2, 2)), Some((1, 1)));
        assert_eq!(display_to_buffer((0.7, 0.2), (1, 1), (1, 1)), Some((1, 0)));
        assert_eq!(display_to_buffer((5.0, 5.0), (0, 10), (10, 10)), None);
    }

    #[test]
    fn tool_size_is_clamped() {
        let mut tools = ToolState::default();
        assert_eq!(tools.size(), 5);
        tools.set_size(0);
        assert_eq!(tools.size(), 1);
        tools.set_size(500);
        assert_eq!(tools.size(), 100);
    }

    #[test]
    fn press_needs_an_active_layer_and_an_on_surface_point() {
        let mut engine = StrokeEngine::new();
        assert!(!engine.pointer_down((5.0, 5.0), (10, 10), &LayerStack::new()));
        assert!(!engine.is_stroking());

        let s = stack(10, 10);
        assert!(!engine.pointer_down((10.0, 5.0), (10, 10), &s));
        assert!(!engine.pointer_down((-1.0, 5.0), (10, 10), &s));
        assert!(engine.pointer_down((9.5, 0.0), (10, 10), &s));
        assert_eq!(engine.target_layer(), Some(0));
    }

    #[test]
    fn events_while_idle_are_ignored() {
        let mut engine = StrokeEngine::new();
        let mut s = stack(10, 10);
        let before = s.layer(0).unwrap().pixels.clone();
        let tools = ToolState::default();
        assert!(!engine.pointer_move((3.0, 3.0), (10, 10), &mut s, &tools));
        assert!(!engine.pointer_up());
        assert_eq!(s.layer(0).unwrap().pixels, before);
    }

    #[test]
    fn no_drawing_after_release() {
        let mut engine = StrokeEngine::new();
        let mut s = stack(20, 20);
        let tools = ToolState::default();
        engine.pointer_down((2.0, 2.0), (20, 20), &s);
        assert!(engine.pointer_move((4.0, 2.0), (20, 20), &mut s, &tools));
        assert!(engine.pointer_up());
        let snapshot = s.layer(0).unwrap().pixels.clone();
        assert!(!engine.pointer_move((15.0, 15.0), (20, 20), &mut s, &tools));
        assert_eq!(s.layer(0).unwrap().pixels, snapshot);
    }

    #[test]
    fn moves_scale_from_display_to_buffer() {
        let mut engine = StrokeEngine::new();
        let mut s = stack(100, 100);
        let mut tools = ToolState::default();
        tools.set_size(1);

        // 50×50 surface showing a 100×100 buffer: every display pixel is two buffer pixels
        assert!(engine.pointer_down((10.0, 10.0), (50, 50), &s));
        assert!(engine.pointer_move((10.0, 20.0), (50, 50), &mut s, &tools));
        let px = &s.layer(0).unwrap().pixels;
        assert_eq!(px.get_pixel(20, 20), Some(tools.color));
        assert_eq!(px.get_pixel(20, 40), Some(tools.color));
        assert_eq!(px.get_pixel(10, 10), Some(WHITE));
    }

    #[test]
    fn resize_mid_stroke_uses_fresh_scale() {
        let mut engine = StrokeEngine::new();
        let mut s = stack(100, 100);
        let mut tools = ToolState::default();
        tools.set_size(1);

        engine.pointer_down((10.0, 10.0), (100, 100), &s);
        // Surface grew to 200×200 before the next move
        assert!(engine.pointer_move((40.0, 20.0), (200, 200), &mut s, &tools));
        let px = &s.layer(0).unwrap().pixels;
        // Both endpoints use the new 0.5 factor: (5,5) → (20,10)
        assert_eq!(px.get_pixel(5, 5), Some(tools.color));
        assert_eq!(px.get_pixel(20, 10), Some(tools.color));
        assert_eq!(px.get_pixel(40, 20), Some(WHITE));
    }

    #[test]
    fn target_layer_is_fixed_at_press_time() {
        let mut engine = StrokeEngine::new();
        let mut s = stack(10, 10);
        s.append_transparent_layer("Layer 1").unwrap();
        let tools = ToolState::default();

        engine.pointer_down((1.0, 1.0), (10, 10), &s);
        s.set_active(0);
        assert!(engine.pointer_move((8.0, 1.0), (10, 10), &mut s, &tools));
        assert!(s.layer(1).unwrap().pixels.opaque_count() > 0);
        assert_eq!(s.layer(0).unwrap().pixels.get_pixel(5, 1), Some(WHITE));
    }

    #[test]
    fn eraser_clears_the_target_layer() {
        let mut engine = StrokeEngine::new();
        let mut s = stack(10, 10);
        let tools = ToolState {
            tool: Tool::Eraser,
            ..ToolState::default()
        };
        engine.pointer_down((2.0, 5.0), (10, 10), &s);
        engine.pointer_move((7.0, 5.0), (10, 10), &mut s, &tools);
        let px = &s.layer(0).unwrap().pixels;
        for x in 2..=7 {
            assert_eq!(px.get_pixel(x, 5).unwrap()[3], 0);
        }
        assert_eq!(px.get_pixel(5, 0), Some(WHITE));
    }
}
