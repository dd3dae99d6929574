//! Layered raster painting core: pixel buffers, layer stacks, compositing
//! and stroke rasterization, plus the egui front end and headless CLI that
//! drive them.

#[macro_use]
pub mod logger;

pub mod app;
pub mod canvas;
pub mod cli;
pub mod commands;
pub mod compositor;
pub mod error;
pub mod io;
pub mod pixels;
pub mod project;
pub mod settings;
pub mod stroke;

pub use canvas::{Layer, LayerStack};
pub use commands::{Command, DisplaySurface, Editor, NullSurface};
pub use error::{EditorError, EditorResult};
pub use pixels::PixelBuffer;
pub use project::Document;
pub use stroke::{StrokeEngine, Tool, ToolState};
