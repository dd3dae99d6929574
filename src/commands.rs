//! Command dispatch: every UI action (toolbar button, layer list click,
//! pointer event) becomes a [`Command`] that the [`Editor`] applies to the
//! open document.  Keeps the core independent of the GUI toolkit.

use image::Rgba;
use std::path::{Path, PathBuf};

use crate::compositor;
use crate::error::{EditorError, EditorResult};
use crate::io::{self, SaveFormat};
use crate::pixels::PixelBuffer;
use crate::project::Document;
use crate::stroke::{StrokeEngine, Tool, ToolState};

/// Receives the flattened image whenever it changes.  The implementor
/// scales it to fit its own area.
pub trait DisplaySurface {
    fn present(&mut self, frame: &PixelBuffer);
}

/// Surface that discards frames (headless mode).
pub struct NullSurface;

impl DisplaySurface for NullSurface {
    fn present(&mut self, _frame: &PixelBuffer) {}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Open(PathBuf),
    Save { path: PathBuf, format: SaveFormat },
    NewLayer,
    SelectLayer(usize),
    SetLayerVisible(usize, bool),
    SelectTool(Tool),
    SetColor(Rgba<u8>),
    SetSize(u32),
    PointerDown(f32, f32),
    PointerMove(f32, f32),
    PointerUp,
    SurfaceResized(u32, u32),
}

impl Command {
    /// Parse one script line such as `down 10 10` or `color 255 0 0`.
    /// Blank lines and `#` comments yield `Ok(None)`.
    pub fn parse(line: &str) -> EditorResult<Option<Command>> {
        // A comment starts at any token beginning with `#`; a `#` inside a
        // token (`scans/#1.png`) is part of it.
        let mut parts = line
            .split_whitespace()
            .take_while(|token| !token.starts_with('#'));
        let Some(id) = parts.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = parts.collect();

        let cmd = match id {
            "open" => Command::Open(PathBuf::from(path_arg(id, &args)?)),
            "save" => {
                let path = PathBuf::from(path_arg(id, &args)?);
                let format = match args.get(1) {
                    Some(name) => SaveFormat::from_name(name).ok_or_else(|| {
                        EditorError::invalid_argument(format!("unknown format '{}'", name))
                    })?,
                    None => SaveFormat::from_path(&path).unwrap_or_default(),
                };
                Command::Save { path, format }
            }
            "new-layer" => Command::NewLayer,
            "select" => Command::SelectLayer(number(id, &args, 0)?),
            "show" => Command::SetLayerVisible(number(id, &args, 0)?, true),
            "hide" => Command::SetLayerVisible(number(id, &args, 0)?, false),
            "brush" => Command::SelectTool(Tool::Brush),
            "eraser" => Command::SelectTool(Tool::Eraser),
            "color" => {
                let alpha = if args.len() > 3 { number(id, &args, 3)? } else { 255 };
                Command::SetColor(Rgba([
                    number(id, &args, 0)?,
                    number(id, &args, 1)?,
                    number(id, &args, 2)?,
                    alpha,
                ]))
            }
            "size" => Command::SetSize(number(id, &args, 0)?),
            "down" => Command::PointerDown(number(id, &args, 0)?, number(id, &args, 1)?),
            "move" => Command::PointerMove(number(id, &args, 0)?, number(id, &args, 1)?),
            "up" => Command::PointerUp,
            "resize" => Command::SurfaceResized(number(id, &args, 0)?, number(id, &args, 1)?),
            other => return Err(EditorError::UnknownCommand(other.to_string())),
        };
        Ok(Some(cmd))
    }

    /// Pointer traffic is too chatty for the session log.
    fn is_pointer_event(&self) -> bool {
        matches!(
            self,
            Command::PointerDown(..) | Command::PointerMove(..) | Command::PointerUp
        )
    }
}

fn path_arg<'a>(id: &str, args: &[&'a str]) -> EditorResult<&'a str> {
    args.first()
        .copied()
        .ok_or_else(|| EditorError::invalid_argument(format!("'{}' needs a path", id)))
}

fn number<T: std::str::FromStr>(id: &str, args: &[&str], index: usize) -> EditorResult<T> {
    let raw = args.get(index).ok_or_else(|| {
        EditorError::invalid_argument(format!("'{}' is missing argument {}", id, index + 1))
    })?;
    raw.parse().map_err(|_| {
        EditorError::invalid_argument(format!("'{}': '{}' is not a valid number", id, raw))
    })
}

// ============================================================================
// EDITOR – open document, tool state, stroke engine and the current view
// ============================================================================

pub struct Editor {
    document: Option<Document>,
    pub tools: ToolState,
    stroke: StrokeEngine,
    surface_size: (u32, u32),
    flattened: PixelBuffer,
    /// JPEG quality used by `Save`.
    pub jpeg_quality: u8,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self {
            document: None,
            tools: ToolState::default(),
            stroke: StrokeEngine::new(),
            surface_size: (0, 0),
            flattened: PixelBuffer::empty(),
            jpeg_quality: 90,
        }
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Replace the open document with one built in memory.
    pub fn set_document(&mut self, document: Document, surface: &mut dyn DisplaySurface) {
        self.stroke.pointer_up();
        self.document = Some(document);
        self.refresh(surface);
    }

    /// Most recent composite of the open document.
    pub fn flattened(&self) -> &PixelBuffer {
        &self.flattened
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    /// Apply `command`.  When the visible image changes the document is
    /// recomposited and handed to `surface`.
    pub fn dispatch(&mut self, command: Command, surface: &mut dyn DisplaySurface) -> EditorResult<()> {
        if !command.is_pointer_event() {
            log_info!("command {:?}", command);
        }

        match command {
            Command::Open(path) => {
                // A failed open leaves the current document in place
                let doc = Document::open(&path)?;
                log_info!(
                    "opened {} ({}x{}, {} layer(s))",
                    path.display(),
                    doc.stack.base_size().map_or(0, |s| s.0),
                    doc.stack.base_size().map_or(0, |s| s.1),
                    doc.stack.len()
                );
                self.set_document(doc, surface);
            }
            Command::Save { path, format } => self.save(&path, format)?,
            Command::NewLayer => {
                let doc = self.document.as_mut().ok_or(EditorError::EmptyStack)?;
                let name = doc.stack.next_layer_name();
                doc.stack.append_transparent_layer(name)?;
                doc.mark_dirty();
                self.refresh(surface);
            }
            Command::SelectLayer(index) => {
                if let Some(doc) = self.document.as_mut() {
                    doc.stack.set_active(index);
                }
            }
            Command::SetLayerVisible(index, visible) => {
                if let Some(doc) = self.document.as_mut()
                    && index < doc.stack.len()
                {
                    doc.stack.set_visible(index, visible);
                    doc.mark_dirty();
                    self.refresh(surface);
                }
            }
            Command::SelectTool(tool) => self.tools.tool = tool,
            Command::SetColor(color) => self.tools.color = color,
            Command::SetSize(size) => self.tools.set_size(size),
            Command::PointerDown(x, y) => {
                if let Some(doc) = self.document.as_ref() {
                    self.stroke.pointer_down((x, y), self.surface_size, &doc.stack);
                }
            }
            Command::PointerMove(x, y) => {
                let Some(doc) = self.document.as_mut() else {
                    return Ok(());
                };
                if self
                    .stroke
                    .pointer_move((x, y), self.surface_size, &mut doc.stack, &self.tools)
                {
                    doc.mark_dirty();
                    self.refresh(surface);
                }
            }
            Command::PointerUp => {
                self.stroke.pointer_up();
            }
            Command::SurfaceResized(width, height) => {
                self.surface_size = (width, height);
                self.refresh(surface);
            }
        }
        Ok(())
    }

    fn save(&mut self, path: &Path, format: SaveFormat) -> EditorResult<()> {
        let doc = self.document.as_mut().ok_or(EditorError::EmptyStack)?;
        match format {
            SaveFormat::Project => io::save_project(&doc.stack, path)?,
            _ => {
                self.flattened = compositor::flatten(&doc.stack);
                io::encode(&self.flattened, path, format, self.jpeg_quality)?;
            }
        }
        doc.saved_as(path);
        log_info!("saved {} as {}", path.display(), format.label());
        Ok(())
    }

    /// Recompute the flattened view and present it.
    fn refresh(&mut self, surface: &mut dyn DisplaySurface) {
        let Some(doc) = self.document.as_ref() else {
            return;
        };
        self.flattened = compositor::flatten(&doc.stack);
        surface.present(&self.flattened);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::BACKGROUND_LAYER_NAME;

    #[derive(Default)]
    struct CountingSurface {
        frames: usize,
        last_size: (u32, u32),
    }

    impl DisplaySurface for CountingSurface {
        fn present(&mut self, frame: &PixelBuffer) {
            self.frames += 1;
            self.last_size = frame.dimensions();
        }
    }

    fn editor_with(w: u32, h: u32) -> (Editor, CountingSurface) {
        let mut editor = Editor::new();
        let mut surface = CountingSurface::default();
        let buf = PixelBuffer::new_filled(w, h, Rgba([255, 255, 255, 255])).unwrap();
        editor.set_document(Document::from_buffer(buf), &mut surface);
        editor
            .dispatch(Command::SurfaceResized(w, h), &mut surface)
            .unwrap();
        (editor, surface)
    }

    #[test]
    fn script_lines_parse_into_commands() {
        assert_eq!(Command::parse("  # just a note").unwrap(), None);
        assert_eq!(Command::parse("").unwrap(), None);
        assert_eq!(
            Command::parse("down 10 12.5").unwrap(),
            Some(Command::PointerDown(10.0, 12.5))
        );
        assert_eq!(
            Command::parse("color 1 2 3").unwrap(),
            Some(Command::SetColor(Rgba([1, 2, 3, 255])))
        );
        assert_eq!(
            Command::parse("hide 2 # top layer").unwrap(),
            Some(Command::SetLayerVisible(2, false))
        );
        assert_eq!(
            Command::parse("save out/flat.jpg").unwrap(),
            Some(Command::Save {
                path: PathBuf::from("out/flat.jpg"),
                format: SaveFormat::Jpeg
            })
        );
        assert_eq!(Command::parse("eraser").unwrap(), Some(Command::SelectTool(Tool::Eraser)));
    }

    #[test]
    fn hash_inside_a_path_is_not_a_comment() {
        assert_eq!(
            Command::parse("open scans/#1.png").unwrap(),
            Some(Command::Open(PathBuf::from("scans/#1.png")))
        );
        assert_eq!(
            Command::parse("save out#2.png bmp # keep alpha").unwrap(),
            Some(Command::Save {
                path: PathBuf::from("out#2.png"),
                format: SaveFormat::Bmp
            })
        );
        assert_eq!(
            Command::parse("save out#2.jpg").unwrap(),
            Some(Command::Save {
                path: PathBuf::from("out#2.jpg"),
                format: SaveFormat::Jpeg
            })
        );
        assert_eq!(Command::parse("#down 1 1").unwrap(), None);
    }

    #[test]
    fn bad_script_lines_are_rejected() {
        assert!(matches!(
            Command::parse("teleport 1 2"),
            Err(EditorError::UnknownCommand(_))
        ));
        assert!(matches!(
            Command::parse("size big"),
            Err(EditorError::InvalidArgument(_))
        ));
        assert!(matches!(
            Command::parse("move 3"),
            Err(EditorError::InvalidArgument(_))
        ));
        assert!(matches!(
            Command::parse("color 300 0 0"),
            Err(EditorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn commands_without_a_document_do_nothing() {
        let mut editor = Editor::new();
        let mut surface = CountingSurface::default();
        assert!(matches!(
            editor.dispatch(Command::NewLayer, &mut surface),
            Err(EditorError::EmptyStack)
        ));
        for cmd in [
            Command::PointerDown(1.0, 1.0),
            Command::PointerMove(2.0, 2.0),
            Command::PointerUp,
            Command::SelectLayer(3),
            Command::SetLayerVisible(0, false),
        ] {
            editor.dispatch(cmd, &mut surface).unwrap();
        }
        assert_eq!(surface.frames, 0);
        assert!(editor.flattened().is_empty());
    }

    #[test]
    fn new_layer_appends_and_presents() {
        let (mut editor, mut surface) = editor_with(8, 8);
        let before = surface.frames;
        editor.dispatch(Command::NewLayer, &mut surface).unwrap();
        let doc = editor.document().unwrap();
        assert_eq!(doc.stack.len(), 2);
        assert_eq!(doc.stack.layer(1).unwrap().name, "Layer 1");
        assert_eq!(doc.stack.active_index(), Some(1));
        assert!(doc.is_dirty);
        assert_eq!(surface.frames, before + 1);
        assert_eq!(surface.last_size, (8, 8));
    }

    #[test]
    fn tool_commands_update_tool_state() {
        let (mut editor, mut surface) = editor_with(4, 4);
        editor.dispatch(Command::SelectTool(Tool::Eraser), &mut surface).unwrap();
        editor.dispatch(Command::SetSize(250), &mut surface).unwrap();
        editor
            .dispatch(Command::SetColor(Rgba([0, 9, 0, 255])), &mut surface)
            .unwrap();
        assert_eq!(editor.tools.tool, Tool::Eraser);
        assert_eq!(editor.tools.size(), 100);
        assert_eq!(editor.tools.color, Rgba([0, 9, 0, 255]));
    }

    #[test]
    fn each_stroke_segment_recomposites() {
        let (mut editor, mut surface) = editor_with(30, 30);
        editor.dispatch(Command::SetSize(1), &mut surface).unwrap();
        let start = surface.frames;
        editor.dispatch(Command::PointerDown(2.0, 2.0), &mut surface).unwrap();
        editor.dispatch(Command::PointerMove(10.0, 2.0), &mut surface).unwrap();
        editor.dispatch(Command::PointerMove(10.0, 10.0), &mut surface).unwrap();
        editor.dispatch(Command::PointerUp, &mut surface).unwrap();
        editor.dispatch(Command::PointerMove(20.0, 20.0), &mut surface).unwrap();

        assert_eq!(surface.frames, start + 2);
        let red = editor.tools.color;
        assert_eq!(editor.flattened().get_pixel(6, 2), Some(red));
        assert_eq!(editor.flattened().get_pixel(10, 6), Some(red));
        assert_eq!(editor.flattened().get_pixel(15, 15), Some(Rgba([255, 255, 255, 255])));
        assert!(editor.document().unwrap().is_dirty);
    }

    #[test]
    fn hiding_a_layer_updates_the_view() {
        let (mut editor, mut surface) = editor_with(10, 10);
        editor.dispatch(Command::NewLayer, &mut surface).unwrap();
        editor.dispatch(Command::PointerDown(5.0, 5.0), &mut surface).unwrap();
        editor.dispatch(Command::PointerMove(5.0, 5.0), &mut surface).unwrap();
        assert_eq!(editor.flattened().get_pixel(5, 5), Some(editor.tools.color));

        editor.dispatch(Command::SetLayerVisible(1, false), &mut surface).unwrap();
        assert_eq!(
            editor.flattened().get_pixel(5, 5),
            Some(Rgba([255, 255, 255, 255]))
        );
        let frames = surface.frames;
        editor.dispatch(Command::SetLayerVisible(4, false), &mut surface).unwrap();
        assert_eq!(surface.frames, frames);
    }

    #[test]
    fn failed_open_keeps_the_current_document() {
        let (mut editor, mut surface) = editor_with(5, 5);
        let id = editor.document().unwrap().id;
        let missing = std::env::temp_dir().join(format!("gmphoto-missing-{}.png", uuid::Uuid::new_v4()));
        let result = editor.dispatch(Command::Open(missing), &mut surface);
        assert!(matches!(result, Err(EditorError::Decode { .. })));
        assert_eq!(editor.document().unwrap().id, id);
        assert_eq!(
            editor.document().unwrap().stack.active_layer().unwrap().name,
            BACKGROUND_LAYER_NAME
        );
    }

    #[test]
    fn saving_marks_the_document_clean() {
        let (mut editor, mut surface) = editor_with(6, 6);
        editor.dispatch(Command::NewLayer, &mut surface).unwrap();
        let path = std::env::temp_dir().join(format!("gmphoto-save-{}.png", uuid::Uuid::new_v4()));
        editor
            .dispatch(
                Command::Save {
                    path: path.clone(),
                    format: SaveFormat::Png,
                },
                &mut surface,
            )
            .unwrap();
        let written = io::decode(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let doc = editor.document().unwrap();
        assert!(!doc.is_dirty);
        assert_eq!(doc.path.as_deref(), Some(path.as_path()));
        assert_eq!(&written, editor.flattened());
    }
}
