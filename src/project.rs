use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::canvas::{BACKGROUND_LAYER_NAME, LayerStack};
use crate::error::EditorResult;
use crate::io::{self, SaveFormat};
use crate::pixels::PixelBuffer;

/// Single open image and its layers.
pub struct Document {
    pub id: Uuid,
    pub stack: LayerStack,
    /// `None` until the document has been opened from or saved to disk.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,
    /// Display name (file name, or "Untitled").
    pub name: String,
}

impl Document {
    /// Document with one visible "Background" layer holding `pixels`.
    pub fn from_buffer(pixels: PixelBuffer) -> Self {
        Self {
            id: Uuid::new_v4(),
            stack: LayerStack::from_single_layer(pixels, BACKGROUND_LAYER_NAME),
            path: None,
            is_dirty: false,
            name: "Untitled".to_string(),
        }
    }

    /// Open a raster image (single layer) or a layered `.gmp` project.
    pub fn open(path: &Path) -> EditorResult<Self> {
        let stack = match SaveFormat::from_path(path) {
            Some(SaveFormat::Project) => io::load_project(path)?,
            _ => LayerStack::from_single_layer(io::decode(path)?, BACKGROUND_LAYER_NAME),
        };
        let mut doc = Self {
            id: Uuid::new_v4(),
            stack,
            path: Some(path.to_path_buf()),
            is_dirty: false,
            name: String::new(),
        };
        doc.update_name_from_path();
        Ok(doc)
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    /// Record a successful save to `path`.
    pub fn saved_as(&mut self, path: &Path) {
        self.path = Some(path.to_path_buf());
        self.update_name_from_path();
        self.mark_clean();
    }

    fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
        }
    }

    /// Title with a trailing `*` while there are unsaved edits.
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}
