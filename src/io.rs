use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, ImageError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::canvas::{Layer, LayerStack};
use crate::error::{EditorError, EditorResult};
use crate::pixels::PixelBuffer;

/// Magic tag stored at the start of every layered project file.
const PROJECT_MAGIC: &str = "GMP1";
/// Maximum supported canvas dimension in pixels (per axis).
const MAX_CANVAS_DIM: u32 = 32_768;
/// Maximum number of layers in a project file.
const MAX_LAYERS: usize = 256;

/// Extensions offered in the open dialog.
pub const OPEN_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gmp"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    /// Layered project file, keeps every layer.
    Project,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Project => "gmp",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SaveFormat::Png => "PNG",
            SaveFormat::Jpeg => "JPEG",
            SaveFormat::Bmp => "BMP",
            SaveFormat::Project => "GM Project",
        }
    }

    pub fn all() -> &'static [SaveFormat] {
        &[SaveFormat::Png, SaveFormat::Jpeg, SaveFormat::Bmp, SaveFormat::Project]
    }

    /// Parse a format name or file extension (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "bmp" => Some(SaveFormat::Bmp),
            "gmp" => Some(SaveFormat::Project),
            _ => None,
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_name)
    }
}

// ============================================================================
// RASTER DECODE / ENCODE
// ============================================================================

/// Decode any raster format the `image` crate was built with into RGBA8.
pub fn decode(path: &Path) -> EditorResult<PixelBuffer> {
    let img = image::open(path)
        .map_err(|source| EditorError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    PixelBuffer::from_rgba_image(img)
}

/// Write a flattened image.  PNG and BMP keep alpha; JPEG drops it.
pub fn encode(buffer: &PixelBuffer, path: &Path, format: SaveFormat, quality: u8) -> EditorResult<()> {
    let wrap = |source: ImageError| EditorError::Encode {
        path: path.to_path_buf(),
        source,
    };
    if buffer.is_empty() {
        return Err(EditorError::InvalidDimension {
            width: buffer.width(),
            height: buffer.height(),
        });
    }

    if format == SaveFormat::Project {
        return Err(EditorError::invalid_argument(
            "layered projects are written with save_project",
        ));
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let (w, h) = buffer.dimensions();

    match format {
        SaveFormat::Png => {
            PngEncoder::new(&mut writer)
                .write_image(buffer.as_raw(), w, h, ColorType::Rgba8)
                .map_err(wrap)?;
        }
        SaveFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(buffer.as_rgba_image().clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder
                .encode(rgb.as_raw(), w, h, ColorType::Rgb8)
                .map_err(wrap)?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder
                .encode(buffer.as_raw(), w, h, ColorType::Rgba8)
                .map_err(wrap)?;
        }
        SaveFormat::Project => unreachable!("handled above"),
    }

    writer.flush()?;
    Ok(())
}

// ============================================================================
// LAYERED PROJECT FILE (.gmp)
// ============================================================================

#[derive(Serialize, Deserialize)]
struct ProjectFile {
    magic: String,
    width: u32,
    height: u32,
    active_layer: Option<usize>,
    layers: Vec<LayerData>,
}

#[derive(Serialize, Deserialize)]
struct LayerData {
    name: String,
    visible: bool,
    /// Row-major RGBA8, `width * height * 4` bytes.
    pixels: Vec<u8>,
}

/// Serialize every layer, its visibility and the active index.
pub fn save_project(stack: &LayerStack, path: &Path) -> EditorResult<()> {
    let (width, height) = stack.base_size().ok_or(EditorError::EmptyStack)?;
    let project = ProjectFile {
        magic: PROJECT_MAGIC.to_string(),
        width,
        height,
        active_layer: stack.active_index(),
        layers: stack
            .layers()
            .iter()
            .map(|layer| LayerData {
                name: layer.name.clone(),
                visible: layer.visible,
                pixels: layer.pixels.as_raw().to_vec(),
            })
            .collect(),
    };

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, &project)?;
    writer.flush()?;
    Ok(())
}

/// Load a project written by [`save_project`].
pub fn load_project(path: &Path) -> EditorResult<LayerStack> {
    let raw = std::fs::read(path)?;
    let project: ProjectFile = bincode::deserialize(&raw)?;

    if project.magic != PROJECT_MAGIC {
        return Err(EditorError::project(format!(
            "unknown magic '{}'",
            project.magic
        )));
    }
    if project.width > MAX_CANVAS_DIM || project.height > MAX_CANVAS_DIM {
        return Err(EditorError::project(format!(
            "canvas {}x{} exceeds {} pixels per side",
            project.width, project.height, MAX_CANVAS_DIM
        )));
    }
    if project.layers.is_empty() || project.layers.len() > MAX_LAYERS {
        return Err(EditorError::project(format!(
            "unsupported layer count {}",
            project.layers.len()
        )));
    }

    let layers = project
        .layers
        .into_iter()
        .map(|data| {
            let pixels = PixelBuffer::from_raw(project.width, project.height, data.pixels)?;
            let mut layer = Layer::new(data.name, pixels);
            layer.visible = data.visible;
            Ok(layer)
        })
        .collect::<EditorResult<Vec<_>>>()?;

    Ok(LayerStack::from_layers(layers, project.active_layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::path::PathBuf;

    fn temp_path(ext: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gmphoto-io-{}.{}", uuid::Uuid::new_v4(), ext))
    }

    #[test]
    fn formats_parse_from_names_and_paths() {
        assert_eq!(SaveFormat::from_name("JPEG"), Some(SaveFormat::Jpeg));
        assert_eq!(SaveFormat::from_path(Path::new("a/b.Png")), Some(SaveFormat::Png));
        assert_eq!(SaveFormat::from_path(Path::new("scene.gmp")), Some(SaveFormat::Project));
        assert_eq!(SaveFormat::from_path(Path::new("notes.txt")), None);
        assert_eq!(SaveFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn png_keeps_alpha() {
        let path = temp_path("png");
        let mut buf = PixelBuffer::new_filled(6, 3, Rgba([10, 200, 30, 255])).unwrap();
        buf.put_pixel(1, 1, Rgba([0, 0, 0, 0]));
        encode(&buf, &path, SaveFormat::Png, 90).unwrap();

        let back = decode(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(back, buf);
    }

    #[test]
    fn jpeg_writes_a_readable_file() {
        let path = temp_path("jpg");
        let buf = PixelBuffer::new_filled(16, 8, Rgba([255, 255, 255, 255])).unwrap();
        encode(&buf, &path, SaveFormat::Jpeg, 90).unwrap();
        let back = decode(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(back.dimensions(), (16, 8));
        assert_eq!(back.get_pixel(3, 3).unwrap()[3], 255);
    }

    #[test]
    fn missing_files_report_decode_errors() {
        let path = temp_path("png");
        assert!(matches!(decode(&path), Err(EditorError::Decode { .. })));
    }

    #[test]
    fn project_files_restore_layers() {
        let path = temp_path("gmp");
        let base = PixelBuffer::new_filled(4, 4, Rgba([255, 0, 0, 255])).unwrap();
        let mut stack = LayerStack::from_single_layer(base, "Background");
        stack.append_transparent_layer("Layer 1").unwrap();
        stack.layer_mut(1).unwrap().pixels.put_pixel(2, 3, Rgba([0, 0, 255, 255]));
        stack.set_visible(1, false);
        stack.set_active(0);

        save_project(&stack, &path).unwrap();
        let back = load_project(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back.len(), 2);
        assert_eq!(back.active_index(), Some(0));
        assert_eq!(back.layer(1).unwrap().name, "Layer 1");
        assert!(!back.layer(1).unwrap().visible);
        assert_eq!(
            back.layer(1).unwrap().pixels.get_pixel(2, 3),
            Some(Rgba([0, 0, 255, 255]))
        );
        assert_eq!(back.layer(0).unwrap().pixels, stack.layer(0).unwrap().pixels);
    }

    #[test]
    fn foreign_bytes_are_not_a_project() {
        let path = temp_path("gmp");
        std::fs::write(&path, b"definitely not a project file").unwrap();
        let result = load_project(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(EditorError::Project(_))));
    }

    #[test]
    fn empty_stacks_cannot_be_saved() {
        let path = temp_path("gmp");
        assert!(matches!(
            save_project(&LayerStack::new(), &path),
            Err(EditorError::EmptyStack)
        ));
    }
}
