use eframe::egui;
use egui::{Color32, ColorImage, Pos2, Rect, Sense, TextureHandle, TextureOptions, Vec2};
use std::path::{Path, PathBuf};

use crate::commands::{Command, DisplaySurface, Editor};
use crate::compositor;
use crate::io::{OPEN_EXTENSIONS, SaveFormat};
use crate::pixels::PixelBuffer;
use crate::settings::AppSettings;
use crate::stroke::{BRUSH_SIZE_MAX, BRUSH_SIZE_MIN, Tool};

const CANVAS_BACKGROUND: Color32 = Color32::from_gray(0x55);
const CHECKER_CELL: f32 = 8.0;

/// Uploads presented frames into one egui texture.  Frames larger than
/// `max_size` are downscaled first so huge images stay cheap to upload.
struct EguiSurface<'a> {
    ctx: &'a egui::Context,
    texture: &'a mut Option<TextureHandle>,
    max_size: (u32, u32),
}

impl DisplaySurface for EguiSurface<'_> {
    fn present(&mut self, frame: &PixelBuffer) {
        if frame.is_empty() {
            *self.texture = None;
            return;
        }
        let (fw, fh) = frame.dimensions();
        let (mw, mh) = self.max_size;
        let shown = if mw > 0 && mh > 0 && (fw > mw || fh > mh) {
            compositor::fit_to_surface(frame, self.max_size)
        } else {
            frame.clone()
        };
        if shown.is_empty() {
            return;
        }
        let (w, h) = shown.dimensions();
        let image = ColorImage::from_rgba_unmultiplied([w as usize, h as usize], shown.as_raw());
        if let Some(texture) = self.texture.as_mut() {
            texture.set(image, TextureOptions::LINEAR);
        } else {
            *self.texture = Some(self.ctx.load_texture("canvas", image, TextureOptions::LINEAR));
        }
    }
}

pub struct GMPhotoApp {
    editor: Editor,
    settings: AppSettings,
    texture: Option<TextureHandle>,
    /// Fitted canvas size in physical pixels, for texture downscaling.
    canvas_pixels: (u32, u32),
    status: String,
    window_title: String,
}

impl GMPhotoApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        let mut editor = Editor::new();
        editor.jpeg_quality = settings.jpeg_quality;
        Self {
            editor,
            settings,
            texture: None,
            canvas_pixels: (0, 0),
            status: "No image loaded".to_string(),
            window_title: String::new(),
        }
    }

    fn run(&mut self, ctx: &egui::Context, command: Command) {
        let mut surface = EguiSurface {
            ctx,
            texture: &mut self.texture,
            max_size: self.canvas_pixels,
        };
        match self.editor.dispatch(command, &mut surface) {
            Ok(()) => {}
            Err(e) => {
                log_err!("{}", e);
                self.status = e.to_string();
            }
        }
    }

    fn start_directory(&self) -> Option<PathBuf> {
        let dir = PathBuf::from(&self.settings.last_directory);
        (!self.settings.last_directory.is_empty() && dir.is_dir()).then_some(dir)
    }

    fn remember_directory(&mut self, path: &Path) {
        if let Some(dir) = path.parent() {
            let dir = dir.to_string_lossy().into_owned();
            if dir != self.settings.last_directory {
                self.settings.last_directory = dir;
                self.settings.save();
            }
        }
    }

    fn pick_open_path(&mut self) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new().add_filter("Images", OPEN_EXTENSIONS);
        if let Some(dir) = self.start_directory() {
            dialog = dialog.set_directory(dir);
        }
        let path = dialog.pick_file()?;
        self.remember_directory(&path);
        Some(path)
    }

    fn pick_save_target(&mut self) -> Option<(PathBuf, SaveFormat)> {
        let preferred = self.settings.save_format;
        let mut dialog = rfd::FileDialog::new();
        // Preferred format first so it is the dialog's default filter
        dialog = dialog.add_filter(preferred.label(), &[preferred.extension()]);
        for format in SaveFormat::all().iter().filter(|f| **f != preferred) {
            dialog = dialog.add_filter(format.label(), &[format.extension()]);
        }
        if let Some(dir) = self.start_directory() {
            dialog = dialog.set_directory(dir);
        }
        if let Some(doc) = self.editor.document() {
            dialog = dialog.set_file_name(Path::new(&doc.name).with_extension(preferred.extension()).to_string_lossy());
        }
        let mut path = dialog.save_file()?;
        let format = match SaveFormat::from_path(&path) {
            Some(f) => f,
            None => {
                path.set_extension(preferred.extension());
                preferred
            }
        };
        self.remember_directory(&path);
        Some((path, format))
    }

    fn show_toolbar(&mut self, ui: &mut egui::Ui, pending: &mut Vec<Command>) {
        ui.horizontal(|ui| {
            if ui.button("Open Image").clicked()
                && let Some(path) = self.pick_open_path()
            {
                pending.push(Command::Open(path));
            }
            let has_doc = self.editor.document().is_some();
            if ui.add_enabled(has_doc, egui::Button::new("Save Image")).clicked()
                && let Some((path, format)) = self.pick_save_target()
            {
                pending.push(Command::Save { path, format });
            }
            ui.separator();

            for &tool in Tool::all() {
                if ui
                    .selectable_label(self.editor.tools.tool == tool, tool.label())
                    .clicked()
                {
                    pending.push(Command::SelectTool(tool));
                }
            }

            let mut rgba = self.editor.tools.color.0;
            if ui.color_edit_button_srgba_unmultiplied(&mut rgba).changed() {
                pending.push(Command::SetColor(image::Rgba(rgba)));
            }

            let mut size = self.editor.tools.size();
            let drag = egui::DragValue::new(&mut size)
                .clamp_range(BRUSH_SIZE_MIN..=BRUSH_SIZE_MAX)
                .prefix("Size ");
            if ui.add(drag).changed() {
                pending.push(Command::SetSize(size));
            }
            ui.separator();

            if ui.add_enabled(has_doc, egui::Button::new("New Layer")).clicked() {
                pending.push(Command::NewLayer);
            }
        });
    }

    fn show_layers(&mut self, ui: &mut egui::Ui, pending: &mut Vec<Command>) {
        ui.heading("Layers");
        ui.separator();
        let Some(doc) = self.editor.document() else {
            ui.label("No image loaded");
            return;
        };
        let active = doc.stack.active_index();
        for (index, layer) in doc.stack.layers().iter().enumerate() {
            ui.horizontal(|ui| {
                let mut visible = layer.visible;
                if ui.checkbox(&mut visible, "").changed() {
                    pending.push(Command::SetLayerVisible(index, visible));
                }
                if ui.selectable_label(active == Some(index), layer.name.as_str()).clicked() {
                    pending.push(Command::SelectLayer(index));
                }
            });
        }
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui, pending: &mut Vec<Command>) {
        let area = ui.available_rect_before_wrap();
        let Some(base) = self.editor.document().and_then(|d| d.stack.base_size()) else {
            ui.centered_and_justified(|ui| ui.label("No image loaded"));
            return;
        };

        // The fitted image rect is the display surface: pointer positions
        // relative to it map straight onto buffer pixels.
        let (fw, fh) = compositor::fit_size(base, (area.width() as u32, area.height() as u32));
        if (fw, fh) != self.editor.surface_size() {
            pending.push(Command::SurfaceResized(fw, fh));
        }
        let ppp = ui.ctx().pixels_per_point();
        self.canvas_pixels = ((fw as f32 * ppp).round() as u32, (fh as f32 * ppp).round() as u32);

        let rect = Rect::from_center_size(area.center(), Vec2::new(fw as f32, fh as f32));
        let response = ui.allocate_rect(rect, Sense::drag());
        let painter = ui.painter_at(rect);

        if self.settings.checkerboard {
            paint_checkerboard(&painter, rect);
        }
        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        let local = response.interact_pointer_pos().map(|p| (p.x - rect.min.x, p.y - rect.min.y));
        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some((x, y)) = local
        {
            pending.push(Command::PointerDown(x, y));
        }
        if response.dragged_by(egui::PointerButton::Primary)
            && let Some((x, y)) = local
        {
            pending.push(Command::PointerMove(x, y));
        }
        if response.drag_released_by(egui::PointerButton::Primary) {
            pending.push(Command::PointerUp);
        }
    }

    fn update_title(&mut self, ctx: &egui::Context) {
        let title = match self.editor.document() {
            Some(doc) => format!("{} - GM Photo Editor", doc.display_title()),
            None => "GM Photo Editor".to_string(),
        };
        if title != self.window_title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.window_title = title;
        }
    }
}

impl eframe::App for GMPhotoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut pending = Vec::new();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.show_toolbar(ui, &mut pending);
        });
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some((w, h)) = self.editor.document().and_then(|d| d.stack.base_size()) {
                    ui.label(format!("{} × {}", w, h));
                    ui.separator();
                }
                ui.label(self.status.as_str());
            });
        });
        egui::SidePanel::right("layers")
            .default_width(180.0)
            .show(ctx, |ui| {
                self.show_layers(ui, &mut pending);
            });
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(CANVAS_BACKGROUND))
            .show(ctx, |ui| {
                self.show_canvas(ui, &mut pending);
            });

        for command in pending {
            if let Command::Open(path) | Command::Save { path, .. } = &command {
                self.status = path.display().to_string();
            }
            self.run(ctx, command);
        }
        self.update_title(ctx);
    }
}

fn paint_checkerboard(painter: &egui::Painter, rect: Rect) {
    painter.rect_filled(rect, 0.0, Color32::from_gray(204));
    let cols = (rect.width() / CHECKER_CELL).ceil() as i32;
    let rows = (rect.height() / CHECKER_CELL).ceil() as i32;
    for row in 0..rows {
        for col in (row % 2..cols).step_by(2) {
            let min = rect.min + Vec2::new(col as f32 * CHECKER_CELL, row as f32 * CHECKER_CELL);
            let cell = Rect::from_min_size(min, Vec2::splat(CHECKER_CELL)).intersect(rect);
            painter.rect_filled(cell, 0.0, Color32::WHITE);
        }
    }
}
