use std::path::PathBuf;

use crate::io::SaveFormat;

/// Application settings that persist across sessions
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Initial window size in logical points
    pub window_width: f32,
    pub window_height: f32,
    /// Format pre-selected in the save dialog
    pub save_format: SaveFormat,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Directory the file dialogs start in (empty = OS default)
    pub last_directory: String,
    /// Draw a checkerboard behind transparent pixels on screen
    pub checkerboard: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            window_width: 1200.0,
            window_height: 700.0,
            save_format: SaveFormat::Png,
            jpeg_quality: 90,
            last_directory: String::new(),
            checkerboard: true,
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/gmphotoeditor/settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\GMPhotoEditor\settings.cfg
    /// On macOS:   ~/Library/Application Support/GMPhotoEditor/settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").ok()?;
            return Some(PathBuf::from(appdata).join("GMPhotoEditor").join("settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("GMPhotoEditor")
                    .join("settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("gmphotoeditor").join("settings.cfg"))
        }
    }

    /// Load settings from disk (defaults if the file is missing or unreadable)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = std::fs::write(&path, self.to_config_string()) {
            log_warn!("could not write settings to {}: {}", path.display(), e);
        }
    }

    /// Parse `key=value` lines.  Unknown keys and bad values keep defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "window_width" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v >= 200.0
                    {
                        s.window_width = v;
                    }
                }
                "window_height" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v >= 200.0
                    {
                        s.window_height = v;
                    }
                }
                "save_format" => {
                    if let Some(f) = SaveFormat::from_name(val) {
                        s.save_format = f;
                    }
                }
                "jpeg_quality" => {
                    if let Ok(q) = val.parse::<u8>() {
                        s.jpeg_quality = q.clamp(1, 100);
                    }
                }
                "last_directory" => s.last_directory = val.to_string(),
                "checkerboard" => s.checkerboard = val != "false",
                _ => {}
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "window_width={}\n\
             window_height={}\n\
             save_format={}\n\
             jpeg_quality={}\n\
             last_directory={}\n\
             checkerboard={}\n",
            self.window_width,
            self.window_height,
            self.save_format.extension(),
            self.jpeg_quality,
            self.last_directory,
            self.checkerboard,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_text_parses_back() {
        let settings = AppSettings {
            window_width: 1600.0,
            window_height: 900.0,
            save_format: SaveFormat::Jpeg,
            jpeg_quality: 72,
            last_directory: "/home/ana/pictures".into(),
            checkerboard: false,
        };
        assert_eq!(AppSettings::parse(&settings.to_config_string()), settings);
    }

    #[test]
    fn junk_lines_fall_back_to_defaults() {
        let s = AppSettings::parse(
            "window_width=12\njpeg_quality=250\nsave_format=tiff\nno equals sign\ncolour=blue\n",
        );
        assert_eq!(s.window_width, AppSettings::default().window_width);
        assert_eq!(s.jpeg_quality, 100);
        assert_eq!(s.save_format, SaveFormat::Png);
    }
}
