use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::extract::PaletteOptions;
use crate::visualize::VisualizationOptions;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// Runtime settings for a wardrobe. Every field has a default, so a config
/// file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardrobeConfig {
    /// Directory that image paths stored on garments are relative to.
    pub static_root: PathBuf,
    /// Sub-directory of `static_root` that receives uploads.
    pub upload_folder: String,
    pub store_path: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub max_upload_bytes: u64,
    /// Number of outfits proposed per request.
    pub outfits_per_request: usize,
    /// Replacement compatibility tables, JSON.
    pub rules_path: Option<PathBuf>,
    /// TTF/OTF font used to label visualizations.
    pub label_font: Option<PathBuf>,
    pub palette: PaletteOptions,
    pub visualization: VisualizationOptions,
}

impl Default for WardrobeConfig {
    fn default() -> Self {
        WardrobeConfig {
            static_root: PathBuf::from("static"),
            upload_folder: "uploads".to_string(),
            store_path: PathBuf::from("wardrobe.json"),
            allowed_extensions: ["png", "jpg", "jpeg", "gif", "webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            outfits_per_request: 3,
            rules_path: None,
            label_font: None,
            palette: PaletteOptions::default(),
            visualization: VisualizationOptions::default(),
        }
    }
}

impl WardrobeConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Absolute-or-relative directory uploads are written to.
    pub fn upload_dir(&self) -> PathBuf {
        self.static_root.join(&self.upload_folder)
    }

    pub fn is_allowed_extension(&self, filename: &str) -> bool {
        filename
            .rsplit_once('.')
            .is_some_and(|(_, ext)| {
                self.allowed_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_checked_case_insensitively() {
        let config = WardrobeConfig::default();
        assert!(config.is_allowed_extension("shirt.PNG"));
        assert!(config.is_allowed_extension("my.summer.dress.webp"));
        assert!(!config.is_allowed_extension("notes.txt"));
        assert!(!config.is_allowed_extension("png"));
    }

    #[test]
    fn partial_config_files_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"upload_folder": "photos", "palette": {"colors": 3}}"#).unwrap();

        let config = WardrobeConfig::from_json_file(&path).unwrap();
        assert_eq!(config.upload_dir(), PathBuf::from("static/photos"));
        assert_eq!(config.palette.colors, 3);
        assert_eq!(config.palette.max_edge, 300);
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
    }
}
