use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/playlistcopy/config.toml` or
/// `~/.config/playlistcopy/config.toml`
///
/// Precedence (highest wins):
/// 1) Command-line flags
/// 2) Environment variables (prefix `PLAYLISTCOPY__`, `__` as nested separator)
/// 3) Config file (if present)
/// 4) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub layout: LayoutSettings,
    pub naming: NamingSettings,
    pub placement: PlacementSettings,
    pub workers: WorkerSettings,
    pub convert: ConvertSettings,
    pub library: LibrarySettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Maximum tracks per destination folder. 0 keeps every track in the
    /// destination root.
    pub tracks_per_folder: usize,
    /// Hard ceiling on the number of folders on the device.
    pub max_folders: usize,
    /// Folder name template with exactly one `%d` placeholder, numbered from 1.
    pub folder_name_format: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            tracks_per_folder: 0,
            // 255 is reserved on the FAT-based head units this targets.
            max_folders: 254,
            folder_name_format: "Folder %d".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NamingSettings {
    /// Build target names from artist/album/title tags.
    pub rewrite_filenames: bool,
    /// Cap on the name stem length, extension excluded.
    pub max_name_chars: usize,
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            rewrite_filenames: true,
            max_name_chars: 120,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PlacementSettings {
    /// Randomize the order in which new tracks are packed into folders.
    pub shuffle: bool,
    /// Fixed seed for the shuffle. A fresh one is drawn when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Worker threads running the external encoder.
    pub convert: usize,
    /// Worker threads copying and deleting on the destination.
    pub copy: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            convert: 1,
            copy: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConvertSettings {
    /// Path to the LAME binary. Down-conversion is off when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lame: Option<PathBuf>,
    pub bitrate_kbps: u32,
    /// Extensions handed to the encoder (case-insensitive, without dot).
    pub extensions: Vec<String>,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            lame: None,
            bitrate_kbps: 128,
            extensions: vec!["mp3".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to consider hidden files (dotfiles) on the destination.
    pub include_hidden: bool,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec![
                "mp3".into(),
                "m4a".into(),
                "wav".into(),
                "flac".into(),
                "ogg".into(),
            ],
            include_hidden: false,
        }
    }
}

impl LibrarySettings {
    /// Whether `path` carries one of the configured audio extensions.
    pub fn is_audio_file(&self, path: &std::path::Path) -> bool {
        extension_matches(path, &self.extensions)
    }
}

impl ConvertSettings {
    pub fn is_convertible(&self, path: &std::path::Path) -> bool {
        extension_matches(path, &self.extensions)
    }
}

fn extension_matches(path: &std::path::Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .any(|e| !e.is_empty() && e == ext)
        })
        .unwrap_or(false)
}
