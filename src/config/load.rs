use std::{env, path::PathBuf};

use super::schema::Settings;
use crate::error::{Error, Result};

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file first, lets environment
/// variables (prefix `PLAYLISTCOPY__`) override it and falls back to struct
/// defaults.
impl Settings {
    /// Load settings from an optional config file and the environment.
    pub fn load() -> std::result::Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("PLAYLISTCOPY")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Check the settings a run depends on. Called after CLI flags are merged,
    /// before anything on the destination is touched.
    pub fn validate(&self) -> Result<()> {
        let format = &self.layout.folder_name_format;
        if format.matches("%d").count() != 1 {
            return Err(Error::config(format!(
                "folder name format {format:?} must contain exactly one %d"
            )));
        }
        if format.contains(['/', '\\']) {
            return Err(Error::config(format!(
                "folder name format {format:?} must not contain path separators"
            )));
        }
        if self.layout.tracks_per_folder > 0 && self.layout.max_folders == 0 {
            return Err(Error::config("max_folders must be >= 1"));
        }
        if self.workers.convert == 0 || self.workers.copy == 0 {
            return Err(Error::config("worker counts must be >= 1"));
        }
        if self.naming.max_name_chars < 8 {
            return Err(Error::config("naming.max_name_chars must be >= 8"));
        }
        if self.library.extensions.is_empty() {
            return Err(Error::config("library.extensions must not be empty"));
        }
        if let Some(lame) = &self.convert.lame {
            if !lame.is_file() {
                return Err(Error::config(format!(
                    "lame executable not found at {}",
                    lame.display()
                )));
            }
            if self.convert.bitrate_kbps == 0 {
                return Err(Error::config("convert.bitrate_kbps must be > 0"));
            }
        }
        Ok(())
    }
}

/// Config file location: `PLAYLISTCOPY_CONFIG_PATH` when set, else the XDG default.
pub fn resolve_config_path() -> Option<PathBuf> {
    env::var_os("PLAYLISTCOPY_CONFIG_PATH")
        .map(PathBuf::from)
        .or_else(default_config_path)
}

/// `$XDG_CONFIG_HOME/playlistcopy/config.toml`, falling back to
/// `~/.config/playlistcopy/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .map(|dir| dir.join("playlistcopy").join("config.toml"))
}
