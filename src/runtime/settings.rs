use tracing::warn;

use crate::config;

/// Settings from the config file and environment, or the defaults when
/// neither can be read. Validation happens after command-line overrides.
pub fn load_settings() -> config::Settings {
    match config::Settings::load() {
        Ok(s) => s,
        Err(e) => {
            // Config is optional; a broken file should not block a copy.
            warn!("failed to load config, using defaults: {e}");
            config::Settings::default()
        }
    }
}
