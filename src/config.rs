use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::commands::Stderr;
use crate::filter::stream::MAX_CHUNK_SIZE;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    /// Read size for stream stages, kept within `1..=MAX_CHUNK_SIZE`.
    pub chunk_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: crate::filter::stream::DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Defaults for `run` stages built through the registry.
#[derive(Debug, Deserialize, Serialize)]
pub struct RunConfig {
    pub check: bool,
    pub stderr: Stderr,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            check: true,
            stderr: Stderr::Inherit,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub level: String,
    /// Log file; `~` and `$VARS` are expanded.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "warn".into(),
            path: String::new(),
        }
    }
}

impl LoggingConfig {
    /// The log file path with `~` and environment variables expanded.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if self.path.is_empty() {
            return None;
        }
        match shellexpand::full(&self.path) {
            Ok(expanded) => Some(PathBuf::from(expanded.into_owned())),
            Err(e) => {
                eprintln!("shpipe: cannot expand log path {:?}: {e}", self.path);
                None
            }
        }
    }
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    run: RunOverlay,
    #[serde(default)]
    logging: LoggingOverlay,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsOverlay {
    chunk_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RunOverlay {
    check: Option<bool>,
    stderr: Option<Stderr>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LoggingOverlay {
    enabled: Option<bool>,
    level: Option<String>,
    path: Option<String>,
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge user overlay from ~/.config/shpipe/config.toml (if exists)
    ///
    /// Scalars set in the overlay replace the defaults; omitted ones are kept.
    pub fn load() -> Self {
        let mut config = Self::default_config();
        let overlay = std::env::var_os("HOME")
            .map(|home| Path::new(&home).join(".config/shpipe/config.toml"))
            .and_then(|path| Self::load_overlay(&path));
        if let Some(overlay) = overlay {
            config.apply_overlay(overlay);
        }
        config
    }

    /// Load defaults merged with the overlay at `path`, if it exists and parses.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay(path) {
            config.apply_overlay(overlay);
        }
        config
    }

    fn load_overlay(path: &Path) -> Option<ConfigOverlay> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                eprintln!("shpipe: config parse error in {}: {e}", path.display());
                None
            }
        }
    }

    /// Apply an overlay on top of this config.
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(v) = overlay.settings.chunk_size {
            self.settings.chunk_size = v.clamp(1, MAX_CHUNK_SIZE);
        }

        let r = overlay.run;
        if let Some(v) = r.check {
            self.run.check = v;
        }
        if let Some(v) = r.stderr {
            self.run.stderr = v;
        }

        let l = overlay.logging;
        if let Some(v) = l.enabled {
            self.logging.enabled = v;
        }
        if let Some(v) = l.level {
            self.logging.level = v;
        }
        if let Some(v) = l.path {
            self.logging.path = v;
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}
