//! Runtime settings
//!
//! Read from `raymarch.toml` by default. A missing or unreadable file is not
//! fatal: the runtime falls back to defaults and says so once logging is up.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Buffer backend the frame loop drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Host-memory buffers, no GPU required
    #[default]
    Headless,
    /// Storage buffers on a headless wgpu device
    Wgpu,
}

/// Vertical bobbing applied to every top-level node.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Peak offset in world units, 0 disables the animation
    pub bob_amplitude: f32,
    /// Oscillations per second
    pub bob_speed: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            bob_amplitude: 0.25,
            bob_speed: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Scene description to load
    pub scene: PathBuf,
    /// Frames to run, 0 runs until interrupted
    pub frames: u64,
    /// Target frames per second, 0 disables throttling
    pub frame_rate: f32,
    pub backend: BackendKind,
    /// Reload the scene when its file changes
    pub watch: bool,
    /// Used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Frames between summary log lines, 0 disables them
    pub report_every: u64,
    pub animation: AnimationConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            scene: PathBuf::from("scenes/demo.toml"),
            frames: 600,
            frame_rate: 60.0,
            backend: BackendKind::Headless,
            watch: false,
            log_filter: "info".to_string(),
            report_every: 60,
            animation: AnimationConfig::default(),
        }
    }
}

/// Where the settings came from. Kept so it can be logged after the
/// subscriber, which depends on the settings, is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Missing(PathBuf),
    Invalid { path: PathBuf, reason: String },
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded settings from {:?}", path),
            ConfigSource::Missing(path) => {
                info!("No settings file at {:?}, using defaults", path);
            }
            ConfigSource::Invalid { path, reason } => {
                warn!("Failed to load settings from {:?}: {}, using defaults", path, reason);
            }
        }
    }
}

impl RuntimeConfig {
    /// Parses settings from TOML text. Absent keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the parse error for malformed TOML or mistyped values.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads settings from `path`, or returns defaults if it is missing or
    /// cannot be parsed.
    pub fn load(path: &Path) -> (Self, ConfigSource) {
        if !path.exists() {
            return (Self::default(), ConfigSource::Missing(path.to_path_buf()));
        }

        let invalid = |reason: String| ConfigSource::Invalid {
            path: path.to_path_buf(),
            reason,
        };
        match fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => (config, ConfigSource::File(path.to_path_buf())),
                Err(e) => (Self::default(), invalid(e.to_string())),
            },
            Err(e) => (Self::default(), invalid(e.to_string())),
        }
    }

    /// Interval between frames, `None` when unthrottled.
    pub fn frame_interval(&self) -> Option<std::time::Duration> {
        (self.frame_rate > 0.0).then(|| std::time::Duration::from_secs_f32(1.0 / self.frame_rate))
    }
}
