//! Application configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `gazer.ron` file (if exists)
//! 3. Environment variables prefixed with `GAZER_`
//!
//! Example environment variable: `GAZER_SCENE__FIELD_OF_VIEW=35`

use serde::{Deserialize, Serialize};

use crate::animation::AnimationConfig;
use crate::blink::BlinkConfig;
use crate::scene::{LightingConfig, SceneConfig, SceneSettings};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub scene: SceneConfig,

    #[serde(default)]
    pub animation: AnimationConfig,

    #[serde(default)]
    pub blink: BlinkConfig,

    #[serde(default)]
    pub lighting: LightingConfig,

    /// Blink RNG seed; random when unset
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub debug: DebugConfig,
}

/// Window settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    /// Initial width (logical pixels)
    pub width: u32,
    /// Initial height (logical pixels)
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "gazer".to_string(),
            width: 800,
            height: 800,
        }
    }
}

/// Debug/development settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log frame statistics every N frames (0 = never)
    pub stats_interval_frames: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            stats_interval_frames: 600,
        }
    }
}

impl AppConfig {
    /// Settings handed to [`crate::scene::Scene::mount`].
    pub fn settings(&self) -> SceneSettings {
        SceneSettings {
            scene: self.scene.clone(),
            animation: self.animation.clone(),
            blink: self.blink.clone(),
            lighting: self.lighting.clone(),
            seed: self.seed,
        }
    }

    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `gazer.ron` file (if exists)
    /// 3. Environment variables prefixed with `GAZER_` (highest priority)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(std::path::Path::new("gazer"))
    }

    /// Same as [`AppConfig::load`] with an explicit config file path. The
    /// extension is optional; a missing file is not an error.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        use config::{Config, Environment, File, FileFormat};

        let name = path.to_string_lossy();
        let config = Config::builder()
            // Layer 2: Config file (optional, won't error if missing)
            .add_source(File::with_name(&name).format(FileFormat::Ron).required(false))
            // Layer 3: Environment variables (GAZER_BLINK__DWELL_MS, etc.)
            .add_source(
                Environment::with_prefix("GAZER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        // Layer 1 comes from the serde defaults
        let loaded: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        log::debug!("configuration loaded from {:?} and environment", path);
        Ok(loaded)
    }

    /// Parse a RON document directly, without the file and environment layers.
    pub fn from_ron(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }
}
