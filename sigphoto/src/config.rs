use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use std::fs;
use std::path::{Path, PathBuf};

use crate::image::ImageFormat;
use crate::upload::ValidationLimits;

/// Fixed output geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationSpec {
    /// Side length of the square output
    pub target_size: u32,
    pub corner_radius: u32,
}

impl Default for NormalizationSpec {
    fn default() -> Self {
        Self {
            target_size: 92,
            corner_radius: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoConfig {
    pub limits: ValidationLimits,
    pub spec: NormalizationSpec,
    pub image_format: ImageFormat,
    // Fill behind rounded corners and transparent pixels
    pub background: [u8; 3],
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            limits: ValidationLimits::default(),
            spec: NormalizationSpec::default(),
            image_format: ImageFormat::Jpeg { quality: 70 },
            background: [255, 255, 255],
        }
    }
}

impl PhotoConfig {
    pub fn load() -> Option<Self> {
        let config_path = Self::config_path()?;

        Self::load_from(&config_path)
            .map_err(|e| log::debug!("No saved config: {e:#}"))
            .ok()
    }

    pub fn save(&self) -> Option<()> {
        let config_path = Self::config_path()?;

        self.save_to(&config_path)
            .map_err(|e| log::warn!("Failed to save config: {e:#}"))
            .ok()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn config_path() -> Option<PathBuf> {
        let home = std::env::home_dir()?;
        Some(home.join(".config").join("sigphoto").join("config.json"))
    }
}
