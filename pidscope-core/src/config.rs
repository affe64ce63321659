//! Configuration for pidscope

use crate::category::CategoryDefinition;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Consecutive missed cycles before an element is evicted.
pub const DEFAULT_MISS_TOLERANCE: u32 = 10;
/// IoU above which two boxes are considered the same physical element.
pub const DEFAULT_DUPLICATE_IOU_THRESHOLD: f32 = 0.5;

/// Element registry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub miss_tolerance: u32,
    pub duplicate_iou_threshold: f32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            miss_tolerance: DEFAULT_MISS_TOLERANCE,
            duplicate_iou_threshold: DEFAULT_DUPLICATE_IOU_THRESHOLD,
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.miss_tolerance == 0 || self.miss_tolerance > 1000 {
            return Err("Miss tolerance must be between 1 and 1000".to_string());
        }
        if !self.duplicate_iou_threshold.is_finite()
            || self.duplicate_iou_threshold <= 0.0
            || self.duplicate_iou_threshold > 1.0
        {
            return Err("Duplicate IoU threshold must be in (0, 1]".to_string());
        }
        Ok(())
    }
}

/// Where detection batches come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionSource {
    /// Built-in simulated schematic
    Simulated {
        #[serde(default)]
        jitter: f32,
        #[serde(default)]
        dropout: f64,
    },
    /// Batches replayed from a JSON file
    Replay { path: PathBuf },
}

impl Default for DetectionSource {
    fn default() -> Self {
        DetectionSource::Simulated {
            jitter: 0.0,
            dropout: 0.0,
        }
    }
}

/// Detection loop cadence and handoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Period between detection cycles, advisory
    pub interval_ms: u64,
    /// Bounded handoff queue between detector and registry owner
    pub channel_capacity: usize,
    pub source: DetectionSource,
    /// Seed for simulated noise
    pub seed: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            channel_capacity: 30,
            source: DetectionSource::default(),
            seed: 42,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.interval_ms == 0 || self.interval_ms > 60_000 {
            return Err("Detection interval must be between 1 and 60000 ms".to_string());
        }
        if self.channel_capacity == 0 || self.channel_capacity > 10_000 {
            return Err("Channel capacity must be between 1 and 10000".to_string());
        }
        if let DetectionSource::Simulated { jitter, dropout } = &self.source {
            if !jitter.is_finite() || *jitter < 0.0 {
                return Err("Simulated jitter must be a non-negative number".to_string());
            }
            if !(0.0..=1.0).contains(dropout) {
                return Err("Simulated dropout must be a probability in [0, 1]".to_string());
            }
        }
        Ok(())
    }
}

/// Overlay view geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub view_width: u32,
    pub view_height: u32,
    /// Stored reference image whose dimensions define the frame space
    pub reference_image: Option<PathBuf>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            view_width: 600,
            view_height: 400,
            reference_image: None,
        }
    }
}

/// Snapshot export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("detected_elements.json"),
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub registry: RegistryConfig,
    pub detection: DetectionConfig,
    pub overlay: OverlayConfig,
    pub export: ExportConfig,
    /// Appended after the built-in category table
    pub extra_categories: Vec<CategoryDefinition>,
}

impl AppConfig {
    /// Default location, `<config dir>/pidscope/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("pidscope");
            p.push("config.toml");
            p
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Deserialization(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        config.validate().map_err(Error::Configuration)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.registry.validate()?;
        self.detection.validate()?;

        if self.overlay.view_width == 0 || self.overlay.view_height == 0 {
            return Err("Overlay view size must be non-zero".to_string());
        }
        if self.overlay.view_width > 7680 || self.overlay.view_height > 4320 {
            return Err("Overlay view size too large (max 8K)".to_string());
        }
        if self.export.path.as_os_str().is_empty() {
            return Err("Export path must not be empty".to_string());
        }
        for def in &self.extra_categories {
            if def.name.trim().is_empty() {
                return Err("Extra category names must not be empty".to_string());
            }
        }
        Ok(())
    }
}
