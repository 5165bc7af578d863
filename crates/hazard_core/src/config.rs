use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub heatmap: HeatmapConfig,
    pub remote: RemoteConfig,
    pub refresh: RefreshConfig,
    pub store: StoreConfig,
}

/// Weights and thresholds of the fallback authenticity scorer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Cap on the keyword contribution.
    pub keyword_weight: f64,
    /// Points per matched keyword.
    pub keyword_points: f64,
    /// Contribution when the location accepts the hazard type.
    pub location_weight: f64,
    /// Half-width of the corroboration box, in degrees.
    pub similarity_box_deg: f64,
    pub long_text_threshold: usize,
    pub long_text_bonus: f64,
    pub short_text_threshold: usize,
    pub short_text_penalty: f64,
    pub authentic_threshold: u8,
    /// Count corroborating reports once per reporter id.
    pub distinct_reporters: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            keyword_weight: 40.0,
            keyword_points: 15.0,
            location_weight: 30.0,
            similarity_box_deg: 0.5,
            long_text_threshold: 50,
            long_text_bonus: 5.0,
            short_text_threshold: 20,
            short_text_penalty: 10.0,
            authentic_threshold: 70,
            distinct_reporters: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Point radius in pixels, passed through to the renderer.
    pub radius: u32,
    pub blur: u32,
    pub intensity_scale: f64,
    /// Zoom level from which individual markers are drawn.
    pub marker_min_zoom: u8,
    pub hotspot_grid_deg: f64,
    pub hotspot_min_reports: usize,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            radius: 25,
            blur: 15,
            intensity_scale: 1.0,
            marker_min_zoom: 10,
            hotspot_grid_deg: 0.1,
            hotspot_min_reports: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Remote analyzer base URL; fallback-only scoring when unset.
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    pub retention_hours: i64,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn retention(&self) -> time::Duration {
        time::Duration::hours(self.retention_hours)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            retention_hours: 48,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("linewatch.db"),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| EngineError::Config(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.scoring.authentic_threshold > 100 {
            return Err(EngineError::Config(
                "scoring.authentic_threshold must be at most 100".to_string(),
            ));
        }
        if self.scoring.similarity_box_deg <= 0.0 || self.heatmap.hotspot_grid_deg <= 0.0 {
            return Err(EngineError::Config(
                "box and grid sizes must be positive".to_string(),
            ));
        }
        if self.refresh.retention_hours <= 0 {
            return Err(EngineError::Config(
                "refresh.retention_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
