//! Quality validator thresholds

use serde::{Deserialize, Serialize};

/// Thresholds applied to generated artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_min_bytes")]
    pub min_bytes: u64,

    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Minimum width and height in pixels
    #[serde(default = "default_min_dimension")]
    pub min_dimension: u32,

    /// Mean luma floor (0.0 to 1.0)
    #[serde(default = "default_min_brightness")]
    pub min_brightness: f64,

    /// Luma standard deviation floor (0.0 to 1.0)
    #[serde(default = "default_min_contrast")]
    pub min_contrast: f64,

    /// Mean gradient magnitude floor (0.0 to 1.0)
    #[serde(default = "default_min_sharpness")]
    pub min_sharpness: f64,

    /// Longest side images are reduced to before metrics are computed
    #[serde(default = "default_analysis_max_side")]
    pub analysis_max_side: u32,
}

fn default_min_bytes() -> u64 {
    1024
}

fn default_max_bytes() -> u64 {
    20 * 1024 * 1024
}

fn default_min_dimension() -> u32 {
    256
}

fn default_min_brightness() -> f64 {
    0.1
}

fn default_min_contrast() -> f64 {
    0.04
}

fn default_min_sharpness() -> f64 {
    0.01
}

fn default_analysis_max_side() -> u32 {
    512
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_bytes: default_min_bytes(),
            max_bytes: default_max_bytes(),
            min_dimension: default_min_dimension(),
            min_brightness: default_min_brightness(),
            min_contrast: default_min_contrast(),
            min_sharpness: default_min_sharpness(),
            analysis_max_side: default_analysis_max_side(),
        }
    }
}

impl QualityConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_bytes > self.max_bytes {
            return Err("quality.min_bytes must not exceed max_bytes".to_string());
        }
        if self.analysis_max_side == 0 {
            return Err("quality.analysis_max_side must be positive".to_string());
        }
        for (name, value) in [
            ("min_brightness", self.min_brightness),
            ("min_contrast", self.min_contrast),
            ("min_sharpness", self.min_sharpness),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("quality.{} must be within [0, 1]", name));
            }
        }
        Ok(())
    }
}
