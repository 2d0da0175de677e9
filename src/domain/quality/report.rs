//! Quality report types

use serde::{Deserialize, Serialize};

/// Measured properties of a decoded artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub file_size: u64,
    /// Mean luma, 0.0 to 1.0
    pub brightness: f64,
    /// Luma standard deviation, 0.0 to 1.0
    pub contrast: f64,
    /// Mean Sobel gradient magnitude, 0.0 to 1.0
    pub sharpness: f64,
}

/// Verdict of the quality validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub valid: bool,
    /// Names the violated check when invalid
    pub reason: Option<String>,
    pub metrics: Option<QualityMetrics>,
    /// Mean of the clamped sub-scores; 0.0 when metrics were never computed
    pub score: f64,
}

impl QualityReport {
    pub fn passed(metrics: QualityMetrics, score: f64) -> Self {
        Self {
            valid: true,
            reason: None,
            metrics: Some(metrics),
            score,
        }
    }

    /// Structural failure before any metric was computed
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
            metrics: None,
            score: 0.0,
        }
    }

    /// Metric floor violated; metrics and score are still reported
    pub fn below_floor(reason: impl Into<String>, metrics: QualityMetrics, score: f64) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
            metrics: Some(metrics),
            score,
        }
    }

    /// Whether the artifact may enter the cache
    pub fn admits(&self, min_quality: f64) -> bool {
        self.valid && self.score >= min_quality
    }
}
