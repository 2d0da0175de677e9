//! Artifact quality domain

mod config;
mod report;

pub use config::QualityConfig;
pub use report::{QualityMetrics, QualityReport};
