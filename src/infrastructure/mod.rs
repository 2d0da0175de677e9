//! Infrastructure layer - External service implementations

pub mod artifacts;
pub mod logging;
pub mod observability;
pub mod providers;
pub mod quality;
pub mod resilience;
pub mod semantic_cache;
pub mod services;
pub mod storage;
pub mod usage;
