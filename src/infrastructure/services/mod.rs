//! Infrastructure services

mod orchestrator;

pub use orchestrator::{GenerationOrchestrator, OrchestratorComponents};
