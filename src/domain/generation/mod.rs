//! Generation domain: caller requests, results and orchestration settings

mod config;
mod request;
mod result;

pub use config::OrchestratorConfig;
pub use request::{sanitize_text, GenerationRequest, MAX_REQUEST_CHARS};
pub use result::{AttemptRecord, GenerationResult, ResultSource};
