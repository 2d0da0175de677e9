//! Artifact quality validation

mod validator;

#[cfg(test)]
pub(crate) use validator::fixtures;
pub use validator::QualityValidator;
