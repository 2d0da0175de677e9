//! Caller-facing generation request

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::image::ProviderKind;
use crate::domain::DomainError;

/// Maximum request text length in characters after sanitizing
pub const MAX_REQUEST_CHARS: u64 = 4000;

/// A request to produce one image
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerationRequest {
    #[validate(length(min = 1, max = 4000))]
    pub text: String,

    /// Provider to try first; the configured priority head when absent
    #[serde(default)]
    pub preferred: Option<ProviderKind>,

    /// Explicit category; derived from the keyword vocabulary when absent
    #[serde(default)]
    pub category: Option<String>,
}

impl GenerationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            preferred: None,
            category: None,
        }
    }

    pub fn with_preferred(mut self, provider: ProviderKind) -> Self {
        self.preferred = Some(provider);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sanitize the text and check its length
    pub fn sanitized(&self) -> Result<Self, DomainError> {
        let sanitized = Self {
            text: sanitize_text(&self.text),
            ..self.clone()
        };

        sanitized
            .validate()
            .map_err(|e| DomainError::validation(format!("Invalid request text: {}", e)))?;

        Ok(sanitized)
    }
}

/// Strip control characters, trim, and collapse whitespace runs
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text() {
        assert_eq!(
            sanitize_text("  krishna\u{0007} playing\n\n\tflute  "),
            "krishna playing flute"
        );
    }

    #[test]
    fn test_sanitized_request() {
        let request = GenerationRequest::new("  a lotus   pond ")
            .with_preferred(ProviderKind::Stability)
            .sanitized()
            .unwrap();

        assert_eq!(request.text, "a lotus pond");
        assert_eq!(request.preferred, Some(ProviderKind::Stability));
    }

    #[test]
    fn test_empty_request_rejected() {
        let result = GenerationRequest::new(" \u{0000}\n ").sanitized();
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_overlong_request_rejected() {
        let text = "a".repeat(MAX_REQUEST_CHARS as usize + 1);
        assert!(GenerationRequest::new(text).sanitized().is_err());

        let text = "a".repeat(MAX_REQUEST_CHARS as usize);
        assert!(GenerationRequest::new(text).sanitized().is_ok());
    }
}
