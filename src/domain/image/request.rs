//! Provider-facing request types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Output dimensions requested from a provider, written as `WIDTHxHEIGHT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(side: u32) -> Self {
        Self::new(side, side)
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::square(1024)
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ImageSize {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation(format!("Invalid image size '{}'", s));

        let (width, height) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;

        if width == 0 || height == 0 {
            return Err(invalid());
        }

        Ok(Self::new(width, height))
    }
}

impl TryFrom<String> for ImageSize {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ImageSize> for String {
    fn from(size: ImageSize) -> Self {
        size.to_string()
    }
}

/// Model and size a provider generates with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVariant {
    pub model: String,
    pub size: ImageSize,
}

impl ModelVariant {
    pub fn new(model: impl Into<String>, size: ImageSize) -> Self {
        Self {
            model: model.into(),
            size,
        }
    }
}

/// A single generation call sent to a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: String,
    pub size: ImageSize,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, variant: &ModelVariant) -> Self {
        Self {
            prompt: prompt.into(),
            model: variant.model.clone(),
            size: variant.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        let size: ImageSize = "512x768".parse().unwrap();
        assert_eq!(size, ImageSize::new(512, 768));
        assert_eq!(size.to_string(), "512x768");
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert!("1024".parse::<ImageSize>().is_err());
        assert!("0x1024".parse::<ImageSize>().is_err());
        assert!("axb".parse::<ImageSize>().is_err());
    }

    #[test]
    fn test_size_serde_as_string() {
        let json = serde_json::to_string(&ImageSize::square(256)).unwrap();
        assert_eq!(json, "\"256x256\"");

        let size: ImageSize = serde_json::from_str("\"1792x1024\"").unwrap();
        assert_eq!(size, ImageSize::new(1792, 1024));
    }

    #[test]
    fn test_request_from_variant() {
        let variant = ModelVariant::new("dall-e-3", ImageSize::square(1024));
        let request = ImageRequest::new("a lotus pond", &variant);

        assert_eq!(request.model, "dall-e-3");
        assert_eq!(request.size, ImageSize::square(1024));
    }
}
