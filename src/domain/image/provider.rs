use std::fmt::Debug;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::{GeneratedImage, ImageRequest, ModelVariant, ProviderError, ProviderKind};

/// Trait for image generation providers (OpenAI, Stability, etc.)
///
/// Implementations never panic or leak transport errors: every failure is
/// returned as a classified [`ProviderError`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ImageProvider: Send + Sync + Debug {
    /// Generate one image for the request
    async fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage, ProviderError>;

    /// Which provider this is
    fn kind(&self) -> ProviderKind;

    /// Model and size used for requests to this provider
    fn variant(&self) -> ModelVariant;
}
