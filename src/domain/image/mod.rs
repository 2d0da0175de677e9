//! Image generation domain: providers, requests and classified failures

mod error;
mod kind;
mod provider;
mod request;
mod response;

pub use error::{ErrorKind, ProviderError};
pub use kind::{attempt_order, ProviderKind};
#[cfg(test)]
pub use provider::MockImageProvider;
pub use provider::ImageProvider;
pub use request::{ImageRequest, ImageSize, ModelVariant};
pub use response::GeneratedImage;
