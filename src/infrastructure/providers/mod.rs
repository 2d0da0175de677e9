//! HTTP image providers

mod factory;
mod http_client;
mod image_api;

pub use factory::{default_base_url, ProviderFactory, ProviderSettings};
pub use http_client::{HttpClient, HttpClientTrait};
pub use image_api::HttpImageProvider;
