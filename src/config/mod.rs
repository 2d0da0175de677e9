//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, ArtifactSettings, CategoriesConfig, PricingConfig, ProvidersConfig,
    StorageSettings,
};
