//! Typed cost table for image generation

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::image::{ImageSize, ProviderKind};
use crate::domain::DomainError;

/// Variant key that matches any model of a provider
pub const ANY_VARIANT: &str = "*";

/// One configured price: cost per generated image for a provider variant
///
/// `variant` is `model:size`, `model`, or `*` for the provider default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceEntry {
    pub provider: ProviderKind,
    pub variant: String,
    /// Cost in USD per image
    pub cost: f64,
}

impl PriceEntry {
    pub fn new(provider: ProviderKind, variant: impl Into<String>, cost: f64) -> Self {
        Self {
            provider,
            variant: variant.into(),
            cost,
        }
    }
}

/// Lookup table keyed by (provider, variant), prices held in micro-dollars
#[derive(Debug, Clone, Default)]
pub struct CostTable {
    prices: HashMap<(ProviderKind, String), i64>,
}

impl CostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, rejecting negative prices
    pub fn from_entries(entries: &[PriceEntry]) -> Result<Self, DomainError> {
        let mut table = Self::new();

        for entry in entries {
            if entry.cost < 0.0 || !entry.cost.is_finite() {
                return Err(DomainError::configuration(format!(
                    "Invalid cost {} for {}:{}",
                    entry.cost, entry.provider, entry.variant
                )));
            }
            table = table.with_price(entry.provider, &entry.variant, entry.cost);
        }

        Ok(table)
    }

    pub fn with_price(mut self, provider: ProviderKind, variant: &str, cost_usd: f64) -> Self {
        self.prices.insert(
            (provider, variant.trim().to_lowercase()),
            (cost_usd * 1_000_000.0).round() as i64,
        );
        self
    }

    /// Price in micro-dollars, most specific variant first
    pub fn lookup_micros(&self, provider: ProviderKind, model: &str, size: ImageSize) -> Option<i64> {
        let model = model.trim().to_lowercase();
        let keys = [format!("{}:{}", model, size), model, ANY_VARIANT.to_string()];

        keys.into_iter()
            .find_map(|key| self.prices.get(&(provider, key)).copied())
    }

    /// Price in USD
    pub fn lookup(&self, provider: ProviderKind, model: &str, size: ImageSize) -> Option<f64> {
        self.lookup_micros(provider, model, size)
            .map(|micros| micros as f64 / 1_000_000.0)
    }

    /// Fail when a provider variant in use has no price
    pub fn ensure_covers(
        &self,
        provider: ProviderKind,
        model: &str,
        size: ImageSize,
    ) -> Result<(), DomainError> {
        match self.lookup_micros(provider, model, size) {
            Some(_) => Ok(()),
            None => Err(DomainError::configuration(format!(
                "No price configured for {} model '{}' at {}",
                provider, model, size
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Published list prices for the default models
pub fn default_price_entries() -> Vec<PriceEntry> {
    vec![
        PriceEntry::new(ProviderKind::OpenAi, "dall-e-3:1024x1024", 0.04),
        PriceEntry::new(ProviderKind::OpenAi, "dall-e-3:1024x1792", 0.08),
        PriceEntry::new(ProviderKind::OpenAi, "dall-e-3:1792x1024", 0.08),
        PriceEntry::new(ProviderKind::OpenAi, "dall-e-2:256x256", 0.016),
        PriceEntry::new(ProviderKind::OpenAi, "dall-e-2:512x512", 0.018),
        PriceEntry::new(ProviderKind::OpenAi, "dall-e-2", 0.02),
        PriceEntry::new(ProviderKind::Stability, "sd3-medium", 0.035),
        PriceEntry::new(ProviderKind::Stability, "sd3-large", 0.065),
        PriceEntry::new(ProviderKind::Stability, ANY_VARIANT, 0.03),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CostTable {
        CostTable::from_entries(&default_price_entries()).unwrap()
    }

    #[test]
    fn test_lookup_model_and_size() {
        let cost = table()
            .lookup(ProviderKind::OpenAi, "dall-e-3", ImageSize::new(1792, 1024))
            .unwrap();
        assert!((cost - 0.08).abs() < 1e-9);
    }

    #[test]
    fn test_lookup_falls_back_to_model() {
        let cost = table()
            .lookup(ProviderKind::OpenAi, "DALL-E-2", ImageSize::square(1024))
            .unwrap();
        assert!((cost - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_lookup_falls_back_to_provider_default() {
        let cost = table()
            .lookup(ProviderKind::Stability, "core", ImageSize::square(1024))
            .unwrap();
        assert!((cost - 0.03).abs() < 1e-9);
    }

    #[test]
    fn test_missing_price_fails_coverage() {
        let table = CostTable::new().with_price(ProviderKind::OpenAi, "dall-e-3", 0.04);

        assert!(table
            .ensure_covers(ProviderKind::OpenAi, "dall-e-3", ImageSize::square(1024))
            .is_ok());
        assert!(table
            .ensure_covers(ProviderKind::Stability, "sd3-medium", ImageSize::square(1024))
            .is_err());
    }

    #[test]
    fn test_negative_price_rejected() {
        let entries = vec![PriceEntry::new(ProviderKind::OpenAi, "dall-e-3", -1.0)];
        assert!(CostTable::from_entries(&entries).is_err());
    }
}
