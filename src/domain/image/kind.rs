//! Provider identity

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// The closed set of image generation providers the gateway knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI images endpoint
    #[serde(rename = "openai")]
    OpenAi,
    /// Stability AI images endpoint
    Stability,
}

impl ProviderKind {
    /// Every known provider, in default fallback priority
    pub const ALL: [ProviderKind; 2] = [ProviderKind::OpenAi, ProviderKind::Stability];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Stability => "stability",
        }
    }

    /// Environment variable consulted for the provider's API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Stability => "STABILITY_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "open_ai" | "dalle" => Ok(Self::OpenAi),
            "stability" | "stability_ai" => Ok(Self::Stability),
            other => Err(DomainError::validation(format!(
                "Unknown provider '{}'",
                other
            ))),
        }
    }
}

/// Build the attempt order for a request: the preferred provider first,
/// then the remaining providers in fallback priority, without duplicates.
pub fn attempt_order(preferred: ProviderKind, priority: &[ProviderKind]) -> Vec<ProviderKind> {
    let mut order = Vec::with_capacity(priority.len() + 1);
    order.push(preferred);

    for kind in priority {
        if !order.contains(kind) {
            order.push(*kind);
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_round_trip_str() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_provider_kind_unknown() {
        assert!("midjourney".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_kind_serde() {
        let json = serde_json::to_string(&ProviderKind::OpenAi).unwrap();
        assert_eq!(json, "\"openai\"");

        let kind: ProviderKind = serde_json::from_str("\"stability\"").unwrap();
        assert_eq!(kind, ProviderKind::Stability);
    }

    #[test]
    fn test_attempt_order_preferred_first() {
        let order = attempt_order(ProviderKind::Stability, &ProviderKind::ALL);
        assert_eq!(order, vec![ProviderKind::Stability, ProviderKind::OpenAi]);
    }

    #[test]
    fn test_attempt_order_no_duplicates() {
        let order = attempt_order(ProviderKind::OpenAi, &ProviderKind::ALL);
        assert_eq!(order, vec![ProviderKind::OpenAi, ProviderKind::Stability]);
    }

    #[test]
    fn test_attempt_order_preferred_not_in_priority() {
        let order = attempt_order(ProviderKind::OpenAi, &[ProviderKind::Stability]);
        assert_eq!(order, vec![ProviderKind::OpenAi, ProviderKind::Stability]);
    }
}
