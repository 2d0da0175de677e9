//! Classified provider failures

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed provider attempt
///
/// Drives telemetry, the circuit breaker, the rate limiter and the fallback
/// loop. `Cancelled` marks an attempt aborted by the caller and is never
/// attributed to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection failure or timeout
    Network,
    /// Explicit throttling signal from the provider
    RateLimit,
    /// Provider-side transient failure
    Temporary,
    /// Account or billing exhaustion
    Quota,
    /// Malformed request; every provider would reject it
    ClientError,
    /// Aborted by the caller
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::RateLimit => "rate_limit",
            Self::Temporary => "temporary",
            Self::Quota => "quota",
            Self::ClientError => "client_error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the orchestrator may move on to the next provider
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self,
            Self::Network | Self::RateLimit | Self::Temporary | Self::Quota
        )
    }

    /// Whether the failure counts against the provider's health
    pub fn is_provider_fault(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Classify an HTTP error status, using the body to tell quota
    /// exhaustion apart from plain throttling.
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = body.to_lowercase();
        let mentions_quota = body.contains("insufficient_quota")
            || body.contains("quota")
            || body.contains("billing")
            || body.contains("credits");

        match status {
            402 => Self::Quota,
            429 if mentions_quota => Self::Quota,
            429 => Self::RateLimit,
            408 => Self::Network,
            500..=599 => Self::Temporary,
            _ => Self::ClientError,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "network" => Ok(Self::Network),
            "rate_limit" => Ok(Self::RateLimit),
            "temporary" => Ok(Self::Temporary),
            "quota" => Ok(Self::Quota),
            "client_error" => Ok(Self::ClientError),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("Unknown error kind '{}'", other)),
        }
    }
}

/// Error returned by a provider call
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimit, message).with_status(429)
    }

    pub fn temporary(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Temporary, message)
    }

    pub fn quota(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Quota, message)
    }

    pub fn client(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ClientError, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "request cancelled by caller")
    }

    /// Build an error from an HTTP status and response body
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let kind = ErrorKind::from_status(status, &body);

        Self {
            kind,
            status: Some(status),
            message: format!("HTTP {}: {}", status, truncate(&body, 300)),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
