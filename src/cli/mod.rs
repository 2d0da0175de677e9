//! CLI module for PMP Image Gateway
//!
//! Subcommands:
//! - `generate`: produce one image, falling back across providers
//! - `report`: provider health, spend and cache statistics
//! - `reclaim`: shrink the artifact cache to its byte budget
//! - `prune`: delete old usage records

pub mod generate;
pub mod maintenance;
pub mod report;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::observability::{init_metrics, PrometheusMetrics};

/// PMP Image Gateway - Resilient client for multiple image generation providers
#[derive(Parser)]
#[command(name = "pmp-image-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate one image
    Generate(generate::GenerateArgs),

    /// Print provider health, spend and cache statistics as JSON
    Report(report::ReportArgs),

    /// Evict cache entries until the artifact budget is met
    Reclaim,

    /// Delete usage records older than a number of days
    Prune(maintenance::PruneArgs),
}

/// Load configuration and install logging and metrics
pub(crate) fn bootstrap() -> anyhow::Result<(AppConfig, Option<PrometheusMetrics>)> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging);
    let metrics = init_metrics(&config.metrics);

    Ok((config, metrics))
}

/// Print a value as pretty JSON on stdout
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::ProviderKind;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "pmp-image-gateway",
            "generate",
            "krishna playing flute",
            "--provider",
            "stability",
            "--category",
            "myth",
        ])
        .unwrap();

        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.prompt, "krishna playing flute");
                assert_eq!(args.provider, Some(ProviderKind::Stability));
                assert_eq!(args.category.as_deref(), Some("myth"));
                assert!(!args.metrics);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_parse_report_default_days() {
        let cli = Cli::try_parse_from(["pmp-image-gateway", "report"]).unwrap();
        assert!(matches!(cli.command, Command::Report(args) if args.days == 30));
    }

    #[test]
    fn test_parse_prune() {
        let cli =
            Cli::try_parse_from(["pmp-image-gateway", "prune", "--older-than-days", "90"]).unwrap();
        assert!(matches!(cli.command, Command::Prune(args) if args.older_than_days == 90));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let result =
            Cli::try_parse_from(["pmp-image-gateway", "generate", "a cat", "--provider", "midjourney"]);
        assert!(result.is_err());
    }
}
