//! Generate command - one request through the fallback loop

use clap::Args;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::image::ProviderKind;
use crate::domain::GenerationRequest;

/// Arguments for the generate command
#[derive(Args, Clone)]
pub struct GenerateArgs {
    /// Text describing the image
    pub prompt: String,

    /// Provider to try first (openai, stability)
    #[arg(long)]
    pub provider: Option<ProviderKind>,

    /// Cache category; derived from the prompt when absent
    #[arg(long)]
    pub category: Option<String>,

    /// Print Prometheus metrics to stderr afterwards
    #[arg(long)]
    pub metrics: bool,
}

/// Run a single generation, cancelling on Ctrl+C
pub async fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let (config, metrics) = super::bootstrap()?;
    let gateway = crate::create_gateway(&config).await?;

    let mut request = GenerationRequest::new(args.prompt);
    if let Some(provider) = args.provider {
        request = request.with_preferred(provider);
    }
    if let Some(category) = args.category {
        request = request.with_category(category);
    }

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let result = gateway.generate_with_cancel(request, cancel).await;
    watcher.abort();

    super::print_json(&result)?;

    if args.metrics {
        match metrics {
            Some(m) => eprintln!("{}", m.render()),
            None => warn!("Metrics requested but disabled in configuration"),
        }
    }

    if !result.success {
        anyhow::bail!(
            "generation failed: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }

    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, cancelling request");
            cancel.cancel();
        }
        Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
    }
}
