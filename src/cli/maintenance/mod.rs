//! Maintenance commands - cache reclaim and usage pruning

use clap::Args;
use serde_json::json;
use tracing::info;

/// Arguments for the prune command
#[derive(Args, Clone)]
pub struct PruneArgs {
    /// Delete usage records older than this many days
    #[arg(long, default_value_t = 90)]
    pub older_than_days: u32,
}

/// Evict cache entries down to the configured byte budget
pub async fn reclaim() -> anyhow::Result<()> {
    let (config, _metrics) = super::bootstrap()?;
    let gateway = crate::create_gateway(&config).await?;

    match gateway.reclaim_cache().await? {
        Some(report) => super::print_json(&report),
        None => {
            info!("No cache byte budget configured; nothing to reclaim");
            super::print_json(&json!({ "reclaimed": false }))
        }
    }
}

pub async fn prune(args: PruneArgs) -> anyhow::Result<()> {
    let (config, _metrics) = super::bootstrap()?;
    let gateway = crate::create_gateway(&config).await?;

    let deleted = gateway.prune_usage(args.older_than_days).await?;
    info!(deleted, days = args.older_than_days, "Usage records pruned");

    super::print_json(&json!({ "deleted": deleted }))
}
