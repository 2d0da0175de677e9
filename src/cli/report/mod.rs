//! Report command - health, spend and cache statistics

use std::collections::BTreeMap;

use clap::Args;
use serde::Serialize;

use crate::domain::image::ProviderKind;
use crate::domain::resilience::HealthSnapshot;
use crate::domain::semantic_cache::CacheStats;
use crate::domain::usage::CostSummary;

/// Arguments for the report command
#[derive(Args, Clone)]
pub struct ReportArgs {
    /// Days of usage to summarize
    #[arg(long, default_value_t = 30)]
    pub days: u32,
}

#[derive(Debug, Serialize)]
struct Report {
    providers: BTreeMap<ProviderKind, HealthSnapshot>,
    costs: CostSummary,
    cache: CacheStats,
}

pub async fn run(args: ReportArgs) -> anyhow::Result<()> {
    let (config, _metrics) = super::bootstrap()?;
    let gateway = crate::create_gateway(&config).await?;

    let (costs, cache) =
        futures::try_join!(gateway.cost_summary(args.days), gateway.cache_stats())?;

    super::print_json(&Report {
        providers: gateway.provider_status(),
        costs,
        cache,
    })
}
