//! Usage tracking domain: cost table, usage records and spend summaries

mod pricing;
mod record;
mod repository;

pub use pricing::{default_price_entries, CostTable, PriceEntry, ANY_VARIANT};
pub use record::{CostSummary, DailyCost, UsageEvent, UsageRecord, UsageRecordId};
pub use repository::UsageRepository;
