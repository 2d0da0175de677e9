//! Usage infrastructure: repositories and the cost ledger

mod in_memory;
mod service;
mod sqlite;

pub use in_memory::InMemoryUsageRepository;
pub use service::CostLedger;
pub use sqlite::SqliteUsageRepository;
