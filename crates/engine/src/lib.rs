//! Record engine for tempora
//!
//! This crate turns temporal writes into storage batches:
//! - TimelinePlanner: per-item insertion mutations (truncate, remove, merge)
//! - RecordStore: insertion, read and cross-reference APIs
//! - Query: non-temporal read selection
//! - CommitCoordinator: commit logging and metrics
//! - StoreConfig: `tempora.toml`
//!
//! Storage is reached only through `tempora_core::RecordStorage`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod planner;
pub mod query;
pub mod store;

pub use config::{StoreConfig, CONFIG_FILE_NAME};
pub use coordinator::{CommitCoordinator, StoreMetrics};
pub use planner::{PreparedRecord, TimelinePlanner, WorkingTimeline};
pub use query::Query;
pub use store::{PutReceipt, RecordStore};
