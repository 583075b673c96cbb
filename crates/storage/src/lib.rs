//! Storage layer for tempora
//!
//! This crate implements the storage boundary in memory:
//! - MemoryStore: per-identity timelines behind one RwLock
//! - IdentityTimeline: staged, validated per-identity version sets
//! - SourceIndex: (source, external id) → identities
//! - Store-wide commit versions with AtomicU64

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod memory;
pub mod timeline;

pub use index::SourceIndex;
pub use memory::MemoryStore;
pub use timeline::IdentityTimeline;
