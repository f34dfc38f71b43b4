//! Cache Module
//!
//! Bounded in-memory table of decoded assets with FIFO eviction and pinning.

mod entry;
mod fifo;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use fifo::FifoTracker;
pub use stats::CacheStats;
pub use store::CacheStore;
