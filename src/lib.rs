//! Media Cache - a bounded, prefetching cache of decoded assets
//!
//! Keeps recently viewed images decoded in memory, prefetches the neighbors
//! of whatever is in focus and cancels work that falls out of the window.

pub mod api;
pub mod assets;
pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod media_cache;
pub mod models;
pub mod prefetch;

pub use api::AppState;
pub use config::{CacheConfig, Config};
pub use error::{DecodeError, FetchError, LoadError};
pub use loader::{AssetSource, Decoder};
pub use media_cache::MediaCache;
pub use prefetch::{ReconcileOutcome, Window};
