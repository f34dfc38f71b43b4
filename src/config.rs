//! Configuration Module
//!
//! Handles loading and managing cache and server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Tuning parameters of a `MediaCache`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of decoded assets kept resident
    pub max_entries: usize,
    /// Number of neighbors prefetched on each side of the focus
    pub prefetch_radius: usize,
    /// Number of fetch+decode operations allowed to run at once
    pub decode_workers: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10,
            prefetch_radius: 2,
            decode_workers: default_decode_workers(),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache tuning
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
    /// When set, only paths below this directory may be loaded
    pub asset_root: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum resident assets (default: 10)
    /// - `PREFETCH_RADIUS` - Neighbors prefetched on each side (default: 2)
    /// - `DECODE_WORKERS` - Concurrent decodes (default: available parallelism)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `ASSET_ROOT` - Optional directory confining loadable paths
    pub fn from_env() -> Self {
        let defaults = CacheConfig::default();
        Self {
            cache: CacheConfig {
                max_entries: env_or("MAX_ENTRIES", defaults.max_entries).max(1),
                prefetch_radius: env_or("PREFETCH_RADIUS", defaults.prefetch_radius),
                decode_workers: env_or("DECODE_WORKERS", defaults.decode_workers).max(1),
            },
            server_port: env_or("SERVER_PORT", 3000),
            asset_root: env::var("ASSET_ROOT")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
            asset_root: None,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn default_decode_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
