//! Response DTOs for the media cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::assets::DecodedImage;
use crate::cache::CacheStats;

/// Response body for GET /asset
#[derive(Debug, Clone, Serialize)]
pub struct AssetResponse {
    /// The requested path
    pub path: String,
    /// Decoded width in pixels
    pub width: u32,
    /// Decoded height in pixels
    pub height: u32,
    /// Pixel layout, e.g. "Rgba8"
    pub color: String,
    /// Whether the image was already resident before this request
    pub cached: bool,
}

impl AssetResponse {
    /// Creates a new AssetResponse describing a decoded image
    pub fn new(path: impl Into<String>, image: &DecodedImage, cached: bool) -> Self {
        Self {
            path: path.into(),
            width: image.width,
            height: image.height,
            color: format!("{:?}", image.color),
            cached,
        }
    }
}

/// Response body for PUT /focus
#[derive(Debug, Clone, Serialize)]
pub struct FocusResponse {
    /// The new focus
    pub focus: String,
    /// Paths whose in-flight loads were cancelled
    pub cancelled: Vec<String>,
    /// Paths whose prefetch was started
    pub started: Vec<String>,
}

impl FocusResponse {
    pub fn new(focus: impl Into<String>, cancelled: Vec<String>, started: Vec<String>) -> Self {
        Self {
            focus: focus.into(),
            cancelled,
            started,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Number of resident entries removed
    pub cleared: usize,
}

impl ClearResponse {
    pub fn new(cleared: usize) -> Self {
        Self {
            message: format!("Cleared {} cached images", cleared),
            cleared,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Counters as tracked by the cache
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Paths with a registered load
    pub loading: Vec<String>,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: CacheStats, loading: Vec<String>) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
            loading,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
