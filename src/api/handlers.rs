//! API Handlers
//!
//! HTTP request handlers for each media cache endpoint.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::assets::DecodedImage;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::media_cache::MediaCache;
use crate::models::{
    AssetQuery, AssetResponse, ClearResponse, FocusRequest, FocusResponse, HealthResponse,
    StatsResponse,
};

/// Cache of decoded images keyed by path.
pub type ImageCache = MediaCache<String, DecodedImage>;

/// Application state shared across all handlers.
///
/// The cache is internally reference counted, so cloning the state is cheap.
#[derive(Clone)]
pub struct AppState {
    pub cache: ImageCache,
}

impl AppState {
    /// Creates a new AppState around an existing cache.
    pub fn new(cache: ImageCache) -> Self {
        Self { cache }
    }

    /// Creates a new AppState reading images from disk.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_config(config: &Config) -> Self {
        let source = match &config.asset_root {
            Some(root) => crate::assets::FsSource::with_root(root),
            None => crate::assets::FsSource::new(),
        };
        let cache = MediaCache::new(
            tokio::runtime::Handle::current(),
            source,
            crate::assets::ImageDecoder,
            &config.cache,
        );
        Self::new(cache)
    }
}

/// Handler for GET /asset?path=...
///
/// Returns the decoded image's metadata, decoding it first if necessary.
pub async fn asset_handler(
    State(state): State<AppState>,
    Query(query): Query<AssetQuery>,
) -> Result<Json<AssetResponse>> {
    if query.path.is_empty() {
        return Err(ApiError::InvalidRequest("Path cannot be empty".to_string()));
    }

    let cached = state.cache.is_resident(&query.path).await;
    let image = state.cache.get(&query.path).await?;

    Ok(Json(AssetResponse::new(query.path, &image, cached)))
}

/// Handler for PUT /focus
///
/// Moves the prefetch window to the given position.
pub async fn focus_handler(
    State(state): State<AppState>,
    Json(req): Json<FocusRequest>,
) -> Result<Json<FocusResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let radius = req.radius.unwrap_or_else(|| state.cache.default_radius());
    let outcome = state
        .cache
        .set_focus(req.path.clone(), req.paths, radius)
        .await;

    Ok(Json(FocusResponse::new(
        req.path,
        outcome.cancelled,
        outcome.started,
    )))
}

/// Handler for DELETE /cache
///
/// Cancels all loads and drops every decoded image.
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared = state.cache.clear_all().await;
    Json(ClearResponse::new(cleared))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;
    let mut loading = state.cache.loading_ids().await;
    loading.sort();

    Json(StatsResponse::new(stats, loading))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::error::{DecodeError, FetchError, LoadError};
    use image::{DynamicImage, RgbImage};

    fn test_state() -> AppState {
        let source = |path: &String| -> std::result::Result<Vec<u8>, FetchError> {
            if path.starts_with("missing") {
                Err(FetchError::new("no such file"))
            } else {
                Ok(path.as_bytes().to_vec())
            }
        };
        // Every path decodes to a 2x2 image; "corrupt" paths fail
        let decoder = |bytes: &[u8]| -> std::result::Result<DecodedImage, DecodeError> {
            if bytes.starts_with(b"corrupt") {
                Err(DecodeError::new("bad header"))
            } else {
                Ok(DecodedImage::new(DynamicImage::ImageRgb8(RgbImage::new(2, 2))))
            }
        };
        let cache = MediaCache::new(
            tokio::runtime::Handle::current(),
            source,
            decoder,
            &CacheConfig {
                max_entries: 10,
                prefetch_radius: 1,
                decode_workers: 2,
            },
        );
        AppState::new(cache)
    }

    fn query(path: &str) -> Query<AssetQuery> {
        Query(AssetQuery {
            path: path.to_string(),
        })
    }

    #[tokio::test]
    async fn test_asset_handler_decodes_then_hits() {
        let state = test_state();

        let first = asset_handler(State(state.clone()), query("a.png")).await.unwrap();
        assert_eq!((first.width, first.height), (2, 2));
        assert!(!first.cached);

        let second = asset_handler(State(state), query("a.png")).await.unwrap();
        assert!(second.cached);
    }

    #[tokio::test]
    async fn test_asset_handler_fetch_failure() {
        let state = test_state();

        let result = asset_handler(State(state), query("missing.png")).await;
        assert!(matches!(result, Err(ApiError::Load(LoadError::Fetch(_)))));
    }

    #[tokio::test]
    async fn test_asset_handler_decode_failure() {
        let state = test_state();

        let result = asset_handler(State(state), query("corrupt.png")).await;
        assert!(matches!(result, Err(ApiError::Load(LoadError::Decode(_)))));
    }

    #[tokio::test]
    async fn test_asset_handler_empty_path() {
        let state = test_state();

        let result = asset_handler(State(state), query("")).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_focus_handler_starts_neighbors() {
        let state = test_state();
        let req = FocusRequest {
            path: "b.png".to_string(),
            paths: vec!["a.png".into(), "b.png".into(), "c.png".into()],
            radius: None,
        };

        let response = focus_handler(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(response.focus, "b.png");
        assert_eq!(response.started, vec!["c.png", "a.png"]);

        state.cache.wait_idle().await;
        assert!(state.cache.is_resident(&"a.png".to_string()).await);
        assert!(state.cache.is_resident(&"c.png".to_string()).await);
    }

    #[tokio::test]
    async fn test_focus_handler_invalid_request() {
        let state = test_state();
        let req = FocusRequest {
            path: "z.png".to_string(),
            paths: vec!["a.png".into()],
            radius: None,
        };

        let result = focus_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_clear_handler() {
        let state = test_state();
        asset_handler(State(state.clone()), query("a.png")).await.unwrap();

        let response = clear_handler(State(state.clone())).await;
        assert_eq!(response.cleared, 1);
        assert!(state.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        asset_handler(State(state.clone()), query("a.png")).await.unwrap();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.stats.loads_started, 1);
        assert_eq!(response.stats.total_entries, 1);
        assert!(response.loading.is_empty());
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
