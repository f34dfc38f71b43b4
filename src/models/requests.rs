//! Request DTOs for the media cache API
//!
//! Defines the structure of incoming query strings and request bodies.

use serde::Deserialize;

/// Query string of GET /asset
#[derive(Debug, Clone, Deserialize)]
pub struct AssetQuery {
    /// Path of the image to show
    pub path: String,
}

/// Request body for PUT /focus
///
/// # Fields
/// - `path`: The image the viewer is showing now
/// - `paths`: The full ordered list the viewer navigates
/// - `radius`: Optional prefetch radius (uses the configured default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct FocusRequest {
    pub path: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub radius: Option<usize>,
}

impl FocusRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.path.is_empty() {
            return Some("Path cannot be empty".to_string());
        }
        if !self.paths.contains(&self.path) {
            return Some(format!("Path '{}' is not in the paths list", self.path));
        }
        None
    }
}
