//! Request and Response models for the media cache API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{AssetQuery, FocusRequest};
pub use responses::{
    AssetResponse, ClearResponse, FocusResponse, HealthResponse, StatsResponse,
};
