//! API Module
//!
//! HTTP handlers and routing for the media cache server.
//!
//! # Endpoints
//! - `GET /asset?path=...` - Decoded image metadata
//! - `PUT /focus` - Move the prefetch window
//! - `DELETE /cache` - Cancel loads and empty the cache
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
