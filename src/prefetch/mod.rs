//! Prefetch Module
//!
//! Keeps the neighbors of the viewer's current position warm and cancels
//! work that fell out of range.

mod window;

pub use window::{PrefetchWindow, ReconcileOutcome, Window};
