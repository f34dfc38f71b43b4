//! Loader Module
//!
//! Turns "need identifier X" into exactly one in-flight fetch+decode for X,
//! with any number of waiters attached to its result.

mod coordinator;
mod job;
mod source;

pub use coordinator::LoadCoordinator;
pub use source::{AssetSource, Decoder};
