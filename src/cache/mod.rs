//! Query result caching.
//!
//! This module provides an in-memory cache that:
//! - Indexes pages by their full `QueryKey`
//! - Serves entries only while younger than a fixed TTL
//! - Is invalidated wholesale by mutations and relevant push events

mod layer;
mod traits;

pub use layer::QueryCache;
pub use traits::{id_set, Identified};
