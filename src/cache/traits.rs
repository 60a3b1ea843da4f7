//! Core traits and types for the caching system.

use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

/// Trait for rows that carry a stable identifier.
///
/// Row sets are compared by identifier to tell a structural change (rows added
/// or removed) apart from field updates on rows already present.
pub trait Identified {
  /// Unique identifier of this row
  fn id(&self) -> &str;
}

/// Identifier set of a row slice.
pub fn id_set<T: Identified>(rows: &[T]) -> HashSet<String> {
  rows.iter().map(|r| r.id().to_string()).collect()
}

/// A cache hit and when its data was stored.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub cached_at: Instant,
}

impl<T> CacheResult<T> {
  pub fn from_cache(data: T, cached_at: Instant) -> Self {
    Self { data, cached_at }
  }

  /// How old the cached data is.
  pub fn age(&self) -> Duration {
    self.cached_at.elapsed()
  }
}
