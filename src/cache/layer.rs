//! Per-query result cache with a fixed time-to-live.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::query::QueryKey;
use crate::record::{Page, Pagination, Record};

use super::traits::CacheResult;

/// Default freshness window for a cached page.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// A cached page and when it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub rows: Vec<Record>,
  pub pagination: Pagination,
  pub stored_at: Instant,
}

/// In-memory query cache.
///
/// Entries older than the TTL are never returned; they are dropped the next
/// time their key is looked up. Every `invalidate_all` bumps a generation
/// counter so callers can tell whether an invalidation happened while a
/// fetch was in flight.
#[derive(Debug)]
pub struct QueryCache {
  entries: HashMap<QueryKey, CacheEntry>,
  /// How long before cached data is considered stale
  ttl: Duration,
  generation: u64,
}

impl QueryCache {
  pub fn new() -> Self {
    Self {
      entries: HashMap::new(),
      ttl: DEFAULT_TTL,
      generation: 0,
    }
  }

  /// Set the time-to-live for cached pages.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  fn is_stale(&self, stored_at: Instant) -> bool {
    stored_at.elapsed() > self.ttl
  }

  /// Look up a fresh entry.
  pub fn get(&mut self, key: &QueryKey) -> Option<&CacheEntry> {
    let stale = match self.entries.get(key) {
      Some(entry) => self.is_stale(entry.stored_at),
      None => return None,
    };

    if stale {
      debug!(key = %key.description(), "evicting expired cache entry");
      self.entries.remove(key);
      return None;
    }

    self.entries.get(key)
  }

  /// Cache-first lookup returning the page with its source.
  pub fn lookup(&mut self, key: &QueryKey) -> Option<CacheResult<Page>> {
    self.get(key).map(|entry| {
      CacheResult::from_cache(
        Page {
          rows: entry.rows.clone(),
          pagination: entry.pagination,
        },
        entry.stored_at,
      )
    })
  }

  /// Store a page under `key`, replacing any previous entry.
  pub fn put(&mut self, key: QueryKey, rows: Vec<Record>, pagination: Pagination) {
    self.entries.insert(
      key,
      CacheEntry {
        rows,
        pagination,
        stored_at: Instant::now(),
      },
    );
  }

  /// Store a page only if no invalidation happened since `generation` was read.
  ///
  /// Returns whether the page was stored.
  pub fn put_if_current(&mut self, generation: u64, key: QueryKey, page: &Page) -> bool {
    if generation != self.generation {
      debug!(key = %key.description(), "skipping cache write after invalidation");
      return false;
    }
    self.put(key, page.rows.clone(), page.pagination);
    true
  }

  /// Drop every entry.
  pub fn invalidate_all(&mut self) {
    if !self.entries.is_empty() {
      debug!(entries = self.entries.len(), "invalidating query cache");
    }
    self.entries.clear();
    self.generation += 1;
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::{QueryParams, View};

  fn key(page: u32) -> QueryKey {
    let mut params = QueryParams::new(View::Accepted, 12);
    params.set_page(page);
    params.key()
  }

  fn record(id: &str) -> Record {
    Record {
      id: id.to_string(),
      full_name: String::new(),
      email: None,
      phone: None,
      title: None,
      score: Some(60),
      starred: false,
      category: None,
      skills_matched: Vec::new(),
      positive_groups_hit: None,
      document_link: None,
      created_at: String::new(),
    }
  }

  fn pagination() -> Pagination {
    Pagination {
      page: 1,
      limit: 12,
      total_pages: 2,
      total: 14,
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_get_after_put_returns_same_page() {
    let mut cache = QueryCache::new();
    let rows = vec![record("a"), record("b")];
    cache.put(key(1), rows.clone(), pagination());

    let entry = cache.get(&key(1)).unwrap();
    assert_eq!(entry.rows, rows);
    assert_eq!(entry.pagination, pagination());
    assert!(cache.get(&key(2)).is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_entry_expires_after_ttl() {
    let mut cache = QueryCache::new();
    cache.put(key(1), vec![record("a")], pagination());

    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(cache.get(&key(1)).is_some());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(cache.get(&key(1)).is_none());
    // Lazily evicted on the lookup above
    assert!(cache.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_put_overwrites_and_refreshes_timestamp() {
    let mut cache = QueryCache::new().with_ttl(Duration::from_secs(10));
    cache.put(key(1), vec![record("a")], pagination());
    tokio::time::advance(Duration::from_secs(8)).await;
    cache.put(key(1), vec![record("b")], pagination());
    tokio::time::advance(Duration::from_secs(8)).await;

    let entry = cache.get(&key(1)).unwrap();
    assert_eq!(entry.rows[0].id, "b");
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_all_clears_every_key() {
    let mut cache = QueryCache::new();
    cache.put(key(1), vec![record("a")], pagination());
    cache.put(key(2), vec![record("b")], pagination());

    cache.invalidate_all();
    assert!(cache.get(&key(1)).is_none());
    assert!(cache.get(&key(2)).is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_put_if_current_respects_generation() {
    let mut cache = QueryCache::new();
    let page = Page {
      rows: vec![record("a")],
      pagination: pagination(),
    };

    let generation = cache.generation();
    cache.invalidate_all();
    assert!(!cache.put_if_current(generation, key(1), &page));
    assert!(cache.get(&key(1)).is_none());

    assert!(cache.put_if_current(cache.generation(), key(1), &page));
    assert_eq!(cache.lookup(&key(1)).unwrap().data, page);
  }
}
