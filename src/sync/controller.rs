//! The single-owner controller tying the query, cache, router and store
//! together.
//!
//! All state lives here and is only touched from `handle`. Network calls run
//! in spawned tasks that report back through one ordered event queue.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::RecordApi;
use crate::cache::QueryCache;
use crate::config::SyncConfig;
use crate::event::{Event, EventHandler, Mutation};
use crate::push::{PushEvent, PushSink, PushSource, Subscription};
use crate::query::{FetchState, QueryKey, QueryParams, SortField, View};
use crate::record::{Analytics, Page, Pagination, Record};
use crate::router::{Membership, ViewPredicateRouter};
use crate::store::{FetchTag, OptimisticStore, Revision, SyncOutcome, ToggleField};

use super::error::SyncError;
use super::notice::NoticeBoard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
  Created,
  Mounted,
  TornDown,
}

pub struct SyncController {
  api: Arc<dyn RecordApi>,
  push: Option<Arc<dyn PushSource>>,
  settings: SyncConfig,

  params: QueryParams,
  cache: QueryCache,
  router: ViewPredicateRouter,
  store: OptimisticStore,

  state: FetchState,
  pagination: Option<Pagination>,
  error: Option<SyncError>,
  notice: NoticeBoard,
  analytics: Option<Analytics>,
  last_outcome: Option<SyncOutcome>,

  /// Sequence number of the most recently issued fetch
  issued_seq: u64,
  /// Sequence number of the most recently applied fetch response
  applied_seq: u64,

  lifecycle: Lifecycle,
  subscription: Option<Subscription>,
  push_connected: bool,

  events: EventHandler,
}

impl SyncController {
  pub fn new(
    api: Arc<dyn RecordApi>,
    push: Option<Arc<dyn PushSource>>,
    settings: SyncConfig,
    view: View,
  ) -> Self {
    Self {
      api,
      push,
      params: QueryParams::new(view, settings.page_size),
      cache: QueryCache::new().with_ttl(settings.cache_ttl()),
      router: ViewPredicateRouter::new(),
      store: OptimisticStore::new(),
      state: FetchState::Idle,
      pagination: None,
      error: None,
      notice: NoticeBoard::new(settings.notice_duration()),
      analytics: None,
      last_outcome: None,
      issued_seq: 0,
      applied_seq: 0,
      lifecycle: Lifecycle::Created,
      subscription: None,
      push_connected: false,
      events: EventHandler::new(),
      settings,
    }
  }

  // ===========================================================================
  // Lifecycle
  // ===========================================================================

  /// Subscribe to push events and load the initial query. Only the first call
  /// has any effect.
  pub fn mount(&mut self) {
    if self.lifecycle != Lifecycle::Created {
      warn!("controller already mounted; ignoring");
      return;
    }
    self.lifecycle = Lifecycle::Mounted;

    if let Some(push) = &self.push {
      let tx = self.events.sender();
      let sink: PushSink = Arc::new(move |event| {
        let _ = tx.send(Event::Push(event));
      });
      match push.subscribe(sink) {
        Ok(subscription) => self.subscription = Some(subscription),
        Err(e) => warn!(error = %e, "push subscription failed; continuing without live updates"),
      }
    }

    self.load();
    self.load_analytics();
  }

  /// Drop the push subscription and pending notice. Only the first call after
  /// `mount` has any effect.
  pub fn teardown(&mut self) {
    if self.lifecycle != Lifecycle::Mounted {
      warn!("controller not mounted; ignoring teardown");
      return;
    }
    self.lifecycle = Lifecycle::TornDown;
    if let Some(subscription) = self.subscription.take() {
      subscription.unsubscribe();
    }
    self.notice.clear();
    self.push_connected = false;
  }

  // ===========================================================================
  // Query parameters
  // ===========================================================================

  /// Switch views. Search, filter, sort and page go back to their defaults.
  pub fn set_view(&mut self, view: View) {
    let changed = view != self.params.view();
    self.params.set_view(view);
    if changed {
      self.analytics = None;
      self.load_analytics();
    }
    self.load();
  }

  pub fn set_search(&mut self, search: &str) {
    self.params.set_search(search);
    self.load();
  }

  /// Select a minimum-score filter; selecting the active one clears it.
  pub fn toggle_min_score(&mut self, score: u8) {
    self.params.toggle_min_score(score);
    self.load();
  }

  pub fn clear_min_score(&mut self) {
    self.params.set_min_score(None);
    self.load();
  }

  /// Sort by `field`; the active field flips direction.
  pub fn toggle_sort(&mut self, field: SortField) {
    self.params.toggle_sort(field);
    self.load();
  }

  pub fn set_page(&mut self, page: u32) {
    let page = match self.pagination {
      Some(p) if p.total_pages > 0 => page.min(p.total_pages),
      _ => page,
    };
    self.params.set_page(page);
    self.load();
  }

  pub fn next_page(&mut self) {
    if self.pagination.map_or(false, |p| p.has_next()) {
      self.set_page(self.params.page() + 1);
    }
  }

  pub fn prev_page(&mut self) {
    if self.params.page() > 1 {
      self.set_page(self.params.page() - 1);
    }
  }

  /// Bypass the cache and reload the active query and analytics.
  pub fn refresh(&mut self) {
    self.cache.invalidate_all();
    self.fetch(self.params.key());
    self.load_analytics();
  }

  // ===========================================================================
  // Mutations
  // ===========================================================================

  /// Flip the starred flag on a visible row. Returns false if the row is not
  /// shown.
  pub fn toggle_starred(&mut self, id: &str) -> bool {
    let Some(applied) = self.store.apply_local_toggle(id, ToggleField::Starred) else {
      warn!(id, "cannot star a record that is not shown");
      return false;
    };

    let api = self.api.clone();
    let target = id.to_string();
    self.spawn_mutation(
      applied.revision,
      Mutation::Star {
        id: id.to_string(),
        value: applied.value,
      },
      async move { api.set_starred(&target, applied.value).await.map(|_| 1) },
    );
    true
  }

  /// Delete a visible row. Returns false if the row is not shown.
  pub fn delete(&mut self, id: &str) -> bool {
    let Some(revision) = self.store.apply_local_removal(id) else {
      warn!(id, "cannot delete a record that is not shown");
      return false;
    };

    let api = self.api.clone();
    let target = id.to_string();
    self.spawn_mutation(
      revision,
      Mutation::Delete { id: id.to_string() },
      async move { api.delete(&target).await.map(|_| 1) },
    );
    true
  }

  /// Delete several records in one call. Named rows disappear at once.
  pub fn bulk_delete(&mut self, ids: Vec<String>) {
    if ids.is_empty() {
      return;
    }
    let revision = self.store.apply_local_bulk_removal(&ids);

    let api = self.api.clone();
    let targets = ids.clone();
    self.spawn_mutation(
      revision,
      Mutation::BulkDelete { ids },
      async move {
        let count = targets.len() as u64;
        api.bulk_delete(&targets).await.map(|_| count)
      },
    );
  }

  /// Delete every record in the active view.
  pub fn delete_all(&mut self) {
    let view = self.params.view();
    let revision = self.store.apply_local_clear();

    let api = self.api.clone();
    self.spawn_mutation(
      revision,
      Mutation::DeleteAll { view },
      async move { api.delete_all(view).await },
    );
  }

  fn spawn_mutation<F>(&mut self, revision: Revision, mutation: Mutation, call: F)
  where
    F: std::future::Future<Output = color_eyre::Result<u64>> + Send + 'static,
  {
    // Cached pages may still hold the pre-mutation state
    self.cache.invalidate_all();
    debug!(mutation = %mutation.describe(), "applied locally");

    let tx = self.events.sender();
    tokio::spawn(async move {
      let result = call.await;
      let _ = tx.send(Event::Mutated {
        revision,
        mutation,
        result,
      });
    });
  }

  // ===========================================================================
  // Fetching
  // ===========================================================================

  /// Serve the active query from the cache, or fetch it.
  fn load(&mut self) {
    let key = self.params.key();
    match self.cache.lookup(&key) {
      Some(hit) => {
        debug!(key = %key.description(), age_ms = hit.age().as_millis() as u64, "cache hit");
        // Anything still in flight is for a key we've moved away from
        self.applied_seq = self.issued_seq;
        self.apply_page(&key, hit.data, self.store.fetch_tag());
        self.state = FetchState::Ready;
      }
      None => {
        debug!(key = %key.description(), "cache miss");
        self.fetch(key);
      }
    }
  }

  fn fetch(&mut self, key: QueryKey) {
    self.issued_seq += 1;
    let seq = self.issued_seq;
    let generation = self.cache.generation();
    let tag = self.store.fetch_tag();
    self.state = FetchState::Fetching;

    let api = self.api.clone();
    let tx = self.events.sender();
    tokio::spawn(async move {
      let result = api.fetch_page(&key).await;
      let _ = tx.send(Event::Fetched {
        seq,
        key,
        generation,
        tag,
        result,
      });
    });
  }

  fn apply_page(&mut self, key: &QueryKey, page: Page, tag: FetchTag) {
    let outcome = self.store.sync(key, page.rows, tag);
    // Held rows aren't shown, so neither is their pagination
    if outcome != SyncOutcome::HeldForEcho {
      self.pagination = Some(page.pagination);
    }
    self.last_outcome = Some(outcome);
    debug!(key = %key.description(), ?outcome, "rows synced");
  }

  fn load_analytics(&mut self) {
    let view = self.params.view();
    let api = self.api.clone();
    let tx = self.events.sender();
    tokio::spawn(async move {
      let result = api.analytics(view).await;
      let _ = tx.send(Event::AnalyticsLoaded { view, result });
    });
  }

  // ===========================================================================
  // Event handling
  // ===========================================================================

  /// Wait for the next event and apply it.
  pub async fn step(&mut self) {
    if let Some(event) = self.events.next().await {
      self.handle(event);
    }
  }

  pub fn handle(&mut self, event: Event) {
    match event {
      Event::Fetched {
        seq,
        key,
        generation,
        tag,
        result,
      } => self.on_fetched(seq, key, generation, tag, result),
      Event::Mutated {
        revision,
        mutation,
        result,
      } => self.on_mutated(revision, mutation, result),
      Event::AnalyticsLoaded { view, result } => match result {
        Ok(analytics) if view == self.params.view() => self.analytics = Some(analytics),
        Ok(_) => debug!(%view, "discarding analytics for inactive view"),
        Err(e) => warn!(%view, error = %e, "failed to load analytics"),
      },
      Event::Push(event) => self.on_push(event),
      Event::NoticeExpired { generation } => {
        self.notice.expire(generation);
      }
    }
  }

  fn on_fetched(
    &mut self,
    seq: u64,
    key: QueryKey,
    generation: u64,
    tag: FetchTag,
    result: color_eyre::Result<Page>,
  ) {
    if seq <= self.applied_seq {
      debug!(seq, applied = self.applied_seq, "discarding stale response");
      return;
    }
    if key != self.params.key() {
      debug!(seq, key = %key.description(), "discarding response for inactive query");
      return;
    }
    self.applied_seq = seq;
    let latest = seq == self.issued_seq;

    match result {
      Ok(page) => {
        if !self.cache.put_if_current(generation, key.clone(), &page) {
          debug!(seq, "cache invalidated during fetch; not caching response");
        }
        info!(
          key = %key.description(),
          rows = page.rows.len(),
          total = page.pagination.total,
          "page loaded"
        );
        self.apply_page(&key, page, tag);
        if let Some(SyncError::Fetch(_)) = self.error {
          self.error = None;
        }
        if latest {
          self.state = FetchState::Ready;
        }
        let held = self.last_outcome == Some(SyncOutcome::HeldForEcho);
        // A newer fetch in flight gets the same check when it lands
        if latest && held && self.store.needs_resync() {
          debug!(seq, "held rows raced an edit that has since settled; reloading");
          self.fetch(self.params.key());
        }
      }
      Err(e) => {
        let message = e.to_string();
        warn!(key = %key.description(), error = %message, "fetch failed");
        self.error = Some(SyncError::Fetch(message.clone()));
        if latest {
          self.state = FetchState::Error(message);
        }
      }
    }
  }

  fn on_mutated(&mut self, revision: Revision, mutation: Mutation, result: color_eyre::Result<u64>) {
    let ok = result.is_ok();
    self.store.settle(revision, ok);
    self.cache.invalidate_all();

    match result {
      Ok(count) => {
        info!(mutation = %mutation.describe(), count, "change saved");
        if let Mutation::DeleteAll { view } = mutation {
          self.show_notice(format!("Deleted {} records from {}", count, view.label()));
          self.load_analytics();
        }
      }
      Err(e) => {
        let message = e.to_string();
        warn!(mutation = %mutation.describe(), error = %message, "change failed; reloading");
        self.error = Some(SyncError::Mutation(message));
      }
    }

    // A failure, or rows held back while edits were in flight, leave the
    // screen out of date. Reload once the last edit has settled so the
    // response is authoritative.
    if self.store.needs_resync() {
      self.fetch(self.params.key());
    }
  }

  fn on_push(&mut self, event: PushEvent) {
    match event {
      PushEvent::Connected => {
        info!("live updates connected");
        self.push_connected = true;
      }
      PushEvent::Disconnected { reason } => {
        info!(reason = %reason, "live updates disconnected");
        self.push_connected = false;
      }
      PushEvent::RecordCreated(record) => self.on_record_created(record),
    }
  }

  fn on_record_created(&mut self, record: Record) {
    let view = self.params.view();
    let membership = self.router.classify(&record, view);
    debug!(id = %record.id, %view, ?membership, "classified pushed record");

    if membership.is_match() {
      let name = record.full_name.clone();
      if self.store.prepend(record) {
        self.cache.invalidate_all();
        self.show_notice(format!("New CV received: {}", name));
      }
      return;
    }

    if membership == Membership::Excluded
      && self.settings.skip_disjoint_refetch
      && self.router.is_disjoint(&record, view)
    {
      debug!(id = %record.id, "pushed record cannot affect this view; skipping refetch");
      return;
    }

    self.cache.invalidate_all();
    self.fetch(self.params.key());
  }

  fn show_notice(&mut self, message: String) {
    let tx = self.events.sender();
    self.notice.show(message, &tx);
  }

  // ===========================================================================
  // Accessors
  // ===========================================================================

  pub fn params(&self) -> &QueryParams {
    &self.params
  }

  pub fn state(&self) -> &FetchState {
    &self.state
  }

  pub fn records(&self) -> Vec<Record> {
    self.store.records()
  }

  /// Whether a local edit is still waiting for the server.
  pub fn has_pending_edits(&self) -> bool {
    self.store.has_pending_edits()
  }

  #[cfg(test)]
  pub fn store(&self) -> &OptimisticStore {
    &self.store
  }

  pub fn pagination(&self) -> Option<Pagination> {
    self.pagination
  }

  pub fn error(&self) -> Option<&SyncError> {
    self.error.as_ref()
  }

  pub fn clear_error(&mut self) {
    self.error = None;
  }

  pub fn notice(&self) -> Option<&str> {
    self.notice.current()
  }

  pub fn analytics(&self) -> Option<Analytics> {
    self.analytics
  }

  pub fn is_push_connected(&self) -> bool {
    self.push_connected
  }

  #[cfg(test)]
  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  /// Whether the controller is mounted and not yet torn down.
  #[cfg(test)]
  pub fn is_mounted(&self) -> bool {
    self.lifecycle == Lifecycle::Mounted
  }

  /// What the most recent page application did to the rows.
  #[cfg(test)]
  pub fn last_outcome(&self) -> Option<SyncOutcome> {
    self.last_outcome
  }
}
