//! Optimistic row store for the active query.
//!
//! Holds the rows currently shown and lets local edits (flag toggles, row
//! removals) apply immediately, before the server confirms them. Fetch results
//! are reconciled against the rows by identifier set:
//!
//! - a fetch for a different query key always replaces the rows;
//! - a fetch issued while a local edit was unconfirmed (or before the latest
//!   local edit) is our own echo in flight and never replaces the rows;
//! - otherwise the rows are replaced only when the identifier set changed,
//!   so local field edits survive refreshes that return the same rows.
//!
//! Edits are tracked by a monotonic revision counter rather than a single
//! "skip next sync" flag, so several mutations can be in flight at once.

use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::cache::{id_set, Identified};
use crate::query::QueryKey;
use crate::record::Record;

/// Revision assigned to a local edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(u64);

/// Snapshot of the store's edit state at the time a fetch was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTag {
  revision: u64,
  quiescent: bool,
}

/// What `sync` did with an inbound row set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
  /// Rows were replaced by the fetched snapshot
  Replaced,
  /// Same identifier set; visible rows (and local edits) kept
  Preserved,
  /// Fetch raced a local edit; visible rows kept until an authoritative fetch
  HeldForEcho,
}

/// Boolean fields that can be toggled locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleField {
  Starred,
}

/// A row plus its local override layer.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticRow {
  snapshot: Record,
  local_starred: Option<bool>,
}

impl OptimisticRow {
  fn new(snapshot: Record) -> Self {
    Self {
      snapshot,
      local_starred: None,
    }
  }

  pub fn id(&self) -> &str {
    &self.snapshot.id
  }

  /// The record as last received from the server.
  #[cfg(test)]
  pub fn snapshot(&self) -> &Record {
    &self.snapshot
  }

  pub fn starred(&self) -> bool {
    self.local_starred.unwrap_or(self.snapshot.starred)
  }

  /// Whether a local edit is layered over the snapshot.
  #[cfg(test)]
  pub fn is_edited(&self) -> bool {
    self.local_starred.is_some()
  }

  /// The record as it should be shown, local edits applied.
  pub fn record(&self) -> Record {
    match self.local_starred {
      Some(starred) => self.snapshot.with_starred(starred),
      None => self.snapshot.clone(),
    }
  }

  fn get(&self, field: ToggleField) -> bool {
    match field {
      ToggleField::Starred => self.starred(),
    }
  }

  fn set(&mut self, field: ToggleField, value: bool) {
    match field {
      ToggleField::Starred => self.local_starred = Some(value),
    }
  }
}

impl Identified for OptimisticRow {
  fn id(&self) -> &str {
    &self.snapshot.id
  }
}

/// A local toggle that was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedToggle {
  pub value: bool,
  pub revision: Revision,
}

#[derive(Debug, Default)]
pub struct OptimisticStore {
  rows: Vec<OptimisticRow>,
  key: Option<QueryKey>,
  /// Identifier set of the most recent inbound fetch
  observed: HashSet<String>,
  revision: u64,
  pending: BTreeSet<Revision>,
  /// Next authoritative sync replaces rows regardless of identifier set
  resync_required: bool,
}

impl OptimisticStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Tag to attach to a fetch issued now.
  pub fn fetch_tag(&self) -> FetchTag {
    FetchTag {
      revision: self.revision,
      quiescent: self.pending.is_empty(),
    }
  }

  /// Reconcile a completed fetch for `key`.
  pub fn sync(&mut self, key: &QueryKey, rows: Vec<Record>, tag: FetchTag) -> SyncOutcome {
    let ids = id_set(&rows);
    let structural = ids != self.observed;
    self.observed = ids;

    if self.key.as_ref() != Some(key) {
      self.key = Some(key.clone());
      self.resync_required = false;
      self.replace(rows);
      return SyncOutcome::Replaced;
    }

    let authoritative = tag.quiescent && tag.revision == self.revision && self.pending.is_empty();
    if !authoritative {
      if structural {
        // Don't lose the shape change; apply it once our edits have landed
        self.resync_required = true;
      }
      debug!(
        revision = self.revision,
        pending = self.pending.len(),
        "holding fetched rows until local edits are confirmed"
      );
      return SyncOutcome::HeldForEcho;
    }

    if structural || self.resync_required {
      self.resync_required = false;
      self.replace(rows);
      SyncOutcome::Replaced
    } else {
      SyncOutcome::Preserved
    }
  }

  fn replace(&mut self, rows: Vec<Record>) {
    self.rows = rows.into_iter().map(OptimisticRow::new).collect();
  }

  fn begin_edit(&mut self) -> Revision {
    self.revision += 1;
    let revision = Revision(self.revision);
    self.pending.insert(revision);
    revision
  }

  /// Flip `field` on row `id`. Returns `None` if the row is not present.
  pub fn apply_local_toggle(&mut self, id: &str, field: ToggleField) -> Option<AppliedToggle> {
    let row = self.rows.iter_mut().find(|r| r.id() == id)?;
    let value = !row.get(field);
    row.set(field, value);
    let revision = self.begin_edit();
    Some(AppliedToggle { value, revision })
  }

  /// Remove row `id`. Returns `None` if the row is not present.
  pub fn apply_local_removal(&mut self, id: &str) -> Option<Revision> {
    let before = self.rows.len();
    self.rows.retain(|r| r.id() != id);
    if self.rows.len() == before {
      return None;
    }
    Some(self.begin_edit())
  }

  /// Remove every row named in `ids`, present or not.
  pub fn apply_local_bulk_removal(&mut self, ids: &[String]) -> Revision {
    let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
    self.rows.retain(|r| !doomed.contains(r.id()));
    self.begin_edit()
  }

  /// Remove every row (delete-all on the active view).
  pub fn apply_local_clear(&mut self) -> Revision {
    self.rows.clear();
    self.begin_edit()
  }

  /// Record the server outcome of a local edit.
  ///
  /// A failed edit makes the next authoritative sync replace the rows.
  pub fn settle(&mut self, revision: Revision, ok: bool) {
    self.pending.remove(&revision);
    if !ok {
      self.resync_required = true;
    }
  }

  /// Insert a pushed record at the top. Returns false for a duplicate id.
  pub fn prepend(&mut self, record: Record) -> bool {
    if self.contains(&record.id) {
      return false;
    }
    self.rows.insert(0, OptimisticRow::new(record));
    true
  }

  pub fn contains(&self, id: &str) -> bool {
    self.rows.iter().any(|r| r.id() == id)
  }

  #[cfg(test)]
  pub fn row(&self, id: &str) -> Option<&OptimisticRow> {
    self.rows.iter().find(|r| r.id() == id)
  }

  /// Records as they should be shown.
  pub fn records(&self) -> Vec<Record> {
    self.rows.iter().map(OptimisticRow::record).collect()
  }

  #[cfg(test)]
  pub fn ids(&self) -> Vec<&str> {
    self.rows.iter().map(OptimisticRow::id).collect()
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn has_pending_edits(&self) -> bool {
    !self.pending.is_empty()
  }

  /// Rows were held back (or an edit failed) and every edit has now settled,
  /// so the active query has to be fetched again to show server state.
  pub fn needs_resync(&self) -> bool {
    self.resync_required && self.pending.is_empty()
  }
}
