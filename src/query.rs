//! Query parameters for the list view and the fetch state machine.
//!
//! `QueryParams` is the mutable filter/sort/page state the user edits;
//! `QueryKey` is its immutable, hashable snapshot used to index the cache and
//! to tag fetches.
//!
//! # Example
//!
//! ```ignore
//! let mut params = QueryParams::new(View::Accepted, 12);
//! params.set_search("hplc");          // page back to 1
//! params.toggle_min_score(70);        // 70+ filter, page back to 1
//! params.set_page(3);                 // only the page changes
//! let key = params.key();
//! ```

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::record::Category;

/// Score filter choices offered to the user.
pub const MIN_SCORE_CHOICES: &[u8] = &[50, 60, 70, 80, 90];

/// Score threshold separating accepted from rejected records.
pub const ACCEPT_THRESHOLD: u8 = 50;

/// A list view. Each has a membership predicate, see `router`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
  /// Every record (dashboard)
  All,
  /// Scored at or above the threshold
  Accepted,
  /// Scored below the threshold, or unscored
  Rejected,
  /// Starred by a user
  Starred,
  /// A skill-domain view
  Category(Category),
}

impl View {
  /// Path segment used by the list, purge and analytics endpoints.
  pub fn segment(&self) -> &'static str {
    match self {
      View::All => "all",
      View::Accepted => "accepted",
      View::Rejected => "rejected",
      View::Starred => "starred",
      View::Category(c) => c.tag(),
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      View::All => "Dashboard",
      View::Accepted => "Accepted",
      View::Rejected => "Rejected CVs",
      View::Starred => "Saved",
      View::Category(Category::Gcms) => "GC-MS Applications",
      View::Category(Category::Shopify) => "Shopify Applications",
    }
  }

  #[cfg(test)]
  pub fn all_variants() -> Vec<View> {
    let mut views = vec![View::All, View::Accepted, View::Rejected, View::Starred];
    views.extend(Category::ALL.iter().copied().map(View::Category));
    views
  }
}

impl Default for View {
  fn default() -> Self {
    View::Accepted
  }
}

impl fmt::Display for View {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.segment())
  }
}

impl FromStr for View {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "all" | "dashboard" => Ok(View::All),
      "accepted" => Ok(View::Accepted),
      "rejected" => Ok(View::Rejected),
      "starred" | "saved" => Ok(View::Starred),
      other => Category::from_tag(other)
        .map(View::Category)
        .ok_or_else(|| format!("unknown view '{}'", s)),
    }
  }
}

impl<'de> Deserialize<'de> for View {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortField {
  Score,
  #[default]
  CreatedAt,
}

impl SortField {
  pub fn as_param(&self) -> &'static str {
    match self {
      SortField::Score => "score",
      SortField::CreatedAt => "createdAt",
    }
  }
}

impl FromStr for SortField {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "score" => Ok(SortField::Score),
      "createdat" | "created" | "date" => Ok(SortField::CreatedAt),
      _ => Err(format!("unknown sort field '{}'", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl SortOrder {
  pub fn as_param(&self) -> &'static str {
    match self {
      SortOrder::Asc => "asc",
      SortOrder::Desc => "desc",
    }
  }

  pub fn flipped(&self) -> Self {
    match self {
      SortOrder::Asc => SortOrder::Desc,
      SortOrder::Desc => SortOrder::Asc,
    }
  }

  pub fn arrow(&self) -> &'static str {
    match self {
      SortOrder::Asc => "↑",
      SortOrder::Desc => "↓",
    }
  }
}

/// Canonical identity of one (view, filters, sort, page) combination.
///
/// Two keys are equal iff every component is equal; `search` is compared
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
  pub view: View,
  pub search: String,
  pub min_score: Option<u8>,
  pub sort_by: SortField,
  pub sort_order: SortOrder,
  pub page: u32,
  pub limit: u32,
}

impl QueryKey {
  /// Query string for the list endpoint. Empty search and absent filter are omitted.
  pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if !self.search.is_empty() {
      pairs.push(("search", self.search.clone()));
    }
    if let Some(min) = self.min_score {
      pairs.push(("minScore", min.to_string()));
    }
    pairs.push(("sortBy", self.sort_by.as_param().to_string()));
    pairs.push(("sortOrder", self.sort_order.as_param().to_string()));
    pairs.push(("page", self.page.to_string()));
    pairs.push(("limit", self.limit.to_string()));
    pairs
  }

  /// Short human-readable form for logs.
  pub fn description(&self) -> String {
    let mut s = format!("{} p{}", self.view, self.page);
    if !self.search.is_empty() {
      s.push_str(&format!(" search={:?}", self.search));
    }
    if let Some(min) = self.min_score {
      s.push_str(&format!(" min={}", min));
    }
    s.push_str(&format!(
      " sort={}{}",
      self.sort_by.as_param(),
      self.sort_order.arrow()
    ));
    s
  }
}

/// The user's editable query state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
  view: View,
  search: String,
  min_score: Option<u8>,
  sort_by: SortField,
  sort_order: SortOrder,
  page: u32,
  limit: u32,
}

impl QueryParams {
  pub fn new(view: View, limit: u32) -> Self {
    Self {
      view,
      search: String::new(),
      min_score: None,
      sort_by: SortField::default(),
      sort_order: SortOrder::default(),
      page: 1,
      limit: limit.max(1),
    }
  }

  pub fn key(&self) -> QueryKey {
    QueryKey {
      view: self.view,
      search: self.search.clone(),
      min_score: self.min_score,
      sort_by: self.sort_by,
      sort_order: self.sort_order,
      page: self.page,
      limit: self.limit,
    }
  }

  pub fn view(&self) -> View {
    self.view
  }

  #[cfg(test)]
  pub fn search(&self) -> &str {
    &self.search
  }

  #[cfg(test)]
  pub fn min_score(&self) -> Option<u8> {
    self.min_score
  }

  #[cfg(test)]
  pub fn sort(&self) -> (SortField, SortOrder) {
    (self.sort_by, self.sort_order)
  }

  pub fn page(&self) -> u32 {
    self.page
  }

  /// Switch view. Search, filter, sort and page all go back to defaults.
  pub fn set_view(&mut self, view: View) {
    *self = Self::new(view, self.limit);
  }

  pub fn set_search(&mut self, search: impl Into<String>) {
    self.search = search.into();
    self.page = 1;
  }

  pub fn set_min_score(&mut self, min_score: Option<u8>) {
    self.min_score = min_score;
    self.page = 1;
  }

  /// Select a filter choice; selecting the active one clears the filter.
  pub fn toggle_min_score(&mut self, score: u8) {
    let next = if self.min_score == Some(score) {
      None
    } else {
      Some(score)
    };
    self.set_min_score(next);
  }

  pub fn set_sort(&mut self, sort_by: SortField, sort_order: SortOrder) {
    self.sort_by = sort_by;
    self.sort_order = sort_order;
    self.page = 1;
  }

  /// Pick a sort field: the active field flips direction, another starts descending.
  pub fn toggle_sort(&mut self, sort_by: SortField) {
    let order = if self.sort_by == sort_by {
      self.sort_order.flipped()
    } else {
      SortOrder::Desc
    };
    self.set_sort(sort_by, order);
  }

  pub fn set_page(&mut self, page: u32) {
    self.page = page.max(1);
  }
}

/// State of the active query's fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchState {
  /// Nothing requested yet
  #[default]
  Idle,
  /// A fetch for the active key is in flight
  Fetching,
  /// The last fetch for the active key succeeded
  Ready,
  /// The last fetch failed; previous rows remain visible
  Error(String),
}

#[cfg(test)]
impl FetchState {
  pub fn is_fetching(&self) -> bool {
    matches!(self, FetchState::Fetching)
  }

  pub fn is_ready(&self) -> bool {
    matches!(self, FetchState::Ready)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, FetchState::Error(_))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params() -> QueryParams {
    QueryParams::new(View::Accepted, 12)
  }

  #[test]
  fn test_defaults() {
    let key = params().key();
    assert_eq!(key.page, 1);
    assert_eq!(key.limit, 12);
    assert_eq!(key.sort_by, SortField::CreatedAt);
    assert_eq!(key.sort_order, SortOrder::Desc);
    assert_eq!(key.min_score, None);
    assert!(key.search.is_empty());
  }

  #[test]
  fn test_view_change_resets_everything() {
    let mut p = params();
    p.set_search("hplc");
    p.toggle_min_score(70);
    p.toggle_sort(SortField::Score);
    p.set_page(4);

    p.set_view(View::Rejected);
    assert_eq!(p, QueryParams::new(View::Rejected, 12));
  }

  #[test]
  fn test_filter_sort_search_reset_page() {
    let mut p = params();
    p.set_page(3);
    p.set_search("lab");
    assert_eq!(p.page(), 1);

    p.set_page(3);
    p.toggle_min_score(60);
    assert_eq!(p.page(), 1);
    assert_eq!(p.search(), "lab");

    p.set_page(3);
    p.toggle_sort(SortField::Score);
    assert_eq!(p.page(), 1);
    assert_eq!(p.min_score(), Some(60));
  }

  #[test]
  fn test_page_change_keeps_other_fields() {
    let mut p = params();
    p.set_search("lab");
    p.set_page(5);
    assert_eq!(p.page(), 5);
    assert_eq!(p.search(), "lab");
    p.set_page(0);
    assert_eq!(p.page(), 1);
  }

  #[test]
  fn test_min_score_toggle_clears_on_repeat() {
    let mut p = params();
    p.toggle_min_score(80);
    assert_eq!(p.min_score(), Some(80));
    p.toggle_min_score(80);
    assert_eq!(p.min_score(), None);
  }

  #[test]
  fn test_sort_toggle() {
    let mut p = params();
    p.toggle_sort(SortField::CreatedAt);
    assert_eq!(p.sort(), (SortField::CreatedAt, SortOrder::Asc));
    p.toggle_sort(SortField::Score);
    assert_eq!(p.sort(), (SortField::Score, SortOrder::Desc));
    p.toggle_sort(SortField::Score);
    assert_eq!(p.sort(), (SortField::Score, SortOrder::Asc));
  }

  #[test]
  fn test_keys_compare_search_verbatim() {
    let mut a = params();
    let mut b = params();
    a.set_search("HPLC");
    b.set_search("hplc ");
    assert_ne!(a.key(), b.key());
    b.set_search("HPLC");
    assert_eq!(a.key(), b.key());
  }

  #[test]
  fn test_query_pairs_omit_empty_filters() {
    let pairs = params().key().query_pairs();
    let names: Vec<_> = pairs.iter().map(|(k, _)| *k).collect();
    assert_eq!(names, vec!["sortBy", "sortOrder", "page", "limit"]);
  }

  #[test]
  fn test_view_parsing() {
    assert_eq!("saved".parse::<View>(), Ok(View::Starred));
    assert_eq!("GCMS".parse::<View>(), Ok(View::Category(Category::Gcms)));
    assert!("nope".parse::<View>().is_err());
    for view in View::all_variants() {
      assert_eq!(view.segment().parse::<View>(), Ok(view));
    }
  }
}
