use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::Identified;

/// Skill-domain tag attached to a record by the scoring backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  Gcms,
  Shopify,
}

impl Category {
  pub const ALL: &'static [Category] = &[Category::Gcms, Category::Shopify];

  pub fn tag(&self) -> &'static str {
    match self {
      Category::Gcms => "gcms",
      Category::Shopify => "shopify",
    }
  }

  /// Parse a wire/CLI tag. Accepts a few spellings the backend has used.
  pub fn from_tag(tag: &str) -> Option<Self> {
    match tag.trim().to_lowercase().as_str() {
      "gcms" | "gc-ms" | "gc/ms" => Some(Category::Gcms),
      "shopify" => Some(Category::Shopify),
      _ => None,
    }
  }

  /// Lowercase substrings that identify this domain in free text (job titles, skills).
  pub fn keywords(&self) -> &'static [&'static str] {
    match self {
      Category::Gcms => &[
        "gc-ms",
        "gcms",
        "gc/ms",
        "chromatograph",
        "hplc",
        "lab analyst",
        "laboratory",
        "qc analyst",
      ],
      Category::Shopify => &["shopify", "liquid", "e-commerce", "ecommerce"],
    }
  }

  /// Whether `text` mentions this domain.
  pub fn mentioned_in(&self, text: &str) -> bool {
    let text = text.to_lowercase();
    self.keywords().iter().any(|k| text.contains(k))
  }
}

/// Canonical row shape for an applicant record.
///
/// Records are value snapshots: a change always produces a new `Record`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub id: String,
  pub full_name: String,
  pub email: Option<String>,
  pub phone: Option<String>,
  /// Human-readable job title, used by the category heuristic
  pub title: Option<String>,
  /// 0-100, `None` means unscored
  pub score: Option<u8>,
  pub starred: bool,
  pub category: Option<Category>,
  pub skills_matched: Vec<String>,
  pub positive_groups_hit: Option<u32>,
  pub document_link: Option<String>,
  /// Opaque creation timestamp as sent by the server
  pub created_at: String,
}

impl Record {
  /// Copy of this record with a different starred flag.
  pub fn with_starred(&self, starred: bool) -> Self {
    Self {
      starred,
      ..self.clone()
    }
  }

  /// Best-effort parse of the creation timestamp for display.
  pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&self.created_at)
      .map(|dt| dt.with_timezone(&Utc))
      .ok()
  }

  /// Score band label shown next to the score.
  pub fn score_label(&self) -> &'static str {
    match self.score {
      Some(s) if s >= 80 => "Strong match",
      Some(s) if s >= 60 => "Good match",
      Some(s) if s >= 50 => "Borderline",
      Some(_) => "Low match",
      None => "Unscored",
    }
  }
}

impl Identified for Record {
  fn id(&self) -> &str {
    &self.id
  }
}

/// Pagination metadata, always computed by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
  pub page: u32,
  pub limit: u32,
  pub total_pages: u32,
  pub total: u64,
}

/// One slot of the page-number strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
  Page(u32),
  Ellipsis,
}

const MAX_VISIBLE_PAGES: u32 = 5;

impl Pagination {
  /// Zero-based index of the first row on this page, for row numbering.
  pub fn row_start_index(&self) -> u64 {
    u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
  }

  /// Page numbers to offer, with ellipses once there are more than five pages.
  ///
  /// Empty when there is at most one page.
  pub fn page_window(&self) -> Vec<PageSlot> {
    let total = self.total_pages;
    let current = self.page;
    if total <= 1 {
      return Vec::new();
    }

    if total <= MAX_VISIBLE_PAGES {
      return (1..=total).map(PageSlot::Page).collect();
    }

    let mut slots = Vec::new();
    if current <= 3 {
      slots.extend((1..=4).map(PageSlot::Page));
      slots.push(PageSlot::Ellipsis);
      slots.push(PageSlot::Page(total));
    } else if current >= total - 2 {
      slots.push(PageSlot::Page(1));
      slots.push(PageSlot::Ellipsis);
      slots.extend((total - 3..=total).map(PageSlot::Page));
    } else {
      slots.push(PageSlot::Page(1));
      slots.push(PageSlot::Ellipsis);
      slots.extend((current - 1..=current + 1).map(PageSlot::Page));
      slots.push(PageSlot::Ellipsis);
      slots.push(PageSlot::Page(total));
    }
    slots
  }

  pub fn has_next(&self) -> bool {
    self.page < self.total_pages
  }
}

/// A page of records as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
  pub rows: Vec<Record>,
  pub pagination: Pagination,
}

/// Submission counters for one view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
  pub total: u64,
  pub today: u64,
  pub week: u64,
  pub month: u64,
}
