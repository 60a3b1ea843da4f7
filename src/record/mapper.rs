//! Normalization of raw server records into [`Record`].
//!
//! Everything here is a pure function of its input.

use super::api_types::{ApiAnalytics, ApiPagination, ApiRecord};
use super::types::{Analytics, Category, Pagination, Record};

/// Map a raw record into the canonical row shape.
///
/// Returns `None` for records without a usable identifier, since those can
/// never be reconciled against a row set.
pub fn map_record(raw: ApiRecord) -> Option<Record> {
  let id = raw.id_string()?;
  let category = raw
    .category
    .as_deref()
    .and_then(Category::from_tag)
    .or_else(|| infer_category(&raw));

  Some(Record {
    id,
    full_name: raw.full_name.unwrap_or_default(),
    email: raw.email.filter(|s| !s.is_empty()),
    phone: raw.phone.filter(|s| !s.is_empty()),
    title: raw.job_title.filter(|s| !s.is_empty()),
    score: raw.score.and_then(normalize_score),
    starred: raw.starred.unwrap_or(false),
    category,
    skills_matched: raw.skills_matched,
    positive_groups_hit: raw.gcms_positive_groups_hit,
    document_link: raw.google_drive_link,
    created_at: raw.created_at.unwrap_or_default(),
  })
}

/// Map every record, dropping those without an identifier.
pub fn map_records(raw: Vec<ApiRecord>) -> Vec<Record> {
  let total = raw.len();
  let rows: Vec<Record> = raw.into_iter().filter_map(map_record).collect();
  if rows.len() != total {
    tracing::warn!(
      dropped = total - rows.len(),
      "dropped records without an identifier"
    );
  }
  rows
}

pub fn map_pagination(raw: ApiPagination) -> Pagination {
  Pagination {
    page: raw.page.max(1),
    limit: raw.limit,
    total_pages: raw.total_pages,
    total: raw.total,
  }
}

pub fn map_analytics(raw: ApiAnalytics) -> Analytics {
  Analytics {
    total: raw.total,
    today: raw.today,
    week: raw.week,
    month: raw.month,
  }
}

/// Round to an integer and clamp into 0..=100. Non-finite scores count as unscored.
fn normalize_score(score: f64) -> Option<u8> {
  if !score.is_finite() {
    return None;
  }
  Some(score.round().clamp(0.0, 100.0) as u8)
}

/// Fill in a missing category from structured fields.
///
/// Only structured signals are used here; free-text title matching is left to
/// the view router so that it stays visibly a heuristic.
fn infer_category(raw: &ApiRecord) -> Option<Category> {
  if raw.gcms_positive_groups_hit.unwrap_or(0) > 0 {
    return Some(Category::Gcms);
  }

  Category::ALL.iter().copied().find(|category| {
    raw
      .skills_matched
      .iter()
      .any(|skill| category.mentioned_in(skill))
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn raw(value: serde_json::Value) -> ApiRecord {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn test_maps_core_fields() {
    let record = map_record(raw(json!({
      "_id": "x9",
      "fullName": "Michael Chen",
      "jobTitle": "QC Lab Analyst",
      "score": 72,
      "starred": true,
      "category": "gcms",
      "createdAt": "2024-11-18T09:00:00Z"
    })))
    .unwrap();

    assert_eq!(record.id, "x9");
    assert_eq!(record.score, Some(72));
    assert!(record.starred);
    assert_eq!(record.category, Some(Category::Gcms));
    assert_eq!(record.title.as_deref(), Some("QC Lab Analyst"));
    assert!(record.created_at_utc().is_some());
  }

  #[test]
  fn test_missing_id_is_dropped() {
    assert!(map_record(raw(json!({ "fullName": "Nobody" }))).is_none());
    let rows = map_records(vec![
      raw(json!({ "id": "a1" })),
      raw(json!({ "fullName": "Nobody" })),
    ]);
    assert_eq!(rows.len(), 1);
  }

  #[test]
  fn test_score_is_rounded_and_clamped() {
    assert_eq!(normalize_score(49.6), Some(50));
    assert_eq!(normalize_score(140.0), Some(100));
    assert_eq!(normalize_score(-3.0), Some(0));
    assert_eq!(normalize_score(f64::NAN), None);
  }

  #[test]
  fn test_category_inferred_from_structured_fields() {
    let from_groups = map_record(raw(json!({ "id": "g", "gcmsPositiveGroupsHit": 3 }))).unwrap();
    assert_eq!(from_groups.category, Some(Category::Gcms));

    let from_skills =
      map_record(raw(json!({ "id": "s", "skillsMatched": ["Shopify Plus", "React"] }))).unwrap();
    assert_eq!(from_skills.category, Some(Category::Shopify));

    let unknown = map_record(raw(json!({ "id": "u", "jobTitle": "Shopify developer" }))).unwrap();
    assert_eq!(unknown.category, None);
  }

  #[test]
  fn test_unscored_and_defaults() {
    let record = map_record(raw(json!({ "id": 7, "score": null }))).unwrap();
    assert_eq!(record.id, "7");
    assert_eq!(record.score, None);
    assert!(!record.starred);
    assert_eq!(record.score_label(), "Unscored");
  }
}
