//! Serde-deserializable types matching the record store's JSON responses.
//!
//! These types are separate from domain types so the wire format can stay
//! loose (camelCase, nullable everything) while `Record` stays strict.

use serde::{Deserialize, Serialize};

// ============================================================================
// Envelope
// ============================================================================

/// `{ success, data }` wrapper used by list, analytics and push payloads.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
  #[serde(default)]
  pub success: bool,
  pub data: Option<T>,
  #[serde(default)]
  pub message: Option<String>,
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRecord {
  /// Either `_id` (document stores) or `id`; string or number
  #[serde(rename = "_id", alias = "id", default)]
  pub id: Option<serde_json::Value>,
  #[serde(default)]
  pub full_name: Option<String>,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub job_title: Option<String>,
  /// Some scorers emit fractional scores
  #[serde(default)]
  pub score: Option<f64>,
  #[serde(default)]
  pub starred: Option<bool>,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub skills_matched: Vec<String>,
  #[serde(default)]
  pub gcms_positive_groups_hit: Option<u32>,
  #[serde(default)]
  pub google_drive_link: Option<String>,
  #[serde(default, alias = "timestamp")]
  pub created_at: Option<String>,
}

impl ApiRecord {
  /// Identifier rendered as a string, if present.
  pub fn id_string(&self) -> Option<String> {
    match self.id.as_ref()? {
      serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
      serde_json::Value::Number(n) => Some(n.to_string()),
      _ => None,
    }
  }
}

// ============================================================================
// List endpoint response
// ============================================================================

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPagination {
  #[serde(default = "first_page")]
  pub page: u32,
  #[serde(default)]
  pub limit: u32,
  #[serde(default)]
  pub total_pages: u32,
  #[serde(default)]
  pub total: u64,
}

fn first_page() -> u32 {
  1
}

#[derive(Debug, Deserialize)]
pub struct ApiListResponse {
  #[serde(default)]
  pub success: bool,
  #[serde(default)]
  pub data: Vec<ApiRecord>,
  pub pagination: Option<ApiPagination>,
  #[serde(default)]
  pub message: Option<String>,
}

// ============================================================================
// Mutation bodies and responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiFlagBody {
  pub value: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiBulkDeleteBody<'a> {
  pub ids: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct ApiPurgeResponse {
  #[serde(default)]
  pub deleted: u64,
}

/// Generic `{ success }` acknowledgement for flag/delete calls.
///
/// An empty body is accepted as success by the client.
#[derive(Debug, Deserialize)]
pub struct ApiAck {
  #[serde(default = "acknowledged")]
  pub success: bool,
  #[serde(default)]
  pub message: Option<String>,
}

fn acknowledged() -> bool {
  true
}

// ============================================================================
// Analytics endpoint response
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ApiAnalytics {
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub today: u64,
  #[serde(default)]
  pub week: u64,
  #[serde(default)]
  pub month: u64,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_record_accepts_mongo_style_id() {
    let raw: ApiRecord = serde_json::from_value(json!({
      "_id": "65f0c0ffee",
      "fullName": "Sarah Johnson",
      "score": 92,
      "createdAt": "2024-11-15T10:00:00Z"
    }))
    .unwrap();
    assert_eq!(raw.id_string().as_deref(), Some("65f0c0ffee"));
    assert_eq!(raw.score, Some(92.0));
  }

  #[test]
  fn test_record_accepts_numeric_id_and_timestamp_alias() {
    let raw: ApiRecord = serde_json::from_value(json!({
      "id": 4,
      "timestamp": "2024-11-21T08:30:00Z",
      "score": null
    }))
    .unwrap();
    assert_eq!(raw.id_string().as_deref(), Some("4"));
    assert_eq!(raw.created_at.as_deref(), Some("2024-11-21T08:30:00Z"));
    assert_eq!(raw.score, None);
  }

  #[test]
  fn test_list_response_without_pagination() {
    let resp: ApiListResponse = serde_json::from_value(json!({
      "success": true,
      "data": []
    }))
    .unwrap();
    assert!(resp.success);
    assert!(resp.pagination.is_none());
  }

  #[test]
  fn test_empty_ack_defaults_to_success() {
    let ack: ApiAck = serde_json::from_str("{}").unwrap();
    assert!(ack.success);
  }
}
