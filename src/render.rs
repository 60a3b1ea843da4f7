//! Plain-text rendering of the list state for the console.

use chrono::{DateTime, Utc};

use crate::commands::COMMANDS;
use crate::query::{FetchState, QueryParams};
use crate::record::{Analytics, PageSlot, Pagination, Record};

/// One-line summary of the active query and fetch state.
pub fn header(
  params: &QueryParams,
  state: &FetchState,
  saving: bool,
  push_connected: bool,
) -> String {
  let key = params.key();
  let mut line = format!("[{}]", params.view().label());
  if !key.search.is_empty() {
    line.push_str(&format!(" search \"{}\"", key.search));
  }
  if let Some(min) = key.min_score {
    line.push_str(&format!(" score {}+", min));
  }
  line.push_str(&format!(
    " sort {}{}",
    key.sort_by.as_param(),
    key.sort_order.arrow()
  ));

  let status = match state {
    FetchState::Idle => "idle",
    FetchState::Fetching => "loading…",
    FetchState::Ready => "ready",
    FetchState::Error(_) => "error",
  };
  line.push_str(&format!(" | {}", status));
  if saving {
    line.push_str(" | saving…");
  }
  if push_connected {
    line.push_str(" | live");
  }
  line
}

/// Numbered rows for the current page.
pub fn rows(records: &[Record], pagination: Option<&Pagination>, now: DateTime<Utc>) -> String {
  if records.is_empty() {
    return "  (no CVs)".to_string();
  }
  let start = pagination.map_or(0, Pagination::row_start_index);
  records
    .iter()
    .enumerate()
    .map(|(i, r)| row(start + i as u64 + 1, r, now))
    .collect::<Vec<_>>()
    .join("\n")
}

fn row(number: u64, record: &Record, now: DateTime<Utc>) -> String {
  let star = if record.starred { "★" } else { " " };
  let score = record
    .score
    .map(|s| format!("{:>3}", s))
    .unwrap_or_else(|| "  -".to_string());
  let category = record.category.map_or("", |c| c.tag());
  let received = record
    .created_at_utc()
    .map(|at| relative_time(at, now))
    .unwrap_or_default();
  format!(
    "{:>4}. {} {:<28} {} {:<12} {:<8} {:<10} {}",
    number,
    star,
    truncate(&record.full_name, 28),
    score,
    record.score_label(),
    category,
    received,
    record.id
  )
}

/// "3m ago" style age, falling back to the date after a week.
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let age = now.signed_duration_since(at);
  if age.num_seconds() < 60 {
    "just now".to_string()
  } else if age.num_minutes() < 60 {
    format!("{}m ago", age.num_minutes())
  } else if age.num_hours() < 24 {
    format!("{}h ago", age.num_hours())
  } else if age.num_days() < 7 {
    format!("{}d ago", age.num_days())
  } else {
    at.format("%Y-%m-%d").to_string()
  }
}

fn truncate(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    return s.to_string();
  }
  let mut out: String = s.chars().take(max - 1).collect();
  out.push('…');
  out
}

/// "Page 2 of 9 (104 CVs)  1 [2] 3 4 … 9"
pub fn page_window(pagination: &Pagination) -> String {
  let mut line = format!(
    "Page {} of {} ({} CVs)",
    pagination.page,
    pagination.total_pages.max(1),
    pagination.total
  );
  let slots = pagination.page_window();
  if !slots.is_empty() {
    let strip: Vec<String> = slots
      .iter()
      .map(|slot| match slot {
        PageSlot::Page(p) if *p == pagination.page => format!("[{}]", p),
        PageSlot::Page(p) => p.to_string(),
        PageSlot::Ellipsis => "…".to_string(),
      })
      .collect();
    line.push_str("  ");
    line.push_str(&strip.join(" "));
  }
  line
}

pub fn analytics(label: &str, analytics: &Analytics) -> String {
  format!(
    "{}: {} total | {} today | {} this week | {} this month",
    label, analytics.total, analytics.today, analytics.week, analytics.month
  )
}

pub fn help() -> String {
  COMMANDS
    .iter()
    .map(|c| format!("  {:<34} {}", c.usage, c.description))
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::View;
  use chrono::TimeZone;

  fn record(id: &str, name: &str, score: Option<u8>) -> Record {
    Record {
      id: id.to_string(),
      full_name: name.to_string(),
      email: None,
      phone: None,
      title: None,
      score,
      starred: false,
      category: None,
      skills_matched: Vec::new(),
      positive_groups_hit: None,
      document_link: None,
      created_at: "2024-11-20T12:00:00Z".to_string(),
    }
  }

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 20, 12, 30, 0).unwrap()
  }

  #[test]
  fn test_rows_are_numbered_from_page_start() {
    let pagination = Pagination {
      page: 2,
      limit: 12,
      total_pages: 3,
      total: 30,
    };
    let out = rows(
      &[record("x9", "Michael Chen", Some(78))],
      Some(&pagination),
      now(),
    );
    assert!(out.trim_start().starts_with("13."));
    assert!(out.contains("Michael Chen"));
    assert!(out.contains("30m ago"));
    assert!(out.ends_with("x9"));
  }

  #[test]
  fn test_empty_rows() {
    assert_eq!(rows(&[], None, now()), "  (no CVs)");
  }

  #[test]
  fn test_page_window_marks_current() {
    let pagination = Pagination {
      page: 5,
      limit: 12,
      total_pages: 9,
      total: 104,
    };
    assert_eq!(
      page_window(&pagination),
      "Page 5 of 9 (104 CVs)  1 … 4 [5] 6 … 9"
    );
  }

  #[test]
  fn test_header() {
    let mut params = QueryParams::new(View::Accepted, 12);
    params.set_search("hplc");
    params.toggle_min_score(70);
    let line = header(&params, &FetchState::Ready, false, true);
    assert_eq!(
      line,
      "[Accepted] search \"hplc\" score 70+ sort createdAt↓ | ready | live"
    );

    let line = header(&params, &FetchState::Fetching, true, false);
    assert!(line.ends_with("| loading… | saving…"));
  }

  #[test]
  fn test_relative_time() {
    let at = Utc.with_ymd_and_hms(2024, 11, 1, 8, 0, 0).unwrap();
    assert_eq!(relative_time(at, now()), "2024-11-01");
    assert_eq!(relative_time(now(), now()), "just now");
  }

  #[test]
  fn test_long_names_are_truncated() {
    assert_eq!(truncate("Alexandria Montgomery-Featherstone", 10), "Alexandri…");
    assert_eq!(truncate("Sam", 10), "Sam");
  }
}
