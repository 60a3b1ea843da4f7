//! Membership routing for pushed records.
//!
//! A pushed record is only ever checked against the view currently on screen.
//! Anything short of a positive match means the caller refetches instead of
//! guessing where the record would land.

use crate::query::{View, ACCEPT_THRESHOLD};
use crate::record::{Category, Record};

/// Outcome of checking a record against a view's predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
  /// The record belongs in the view
  Matches,
  /// The record has the data the predicate needs and fails it
  Excluded,
  /// The predicate cannot be decided from the record's data
  Unknown,
}

impl Membership {
  pub fn is_match(&self) -> bool {
    matches!(self, Membership::Matches)
  }
}

/// Decides view membership for pushed records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewPredicateRouter;

impl ViewPredicateRouter {
  pub fn new() -> Self {
    Self
  }

  /// Evaluate `view`'s predicate for `record`. Pure.
  pub fn classify(&self, record: &Record, view: View) -> Membership {
    match view {
      View::All => Membership::Matches,
      View::Accepted => match record.score {
        Some(score) if score >= ACCEPT_THRESHOLD => Membership::Matches,
        _ => Membership::Excluded,
      },
      View::Rejected => match record.score {
        Some(score) if score >= ACCEPT_THRESHOLD => Membership::Excluded,
        _ => Membership::Matches,
      },
      View::Starred => {
        if record.starred {
          Membership::Matches
        } else {
          Membership::Excluded
        }
      }
      View::Category(tag) => classify_category(record, tag),
    }
  }

  /// Whether an excluded record provably cannot concern `view` at all.
  ///
  /// True only for a category view and a record whose category is known and
  /// different. Used as an optional shortcut to skip the refetch.
  pub fn is_disjoint(&self, record: &Record, view: View) -> bool {
    match (view, record.category) {
      (View::Category(tag), Some(category)) => tag != category,
      _ => false,
    }
  }
}

fn classify_category(record: &Record, tag: Category) -> Membership {
  match record.category {
    Some(category) if category == tag => Membership::Matches,
    Some(_) => Membership::Excluded,
    // Upstream tagging is best-effort; fall back to the job title
    None => match record.title.as_deref() {
      Some(title) if tag.mentioned_in(title) => Membership::Matches,
      _ => Membership::Unknown,
    },
  }
}
