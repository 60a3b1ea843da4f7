use color_eyre::Result;
use tokio::sync::mpsc;

use crate::push::PushEvent;
use crate::query::{QueryKey, View};
use crate::record::{Analytics, Page};
use crate::store::{FetchTag, Revision};

/// Server writes the controller issues optimistically
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
  Star { id: String, value: bool },
  Delete { id: String },
  BulkDelete { ids: Vec<String> },
  DeleteAll { view: View },
}

impl Mutation {
  pub fn describe(&self) -> String {
    match self {
      Mutation::Star { id, value: true } => format!("star {}", id),
      Mutation::Star { id, value: false } => format!("unstar {}", id),
      Mutation::Delete { id } => format!("delete {}", id),
      Mutation::BulkDelete { ids } => format!("delete {} records", ids.len()),
      Mutation::DeleteAll { view } => format!("delete all in {}", view),
    }
  }
}

/// Completions reported back to the controller by its background tasks
#[derive(Debug)]
pub enum Event {
  /// A list fetch finished
  Fetched {
    seq: u64,
    key: QueryKey,
    /// Cache generation when the fetch was issued
    generation: u64,
    tag: FetchTag,
    result: Result<Page>,
  },
  /// A mutation finished. `Ok` carries the number of records affected.
  Mutated {
    revision: Revision,
    mutation: Mutation,
    result: Result<u64>,
  },
  AnalyticsLoaded {
    view: View,
    result: Result<Analytics>,
  },
  Push(PushEvent),
  /// The notice timer for `generation` fired
  NoticeExpired { generation: u64 },
}

/// Single ordered queue of controller events
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self { tx, rx }
  }

  /// Sender for spawned tasks
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

impl Default for EventHandler {
  fn default() -> Self {
    Self::new()
  }
}
