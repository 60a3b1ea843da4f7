//! Live "record created" notifications.
//!
//! The controller only sees the [`PushSource`] trait; the Socket.IO transport
//! in [`socketio`] is one implementation and tests drive a fake.

pub mod socketio;

use color_eyre::Result;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::record::Record;

pub use socketio::SocketIoSource;

/// Events delivered by a push source.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
  Connected,
  Disconnected { reason: String },
  /// A record was created on the server
  RecordCreated(Record),
}

/// Callback a push source delivers events into.
pub type PushSink = Arc<dyn Fn(PushEvent) + Send + Sync>;

/// A source of push events.
pub trait PushSource: Send + Sync + 'static {
  /// Start delivering events into `sink` until the returned subscription is
  /// dropped or unsubscribed.
  fn subscribe(&self, sink: PushSink) -> Result<Subscription>;
}

/// Handle to an active push subscription.
pub struct Subscription {
  cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
  pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
    Self {
      cancel: Some(Box::new(cancel)),
    }
  }

  /// Subscription backed by a spawned task; unsubscribing aborts it.
  pub fn from_task(handle: JoinHandle<()>) -> Self {
    Self::new(move || handle.abort())
  }

  pub fn unsubscribe(mut self) {
    if let Some(cancel) = self.cancel.take() {
      cancel();
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(cancel) = self.cancel.take() {
      cancel();
    }
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("active", &self.cancel.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[test]
  fn test_unsubscribe_cancels_once() {
    let cancelled = Arc::new(AtomicUsize::new(0));
    let counter = cancelled.clone();
    let sub = Subscription::new(move || {
      counter.fetch_add(1, Ordering::SeqCst);
    });
    sub.unsubscribe();
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_drop_cancels() {
    let cancelled = Arc::new(AtomicUsize::new(0));
    let counter = cancelled.clone();
    {
      let _sub = Subscription::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
      });
    }
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
  }
}
