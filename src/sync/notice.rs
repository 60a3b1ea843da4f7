//! Transient notices ("New CV received") with a fire-once expiry timer.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::event::Event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub message: String,
  generation: u64,
}

/// Holds at most one notice. A newer notice replaces the current one and
/// aborts its timer.
#[derive(Debug)]
pub struct NoticeBoard {
  current: Option<Notice>,
  generation: u64,
  timer: Option<JoinHandle<()>>,
  duration: Duration,
}

impl NoticeBoard {
  pub fn new(duration: Duration) -> Self {
    Self {
      current: None,
      generation: 0,
      timer: None,
      duration,
    }
  }

  /// Show `message` and schedule its expiry on `tx`.
  pub fn show(&mut self, message: impl Into<String>, tx: &mpsc::UnboundedSender<Event>) {
    self.generation += 1;
    let generation = self.generation;
    self.current = Some(Notice {
      message: message.into(),
      generation,
    });

    if let Some(timer) = self.timer.take() {
      timer.abort();
    }
    let tx = tx.clone();
    let duration = self.duration;
    self.timer = Some(tokio::spawn(async move {
      tokio::time::sleep(duration).await;
      let _ = tx.send(Event::NoticeExpired { generation });
    }));
  }

  /// Clear the notice if `generation` is still the one shown.
  pub fn expire(&mut self, generation: u64) -> bool {
    match &self.current {
      Some(notice) if notice.generation == generation => {
        self.current = None;
        self.timer = None;
        true
      }
      _ => false,
    }
  }

  pub fn clear(&mut self) {
    self.current = None;
    if let Some(timer) = self.timer.take() {
      timer.abort();
    }
  }

  pub fn current(&self) -> Option<&str> {
    self.current.as_ref().map(|n| n.message.as_str())
  }
}

impl Drop for NoticeBoard {
  fn drop(&mut self) {
    if let Some(timer) = self.timer.take() {
      timer.abort();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn expiry(rx: &mut mpsc::UnboundedReceiver<Event>) -> u64 {
    match rx.recv().await {
      Some(Event::NoticeExpired { generation }) => generation,
      other => panic!("expected expiry, got {:?}", other),
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_notice_expires_after_duration() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut board = NoticeBoard::new(Duration::from_secs(3));
    board.show("New CV received", &tx);
    assert_eq!(board.current(), Some("New CV received"));

    tokio::time::advance(Duration::from_millis(2900)).await;
    assert!(rx.try_recv().is_err());

    let generation = expiry(&mut rx).await;
    assert!(board.expire(generation));
    assert_eq!(board.current(), None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_newer_notice_supersedes_timer() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut board = NoticeBoard::new(Duration::from_secs(3));
    board.show("first", &tx);
    tokio::time::advance(Duration::from_secs(2)).await;
    board.show("second", &tx);

    // Only the second timer fires, 3s after it was set
    let generation = expiry(&mut rx).await;
    assert!(board.expire(generation));
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_expiry_is_ignored() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut board = NoticeBoard::new(Duration::from_secs(3));
    board.show("first", &tx);
    board.show("second", &tx);
    assert!(!board.expire(1));
    assert_eq!(board.current(), Some("second"));
  }
}
