//! Access to the remote record store.

pub mod client;

use async_trait::async_trait;
use color_eyre::Result;

use crate::query::{QueryKey, View};
use crate::record::{Analytics, Page};

pub use client::RecordClient;

/// Operations the sync layer needs from the record store.
///
/// Every method treats transport errors, timeouts, non-2xx statuses and
/// `success: false` bodies alike as failures.
#[async_trait]
pub trait RecordApi: Send + Sync + 'static {
  /// Fetch one page of the list for `key`.
  async fn fetch_page(&self, key: &QueryKey) -> Result<Page>;

  /// Set the starred flag of one record.
  async fn set_starred(&self, id: &str, value: bool) -> Result<()>;

  /// Delete one record.
  async fn delete(&self, id: &str) -> Result<()>;

  /// Delete several records in one call.
  async fn bulk_delete(&self, ids: &[String]) -> Result<()>;

  /// Delete every record in `view`. Returns how many were removed.
  async fn delete_all(&self, view: View) -> Result<u64>;

  /// Submission counters for `view`.
  async fn analytics(&self, view: View) -> Result<Analytics>;
}
