use thiserror::Error;

/// Failures surfaced to the user. None of them stop the controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
  /// Loading the active query failed; the previous rows stay visible
  #[error("failed to load records: {0}")]
  Fetch(String),
  /// A write was rejected; the active query is reloaded to restore server state
  #[error("change was not saved: {0}")]
  Mutation(String),
}

#[cfg(test)]
impl SyncError {
  pub fn is_fetch(&self) -> bool {
    matches!(self, SyncError::Fetch(_))
  }

  pub fn is_mutation(&self) -> bool {
    matches!(self, SyncError::Mutation(_))
  }
}
