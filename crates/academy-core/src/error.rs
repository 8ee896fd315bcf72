//! Error types for `academy-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The key-value backend rejected a write or delete.
  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("student not found: {0:?}")]
  StudentNotFound(String),

  #[error("invalid registration: {0}")]
  InvalidRegistration(&'static str),

  /// A fee or attendance rate outside the record's limits.
  #[error("invalid student: {0}")]
  InvalidStudent(&'static str),
}

impl Error {
  pub(crate) fn storage<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
