//! The `KeyValueStore` trait and the in-memory implementation.
//!
//! The academy persists each collection as one text record under a fixed key.
//! Durable backends (e.g. `academy-store-sqlite`) implement this trait; the
//! [`Academy`](crate::academy::Academy) depends only on the abstraction.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::{Arc, Mutex, PoisonError},
};

/// Storage key for the serialised roster.
pub const STUDENTS_KEY: &str = "academy_db_students";
/// Storage key for the serialised attendance log (newest first).
pub const LOGS_KEY: &str = "academy_db_logs";

/// A flat string-to-string record store.
///
/// All methods return `Send` futures so implementations can sit behind a
/// tokio mutex in a multi-threaded runtime.
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the value under `key`. Returns `None` if the key is absent.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Insert or overwrite the value under `key`.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete `key` entirely. Removing an absent key is not an error.
  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── MemoryKv ────────────────────────────────────────────────────────────────

/// Process-local store. Clones share the same map, so dropping one
/// [`Academy`](crate::academy::Academy) and initialising another from a clone
/// behaves like a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
  records: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKv {
  pub fn new() -> Self { Self::default() }

  /// Synchronous peek, handy for assertions.
  pub fn snapshot(&self, key: &str) -> Option<String> {
    self.lock().get(key).cloned()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
    self.records.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl KeyValueStore for MemoryKv {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    Ok(self.lock().get(key).cloned())
  }

  async fn set(&self, key: &str, value: String) -> Result<(), Infallible> {
    self.lock().insert(key.to_owned(), value);
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), Infallible> {
    self.lock().remove(key);
    Ok(())
  }
}
