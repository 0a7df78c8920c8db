//! Error type for `scout-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] scout_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// Raised inside a transaction on the connection thread.
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("initiative not found: {0}")]
  InitiativeNotFound(i64),

  #[error("person not found: {0}")]
  PersonNotFound(i64),

  #[error("pipeline run not found: {0}")]
  RunNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
