//! Error type for the pipeline stages.

use std::path::PathBuf;

use thiserror::Error;

/// An error raised by a pipeline stage.
#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error(transparent)]
  Core(#[from] scout_core::Error),

  /// A record that cannot be coerced; aborts the whole batch.
  #[error("row {row}: {message}")]
  InvalidRecord { row: usize, message: String },

  #[error("unsupported input file {0:?}: expected .csv or .json")]
  UnsupportedFormat(PathBuf),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// The external call kept failing after every allowed attempt.
  #[error("{label} failed after {attempts} attempt(s): {source}")]
  RetriesExhausted {
    label:    String,
    attempts: u32,
    #[source]
    source:   Box<dyn std::error::Error + Send + Sync>,
  },
}

impl Error {
  /// Box any backend error into [`Error::Store`].
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
