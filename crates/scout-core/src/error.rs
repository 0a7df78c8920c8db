//! Error types for `scout-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{field} must be a finite number, got {value}")]
  NonFinite { field: &'static str, value: f64 },

  #[error("{0} name is empty after normalization")]
  EmptyName(&'static str),

  #[error("talent score for person {0} deviates from neutral but has no reasons")]
  MissingReasons(i64),

  #[error("unknown {kind} discriminant: {value:?}")]
  UnknownVariant { kind: &'static str, value: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reject NaN and infinities for a named numeric field.
pub fn ensure_finite(field: &'static str, value: f64) -> Result<f64> {
  if value.is_finite() {
    Ok(value)
  } else {
    Err(Error::NonFinite { field, value })
  }
}
