//! Signals: immutable, append-only evidence about an initiative.
//!
//! Signals are never merged or de-duplicated: two identical observations
//! from two passes are two rows, aggregated only at scoring time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::ensure_finite, normalize::canonicalize_url, Result};

/// Well-known `signal_type` values. The set is open; unknown types are stored
/// and simply ignored by scoring unless configured.
pub mod kinds {
  pub const TECHNOLOGY_DOMAIN: &str = "technology_domain";
  pub const TECH_METRIC: &str = "tech_metric";
  pub const MARKET_DOMAIN: &str = "market_domain";
  pub const MARKET_METRIC: &str = "market_metric";
  pub const TEAM_METRIC: &str = "team_metric";
  pub const MATURITY_METRIC: &str = "maturity_metric";
  pub const CATEGORY: &str = "category";
}

/// A persisted signal row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
  pub id:            i64,
  pub initiative_id: i64,
  pub signal_type:   String,
  pub signal_key:    String,
  pub value:         f64,
  pub evidence_text: String,
  pub source_type:   String,
  pub source_url:    String,
  /// Server-assigned; never changes after creation.
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::ScoutStore::add_signal`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSignal {
  pub initiative_id: i64,
  pub signal_type:   String,
  pub signal_key:    String,
  pub value:         f64,
  #[serde(default)]
  pub evidence_text: String,
  #[serde(default)]
  pub source_type:   String,
  #[serde(default)]
  pub source_url:    String,
}

impl NewSignal {
  pub fn new(
    initiative_id: i64,
    signal_type: impl Into<String>,
    signal_key: impl Into<String>,
    value: f64,
  ) -> Self {
    Self {
      initiative_id,
      signal_type: signal_type.into(),
      signal_key: signal_key.into(),
      value,
      ..Self::default()
    }
  }

  pub fn with_source(
    mut self,
    source_type: impl Into<String>,
    source_url: impl Into<String>,
  ) -> Self {
    self.source_type = source_type.into();
    self.source_url = source_url.into();
    self
  }

  pub fn with_evidence(mut self, text: impl Into<String>) -> Self {
    self.evidence_text = text.into();
    self
  }

  /// Check the value and build the row the store will insert.
  pub fn into_signal(self, id: i64, now: DateTime<Utc>) -> Result<Signal> {
    let value = ensure_finite("signal value", self.value)?;
    Ok(Signal {
      id,
      initiative_id: self.initiative_id,
      signal_type: self.signal_type.trim().to_owned(),
      signal_key: self.signal_key.trim().to_owned(),
      value,
      evidence_text: self.evidence_text.trim().to_owned(),
      source_type: self.source_type.trim().to_owned(),
      source_url: canonicalize_url(&self.source_url),
      created_at: now,
    })
  }
}
