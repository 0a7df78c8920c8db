//! Due-diligence gates: named checkpoints asserted per initiative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::normalize::unique_list;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
  EnumIter,
)]
pub enum Gate {
  A,
  B,
  C,
  D,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GateStatus {
  Pass,
  Fail,
  #[default]
  Pending,
}

/// A gate result. Unique per `(initiative_id, gate)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdGate {
  pub id:            i64,
  pub initiative_id: i64,
  pub gate:          Gate,
  pub status:        GateStatus,
  pub reason:        String,
  pub evidence:      Vec<String>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::store::ScoutStore::upsert_dd_gate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGate {
  pub initiative_id: i64,
  pub gate:          Gate,
  pub status:        GateStatus,
  #[serde(default)]
  pub reason:        String,
  #[serde(default)]
  pub evidence:      Vec<String>,
}

impl NewGate {
  pub fn into_gate(self, id: i64, now: DateTime<Utc>) -> DdGate {
    DdGate {
      id,
      initiative_id: self.initiative_id,
      gate: self.gate,
      status: self.status,
      reason: self.reason.trim().to_owned(),
      evidence: unique_list(&self.evidence),
      updated_at: now,
    }
  }
}
