//! Pipeline run bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
  Running,
  Success,
  Failed,
}

/// One execution of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
  pub run_id:        Uuid,
  pub stage:         String,
  pub status:        RunStatus,
  /// The stage's summary counts, or whatever was gathered before a failure.
  pub details:       Value,
  pub error_message: Option<String>,
  pub started_at:    DateTime<Utc>,
  pub finished_at:   Option<DateTime<Utc>>,
}

impl PipelineRun {
  pub fn start(stage: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self {
      run_id:        Uuid::new_v4(),
      stage:         stage.into(),
      status:        RunStatus::Running,
      details:       Value::Object(Default::default()),
      error_message: None,
      started_at:    now,
      finished_at:   None,
    }
  }
}
