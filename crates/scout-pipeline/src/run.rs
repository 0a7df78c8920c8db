//! Pipeline-run bookkeeping.

use std::future::Future;

use scout_core::{run::RunStatus, store::ScoutStore};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{Error, Result};

/// Run `work` as the stage `stage`, recording a `pipeline_runs` row that is
/// finished with the stage's summary on success or its error on failure.
///
/// The stage's own error is returned unchanged; a failure to record the
/// outcome is only logged.
pub async fn tracked<S, T, F>(store: &S, stage: &str, work: F) -> Result<T>
where
  S: ScoutStore,
  T: Serialize,
  F: Future<Output = Result<T>>,
{
  let run = store.start_run(stage.to_owned()).await.map_err(Error::store)?;
  info!(stage, run_id = %run.run_id, "stage started");

  let outcome = work.await;
  let (status, details, message) = match &outcome {
    Ok(summary) => (RunStatus::Success, serde_json::to_value(summary)?, None),
    Err(e) => (RunStatus::Failed, json!({}), Some(e.to_string())),
  };

  if let Err(e) = store.finish_run(run.run_id, status, details, message).await {
    warn!(stage, run_id = %run.run_id, error = %e, "could not record stage outcome");
  }

  match &outcome {
    Ok(_) => info!(stage, run_id = %run.run_id, "stage finished"),
    Err(e) => warn!(stage, run_id = %run.run_id, error = %e, "stage failed"),
  }
  outcome
}
