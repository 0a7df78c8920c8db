//! Scoring stage: one score per initiative from its full signal set.

use scout_core::{config::ScoringWeights, scoring::score_signals, store::ScoutStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
  pub scores_written:     usize,
  pub components_written: usize,
}

/// Score every initiative, replacing its previous score and explanation.
///
/// Initiatives without signals still get a floor score so every initiative
/// can be ranked.
pub async fn score_initiatives<S>(store: &S, weights: &ScoringWeights) -> Result<ScoreSummary>
where
  S: ScoutStore,
{
  let mut summary = ScoreSummary::default();

  for initiative in store.list_initiatives().await.map_err(Error::store)? {
    let signals = store.list_signals(initiative.id).await.map_err(Error::store)?;
    let sheet = score_signals(initiative.id, &signals, weights);
    let components = sheet.components.len();

    let score = store.replace_score(sheet).await.map_err(Error::store)?;
    debug!(
      initiative = initiative.id,
      signals = signals.len(),
      composite = score.values.composite_score,
      "initiative scored"
    );

    summary.scores_written += 1;
    summary.components_written += components;
  }

  info!(scores = summary.scores_written, "scoring finished");
  Ok(summary)
}
