//! Tiering stage: places every dossier-scored initiative in a tier and
//! records how it moved since the last pass.

use std::collections::BTreeMap;

use scout_core::{
  store::ScoutStore,
  tier::{Tier, TierChange, TierInput, build_tiers},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSummary {
  pub initiatives_tiered: usize,
  pub distribution:       BTreeMap<Tier, usize>,
  pub changes:            BTreeMap<TierChange, usize>,
}

/// Recompute every tier from the stored dossier scores.
///
/// Previous tiers are read before the replacement so movement is measured
/// against the last pass. Scores whose initiative no longer exists are left
/// out of the pool.
pub async fn tier_initiatives<S>(store: &S) -> Result<TierSummary>
where
  S: ScoutStore,
{
  let scores = store.list_dossier_scores().await.map_err(Error::store)?;
  if scores.is_empty() {
    info!("no dossier scores; nothing to tier");
    return Ok(TierSummary::default());
  }

  let universities: BTreeMap<i64, String> = store
    .list_initiatives()
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|i| (i.id, i.university))
    .collect();
  let previous: BTreeMap<i64, Tier> = store
    .list_tiers()
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|t| (t.row.initiative_id, t.row.tier))
    .collect();

  let inputs: Vec<TierInput<'_>> = scores
    .iter()
    .filter_map(|score| {
      let university = universities.get(&score.initiative_id)?;
      Some(TierInput { score, university })
    })
    .collect();
  let rows = build_tiers(&inputs, &previous);

  let mut summary = TierSummary::default();
  for row in &rows {
    debug!(
      initiative = row.initiative_id,
      tier = %row.tier,
      change = %row.change,
      percentile = row.composite_percentile,
      "initiative tiered"
    );
    *summary.distribution.entry(row.tier).or_default() += 1;
    *summary.changes.entry(row.change).or_default() += 1;
  }
  summary.initiatives_tiered = store.replace_tiers(rows).await.map_err(Error::store)?;

  info!(
    tiered = summary.initiatives_tiered,
    distribution = ?summary.distribution,
    "tiering finished"
  );
  Ok(summary)
}
