//! Ranking stage: a full replacement of every ranking partition.

use std::collections::BTreeMap;

use scout_core::{
  ranking::{ScoredInitiative, domain_rankings, initiative_rankings, talent_rankings},
  store::ScoutStore,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankSummary {
  pub rankings_written: usize,
  /// Rows written per `ranking_type`.
  pub partitions:       BTreeMap<String, usize>,
}

/// Rebuild all rankings from the current scores and talent scores.
///
/// Initiatives that have never been scored are left out. `top_n` truncates
/// every partition.
pub async fn rank_initiatives<S>(store: &S, top_n: Option<usize>) -> Result<RankSummary>
where
  S: ScoutStore,
{
  let initiatives = store.list_initiatives().await.map_err(Error::store)?;
  let scores: BTreeMap<i64, _> = store
    .list_scores()
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|s| (s.initiative_id, s))
    .collect();

  let mut evidence = BTreeMap::new();
  for initiative in &initiatives {
    if scores.contains_key(&initiative.id) {
      let count = store.list_signals(initiative.id).await.map_err(Error::store)?.len();
      evidence.insert(initiative.id, count);
    }
  }

  let scored: Vec<ScoredInitiative<'_>> = initiatives
    .iter()
    .filter_map(|initiative| {
      Some(ScoredInitiative {
        initiative,
        score: scores.get(&initiative.id)?,
        evidence_count: evidence.get(&initiative.id).copied().unwrap_or_default(),
      })
    })
    .collect();

  let people = store.list_people().await.map_err(Error::store)?;
  let talent = store.list_talent_scores().await.map_err(Error::store)?;

  let mut rows = initiative_rankings(&scored, top_n);
  rows.extend(talent_rankings(&people, &talent, top_n));
  rows.extend(domain_rankings(&scored, top_n));

  let mut partitions: BTreeMap<String, usize> = BTreeMap::new();
  for row in &rows {
    *partitions.entry(row.ranking_type.clone()).or_default() += 1;
  }

  let rankings_written = store.replace_rankings(rows).await.map_err(Error::store)?;
  info!(rows = rankings_written, partitions = partitions.len(), "rankings rebuilt");
  Ok(RankSummary { rankings_written, partitions })
}
