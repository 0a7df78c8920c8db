//! Talent scoring stage.

use std::collections::BTreeMap;

use scout_core::{person::InitiativePerson, store::ScoutStore, talent::assess_person};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalentSummary {
  pub talent_scores_written: usize,
}

/// Assess every person from their channels, roles and initiative links.
pub async fn score_talent<S>(store: &S) -> Result<TalentSummary>
where
  S: ScoutStore,
{
  let mut links: BTreeMap<i64, Vec<InitiativePerson>> = BTreeMap::new();
  for link in store.list_links().await.map_err(Error::store)? {
    links.entry(link.person_id).or_default().push(link);
  }

  let mut summary = TalentSummary::default();
  for person in store.list_people().await.map_err(Error::store)? {
    let person_links = links.get(&person.id).map(Vec::as_slice).unwrap_or_default();
    let assessment = assess_person(&person, person_links);
    let stored = store.add_talent_score(assessment).await.map_err(Error::store)?;
    debug!(
      person = person.id,
      talent_type = %stored.talent_type,
      composite = stored.composite_score,
      "talent scored"
    );
    summary.talent_scores_written += 1;
  }

  info!(written = summary.talent_scores_written, "talent scoring finished");
  Ok(summary)
}
