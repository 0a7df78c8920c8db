//! Dossier scoring stage: evidence dossiers sent to an external scorer,
//! sanitized, and stored per initiative.

use std::{collections::BTreeMap, future::Future};

use scout_core::{
  dossier::{SCORING_SYSTEM_PROMPT, validate_response},
  store::ScoutStore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
  Error, Result,
  retry::{RetryPolicy, with_retry},
  text_hash,
};

/// The external text-generation service that scores a dossier.
///
/// Implementations return whatever the service produced; the response is
/// untrusted and is always passed through [`validate_response`].
pub trait DossierScorer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn score(
    &self,
    system_prompt: &str,
    dossier: &str,
  ) -> impl Future<Output = Result<Value, Self::Error>> + Send;
}

/// The evidence text assembled for one initiative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dossier {
  pub initiative_id: i64,
  pub text:          String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DossierSummary {
  pub dossiers_scored:  usize,
  /// Dossiers whose text was already scored unchanged.
  pub dossiers_skipped: usize,
}

/// Score every dossier whose text changed since it was last scored.
///
/// Each scorer call is retried per `policy`; a dossier that still fails
/// aborts the stage. Dossiers scored before the failure stay stored.
pub async fn score_dossiers<S, C>(
  store: &S,
  scorer: &C,
  dossiers: Vec<Dossier>,
  policy: &RetryPolicy,
) -> Result<DossierSummary>
where
  S: ScoutStore,
  C: DossierScorer,
{
  let scored: BTreeMap<i64, String> = store
    .list_dossier_scores()
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|d| (d.initiative_id, d.dossier_hash))
    .collect();

  let mut summary = DossierSummary::default();
  for dossier in dossiers {
    let hash = text_hash(dossier.text.as_bytes());
    if scored.get(&dossier.initiative_id) == Some(&hash) {
      debug!(initiative = dossier.initiative_id, "dossier unchanged; skipped");
      summary.dossiers_skipped += 1;
      continue;
    }

    let label = format!("dossier scoring for initiative {}", dossier.initiative_id);
    let text = dossier.text.as_str();
    let raw = with_retry(&label, policy, || scorer.score(SCORING_SYSTEM_PROMPT, text)).await?;
    let validated = validate_response(&raw);

    let stored = store
      .upsert_dossier_score(dossier.initiative_id, hash, validated)
      .await
      .map_err(Error::store)?;
    debug!(
      initiative = stored.initiative_id,
      classification = %stored.dossier.classification,
      composite = stored.dossier.composite_score,
      "dossier scored"
    );
    summary.dossiers_scored += 1;
  }

  info!(
    scored = summary.dossiers_scored,
    skipped = summary.dossiers_skipped,
    "dossier scoring finished"
  );
  Ok(summary)
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use scout_core::{
    dossier::{Classification, RecommendedAction},
    initiative::NewInitiative,
  };
  use scout_store_sqlite::SqliteStore;
  use serde_json::json;

  use super::*;

  #[derive(Debug, thiserror::Error)]
  #[error("service unavailable")]
  struct Unavailable;

  /// Returns `response` after failing `failures` times.
  struct FakeScorer {
    response: Value,
    failures: usize,
    calls:    AtomicUsize,
  }

  impl FakeScorer {
    fn new(response: Value, failures: usize) -> Self {
      Self { response, failures, calls: AtomicUsize::new(0) }
    }
  }

  impl DossierScorer for FakeScorer {
    type Error = Unavailable;

    async fn score(&self, _system_prompt: &str, _dossier: &str) -> Result<Value, Unavailable> {
      if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
        Err(Unavailable)
      } else {
        Ok(self.response.clone())
      }
    }
  }

  fn quick() -> RetryPolicy { RetryPolicy { max_attempts: 3, backoff_ms: 1 } }

  #[tokio::test]
  async fn unchanged_dossiers_are_skipped() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let id = store.upsert_initiative(NewInitiative::new("Solar Car")).await.unwrap().entity.id;
    let scorer = FakeScorer::new(
      json!({ "classification": "deep_tech_team", "recommended_action": "engage_now" }),
      1,
    );
    let dossier = Dossier { initiative_id: id, text: "evidence".into() };

    let first = score_dossiers(&store, &scorer, vec![dossier.clone()], &quick()).await.unwrap();
    assert_eq!(first.dossiers_scored, 1);
    let second = score_dossiers(&store, &scorer, vec![dossier], &quick()).await.unwrap();
    assert_eq!(second.dossiers_skipped, 1);
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 2);

    let stored = store.list_dossier_scores().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].dossier.classification, Classification::DeepTechTeam);
    assert_eq!(stored[0].dossier.recommended_action, RecommendedAction::EngageNow);
  }

  #[tokio::test]
  async fn garbage_responses_are_sanitized() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let id = store.upsert_initiative(NewInitiative::new("Solar Car")).await.unwrap().entity.id;
    let scorer = FakeScorer::new(json!("not even an object"), 0);

    score_dossiers(&store, &scorer, vec![Dossier { initiative_id: id, text: "x".into() }], &quick())
      .await
      .unwrap();
    let stored = store.list_dossier_scores().await.unwrap();
    assert_eq!(stored[0].dossier.classification, Classification::Unclear);
    assert_eq!(stored[0].dossier.composite_confidence, 0.0);
  }

  #[tokio::test]
  async fn exhausted_retries_fail_the_stage() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let id = store.upsert_initiative(NewInitiative::new("Solar Car")).await.unwrap().entity.id;
    let scorer = FakeScorer::new(json!({}), 10);

    let err = score_dossiers(
      &store,
      &scorer,
      vec![Dossier { initiative_id: id, text: "x".into() }],
      &quick(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
    assert!(store.list_dossier_scores().await.unwrap().is_empty());
  }
}
