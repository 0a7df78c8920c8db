//! Initiative ingest: raw records through identity resolution.

use scout_core::{
  initiative::{NewSource, RawInitiative},
  normalize::unique_list,
  signal::{NewSignal, kinds},
  store::ScoutStore,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Error, Result, payload_hash};

/// Source type recorded for initiatives whose producer did not name one.
pub const DEFAULT_SOURCE_TYPE: &str = "directory";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
  pub records_seen:         usize,
  pub initiatives_upserted: usize,
  pub initiatives_created:  usize,
  pub sources_recorded:     usize,
  pub signals_written:      usize,
  /// Records whose name folds to nothing; they are not written.
  pub records_skipped:      usize,
}

/// Upsert every raw record, record where it was seen, and append one
/// `category` signal per listed category.
///
/// Each record is resolved on its own; a later record that spells the same
/// initiative differently merges into the row the earlier one created.
/// Records without a usable name are skipped with a warning.
pub async fn ingest_initiatives<S>(
  store: &S,
  source_type: &str,
  records: Vec<RawInitiative>,
) -> Result<IngestSummary>
where
  S: ScoutStore,
{
  let mut summary = IngestSummary { records_seen: records.len(), ..Default::default() };

  for record in records {
    let input = record.to_new_initiative();
    if input.identity_key().name.is_empty() {
      warn!(name = %record.name, source = %record.source_url, "record has no usable name; skipped");
      summary.records_skipped += 1;
      continue;
    }

    let hash = payload_hash(&record)?;
    let upserted = store
      .upsert_initiative(input)
      .await
      .map_err(Error::store)?;
    let initiative = upserted.entity;

    summary.initiatives_upserted += 1;
    if upserted.created {
      summary.initiatives_created += 1;
    }
    debug!(id = initiative.id, name = %initiative.name, created = upserted.created, "initiative upserted");

    store
      .record_source(NewSource {
        initiative_id: initiative.id,
        source_type:   source_type.to_owned(),
        source_name:   record.source_name.clone(),
        source_url:    record.source_url.clone(),
        external_url:  record.external_url.clone().unwrap_or_default(),
        payload_hash:  hash,
      })
      .await
      .map_err(Error::store)?;
    summary.sources_recorded += 1;

    let signals: Vec<NewSignal> = unique_list(&record.categories)
      .into_iter()
      .map(|category| {
        NewSignal::new(initiative.id, kinds::CATEGORY, category, 1.0)
          .with_source(source_type, record.source_url.as_str())
          .with_evidence(record.source_name.as_str())
      })
      .collect();
    if !signals.is_empty() {
      summary.signals_written += store.add_signals(signals).await.map_err(Error::store)?.len();
    }
  }

  info!(
    seen = summary.records_seen,
    upserted = summary.initiatives_upserted,
    created = summary.initiatives_created,
    skipped = summary.records_skipped,
    "initiatives ingested"
  );
  Ok(summary)
}

#[cfg(test)]
mod tests {
  use scout_store_sqlite::SqliteStore;

  use super::*;

  fn record(name: &str, url: &str, categories: &[&str]) -> RawInitiative {
    RawInitiative {
      name: name.into(),
      university: Some("TUM".into()),
      source_name: "tum directory".into(),
      source_url: "https://tum.example.org/clubs".into(),
      external_url: Some(url.into()),
      categories: categories.iter().map(|c| (*c).to_owned()).collect(),
      ..RawInitiative::default()
    }
  }

  #[tokio::test]
  async fn near_duplicates_collapse_into_one_initiative() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let summary = ingest_initiatives(&store, DEFAULT_SOURCE_TYPE, vec![
      record("Akaflieg München e.V.", "https://akaflieg.example.org/", &["Aerospace"]),
      record("Akaflieg  Munchen e.V", "https://akaflieg.example.org", &["aerospace", "Gliding"]),
    ])
    .await
    .unwrap();

    assert_eq!(summary.initiatives_upserted, 2);
    assert_eq!(summary.initiatives_created, 1);
    assert_eq!(summary.signals_written, 3);

    let all = store.list_initiatives().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].categories, vec!["Aerospace", "Gliding"]);
    assert_eq!(store.list_sources(all[0].id).await.unwrap().len(), 1);

    let signals = store.list_signals(all[0].id).await.unwrap();
    assert!(signals.iter().all(|s| s.signal_type == kinds::CATEGORY && s.value == 1.0));
  }

  #[tokio::test]
  async fn unnamed_records_are_skipped_without_aborting() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let summary = ingest_initiatives(&store, DEFAULT_SOURCE_TYPE, vec![
      record("Технопарк МГУ", "https://tech.example.org", &[]),
      record("!!!", "https://noise.example.org", &[]),
      record("Solar Car", "https://solar.example.org", &[]),
    ])
    .await
    .unwrap();

    assert_eq!(summary.records_seen, 3);
    assert_eq!(summary.records_skipped, 1);
    assert_eq!(summary.initiatives_created, 2);
    let names: Vec<_> =
      store.list_initiatives().await.unwrap().into_iter().map(|i| i.name).collect();
    assert_eq!(names, vec!["Технопарк МГУ", "Solar Car"]);
  }

  #[tokio::test]
  async fn rerun_creates_nothing_new() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let batch = vec![record("Solar Car", "https://solar.example.org", &[])];
    ingest_initiatives(&store, DEFAULT_SOURCE_TYPE, batch.clone()).await.unwrap();
    let again = ingest_initiatives(&store, DEFAULT_SOURCE_TYPE, batch).await.unwrap();

    assert_eq!(again.initiatives_created, 0);
    assert_eq!(store.list_initiatives().await.unwrap().len(), 1);
  }
}
