//! Manual due-diligence import from CSV or JSON.
//!
//! Every row is parsed and resolved before anything is written, and all
//! signals go to the store in one batch: a single bad row imports nothing.

use std::{collections::HashMap, path::Path};

use scout_core::{
  signal::{NewSignal, kinds},
  store::ScoutStore,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::{Error, Result};

/// Signal key written for each imported row.
pub const COMMITMENT_KEY: &str = "commitment_level";

/// Source type used when a row does not name one.
pub const MANUAL_SOURCE_TYPE: &str = "manual_dd";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
  pub file:          String,
  pub rows_total:    usize,
  pub rows_imported: usize,
}

/// One input row with every cell as text.
#[derive(Debug, Default, Clone)]
struct ManualRow {
  cells: HashMap<String, String>,
}

impl ManualRow {
  fn get(&self, column: &str) -> &str {
    self.cells.get(column).map(|v| v.trim()).unwrap_or_default()
  }
}

fn cell_text(value: Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s,
    other => other.to_string(),
  }
}

async fn load_rows(path: &Path) -> Result<Vec<ManualRow>> {
  let extension = path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_lowercase)
    .unwrap_or_default();

  match extension.as_str() {
    "csv" => {
      let bytes = tokio::fs::read(path).await?;
      let mut reader = csv::Reader::from_reader(bytes.as_slice());
      reader
        .deserialize::<HashMap<String, String>>()
        .map(|row| Ok(ManualRow { cells: row? }))
        .collect()
    }
    "json" => {
      let text = tokio::fs::read_to_string(path).await?;
      let rows: Vec<Map<String, Value>> = serde_json::from_str(&text)?;
      Ok(
        rows
          .into_iter()
          .map(|row| ManualRow {
            cells: row.into_iter().map(|(k, v)| (k, cell_text(v))).collect(),
          })
          .collect(),
      )
    }
    _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
  }
}

/// Parse a numeric cell. Non-numeric and non-finite text is rejected with a
/// message naming the value.
pub fn parse_float(value: &str) -> std::result::Result<f64, String> {
  match value.trim().parse::<f64>() {
    Ok(v) if v.is_finite() => Ok(v),
    _ => Err(format!("Invalid float value '{value}'")),
  }
}

async fn resolve<S>(store: &S, row_no: usize, row: &ManualRow) -> Result<i64>
where
  S: ScoutStore,
{
  let invalid = |message: String| Error::InvalidRecord { row: row_no, message };

  let raw_id = row.get("initiative_id");
  if !raw_id.is_empty() {
    let id: i64 = raw_id
      .parse()
      .map_err(|_| invalid(format!("Invalid integer value '{raw_id}'")))?;
    return match store.get_initiative(id).await.map_err(Error::store)? {
      Some(initiative) => Ok(initiative.id),
      None => Err(invalid(format!("initiative_id '{id}' not found"))),
    };
  }

  let name = row.get("initiative_name");
  if name.is_empty() {
    return Err(invalid("initiative_name or initiative_id is required".into()));
  }
  match store.find_initiative(name.to_owned()).await.map_err(Error::store)? {
    Some(initiative) => Ok(initiative.id),
    None => Err(invalid(format!("initiative '{name}' not found"))),
  }
}

/// Import a manual DD file, appending one `team_metric/commitment_level`
/// signal per row.
pub async fn import_manual<S>(store: &S, path: &Path) -> Result<ImportSummary>
where
  S: ScoutStore,
{
  let rows = load_rows(path).await?;
  let mut signals = Vec::with_capacity(rows.len());

  for (index, row) in rows.iter().enumerate() {
    let row_no = index + 1;
    let raw_level = row.get(COMMITMENT_KEY);
    if raw_level.is_empty() {
      return Err(Error::InvalidRecord {
        row:     row_no,
        message: format!("{COMMITMENT_KEY} is required"),
      });
    }
    let level = parse_float(raw_level)
      .map_err(|message| Error::InvalidRecord { row: row_no, message })?;
    let initiative_id = resolve(store, row_no, row).await?;

    let source_type = match row.get("source_type") {
      "" => MANUAL_SOURCE_TYPE,
      other => other,
    };
    let evidence = match row.get("evidence") {
      "" => format!("manual commitment level {level}"),
      other => other.to_owned(),
    };

    signals.push(
      NewSignal::new(initiative_id, kinds::TEAM_METRIC, COMMITMENT_KEY, level)
        .with_source(source_type, row.get("source_url"))
        .with_evidence(evidence),
    );
  }

  let written = if signals.is_empty() {
    0
  } else {
    store.add_signals(signals).await.map_err(Error::store)?.len()
  };

  let summary = ImportSummary {
    file:          path.display().to_string(),
    rows_total:    rows.len(),
    rows_imported: written,
  };
  info!(file = %summary.file, rows = summary.rows_imported, "manual import finished");
  Ok(summary)
}

#[cfg(test)]
mod tests {
  use scout_core::initiative::NewInitiative;
  use scout_store_sqlite::SqliteStore;

  use super::*;

  async fn store_with_team() -> (SqliteStore, i64) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let id = store
      .upsert_initiative(NewInitiative {
        university: Some("TUM".into()),
        primary_url: Some("https://manual.example".into()),
        ..NewInitiative::new("Manual Team")
      })
      .await
      .unwrap()
      .entity
      .id;
    (store, id)
  }

  #[test]
  fn parse_float_names_bad_value() {
    assert_eq!(parse_float(" 4.5 "), Ok(4.5));
    assert_eq!(parse_float("not_a_number").unwrap_err(), "Invalid float value 'not_a_number'");
    assert!(parse_float("NaN").is_err());
  }

  #[tokio::test]
  async fn malformed_row_imports_nothing() {
    let (store, id) = store_with_team().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad_manual.csv");
    std::fs::write(
      &path,
      "initiative_name,commitment_level,source_url\n\
       Manual Team,4,https://manual.example/dd\n\
       Manual Team,not_a_number,https://manual.example/dd\n",
    )
    .unwrap();

    let err = import_manual(&store, &path).await.unwrap_err();
    assert!(err.to_string().contains("Invalid float value"));
    assert!(matches!(err, Error::InvalidRecord { row: 2, .. }));
    assert!(store.list_signals(id).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn csv_rows_become_commitment_signals() {
    let (store, id) = store_with_team().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manual.csv");
    std::fs::write(
      &path,
      "initiative_name,commitment_level,source_url\n\
       manual team,4.5,https://manual.example/dd\n",
    )
    .unwrap();

    let summary = import_manual(&store, &path).await.unwrap();
    assert_eq!(summary.rows_total, 1);
    assert_eq!(summary.rows_imported, 1);

    let signals = store.list_signals(id).await.unwrap();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].signal_type, kinds::TEAM_METRIC);
    assert_eq!(signals[0].signal_key, COMMITMENT_KEY);
    assert_eq!(signals[0].value, 4.5);
    assert_eq!(signals[0].source_type, MANUAL_SOURCE_TYPE);
  }

  #[tokio::test]
  async fn json_rows_resolve_by_id() {
    let (store, id) = store_with_team().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manual.json");
    std::fs::write(
      &path,
      format!(r#"[{{"initiative_id": {id}, "commitment_level": 3, "source_type": "interview"}}]"#),
    )
    .unwrap();

    import_manual(&store, &path).await.unwrap();
    let signals = store.list_signals(id).await.unwrap();
    assert_eq!(signals[0].value, 3.0);
    assert_eq!(signals[0].source_type, "interview");
  }

  #[tokio::test]
  async fn unknown_initiative_fails_the_batch() {
    let (store, _) = store_with_team().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manual.csv");
    std::fs::write(&path, "initiative_name,commitment_level\nGhost Club,2\n").unwrap();

    let err = import_manual(&store, &path).await.unwrap_err();
    assert!(err.to_string().contains("Ghost Club"));
  }

  #[tokio::test]
  async fn missing_file_is_an_io_error() {
    let (store, _) = store_with_team().await;
    let dir = tempfile::tempdir().unwrap();
    let err = import_manual(&store, &dir.path().join("absent.csv")).await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));
  }

  #[tokio::test]
  async fn other_extensions_are_rejected() {
    let (store, _) = store_with_team().await;
    let err = import_manual(&store, Path::new("rows.xlsx")).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
  }
}
