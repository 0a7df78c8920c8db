//! Due-diligence report: investment memos plus a markdown brief.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
};

use scout_core::{
  gate::DdGate,
  memo::{InvestmentMemo, MemoPolicy, decide, render_brief},
  store::ScoutStore,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

pub const MEMOS_FILE: &str = "investment_memos.json";
pub const BRIEF_FILE: &str = "due_diligence_brief.md";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
  pub memos_generated: usize,
  pub memos_path:      PathBuf,
  pub brief_path:      PathBuf,
}

/// Decide on every initiative that has a score and at least one DD gate.
///
/// Candidates are ordered by conviction, highest first, ties by id, and
/// truncated to `top_n`. The output depends only on stored state.
pub async fn build_memos<S>(store: &S, policy: &MemoPolicy, top_n: usize) -> Result<Vec<InvestmentMemo>>
where
  S: ScoutStore,
{
  let mut gates: BTreeMap<i64, Vec<DdGate>> = BTreeMap::new();
  for gate in store.list_dd_gates().await.map_err(Error::store)? {
    gates.entry(gate.initiative_id).or_default().push(gate);
  }
  let scores: BTreeMap<i64, _> = store
    .list_scores()
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|s| (s.initiative_id, s))
    .collect();

  let mut memos: Vec<InvestmentMemo> = store
    .list_initiatives()
    .await
    .map_err(Error::store)?
    .iter()
    .filter_map(|initiative| {
      let score = scores.get(&initiative.id)?;
      let gates = gates.get(&initiative.id)?;
      Some(decide(initiative, score, gates, policy))
    })
    .collect();

  memos.sort_by(|a, b| {
    b.conviction
      .total_cmp(&a.conviction)
      .then_with(|| a.initiative_id.cmp(&b.initiative_id))
  });
  memos.truncate(top_n);
  Ok(memos)
}

/// Write `investment_memos.json` under `exports_dir` and
/// `due_diligence_brief.md` under `reports_dir`, replacing earlier files.
pub async fn generate_dd_report<S>(
  store: &S,
  policy: &MemoPolicy,
  top_n: usize,
  exports_dir: &Path,
  reports_dir: &Path,
) -> Result<ReportSummary>
where
  S: ScoutStore,
{
  let memos = build_memos(store, policy, top_n).await?;

  tokio::fs::create_dir_all(exports_dir).await?;
  tokio::fs::create_dir_all(reports_dir).await?;

  let memos_path = exports_dir.join(MEMOS_FILE);
  let brief_path = reports_dir.join(BRIEF_FILE);
  tokio::fs::write(&memos_path, serde_json::to_string_pretty(&memos)?).await?;
  tokio::fs::write(&brief_path, render_brief(&memos)).await?;

  info!(memos = memos.len(), path = %memos_path.display(), "dd report written");
  Ok(ReportSummary { memos_generated: memos.len(), memos_path, brief_path })
}
