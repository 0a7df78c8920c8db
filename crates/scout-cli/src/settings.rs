//! Layered configuration: an optional `scout.toml` under `SCOUT_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use scout_core::{config::ScoringWeights, memo::MemoPolicy};
use scout_pipeline::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Default number of memos in a DD report.
const DEFAULT_REPORT_TOP_N: usize = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
  pub database_path: PathBuf,
  pub exports_dir:   PathBuf,
  pub reports_dir:   PathBuf,
  pub scoring:       ScoringWeights,
  pub report:        ReportConfig,
  pub ranking:       RankingConfig,
  pub retry:         RetryPolicy,
}

impl Default for ScoutConfig {
  fn default() -> Self {
    Self {
      database_path: PathBuf::from("scout.db"),
      exports_dir:   PathBuf::from("exports"),
      reports_dir:   PathBuf::from("reports"),
      scoring:       ScoringWeights::default(),
      report:        ReportConfig::default(),
      ranking:       RankingConfig::default(),
      retry:         RetryPolicy::default(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
  pub top_n:  usize,
  pub policy: MemoPolicy,
}

impl Default for ReportConfig {
  fn default() -> Self { Self { top_n: DEFAULT_REPORT_TOP_N, policy: MemoPolicy::default() } }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
  /// Truncate every ranking partition; `None` keeps all rows.
  pub top_n: Option<usize>,
}

impl ScoutConfig {
  /// Load `path` (required when given) or `./scout.toml` (optional), then
  /// apply `SCOUT_*` overrides. Nested keys use `__`, as in
  /// `SCOUT_RETRY__MAX_ATTEMPTS=5`.
  pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
    let file = match path {
      Some(path) => config::File::from(path).required(true),
      None => config::File::with_name("scout").required(false),
    };

    config::Config::builder()
      .add_source(file)
      .add_source(
        config::Environment::with_prefix("SCOUT")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read configuration")?
      .try_deserialize()
      .context("failed to deserialise ScoutConfig")
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_sections_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scout.toml");
    std::fs::write(
      &path,
      "database_path = \"data/scout.db\"\n\n[report]\ntop_n = 5\n\n[retry]\nmax_attempts = 4\n",
    )
    .unwrap();

    let cfg = ScoutConfig::load(Some(&path)).unwrap();
    assert_eq!(cfg.database_path, PathBuf::from("data/scout.db"));
    assert_eq!(cfg.report.top_n, 5);
    assert_eq!(cfg.report.policy, MemoPolicy::default());
    assert_eq!(cfg.retry.max_attempts, 4);
    assert_eq!(cfg.retry.backoff_ms, RetryPolicy::default().backoff_ms);
    assert_eq!(cfg.scoring, ScoringWeights::default());
    assert_eq!(cfg.ranking.top_n, None);
  }

  #[test]
  fn required_file_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ScoutConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
  }
}
