//! `scout`: batch pipeline for the university initiative tracker.
//!
//! # Usage
//!
//! ```
//! scout init
//! scout ingest initiatives.json --source-type tum_directory
//! scout ingest-people people.json
//! scout import-manual manual_dd.csv
//! scout run
//! scout rankings --type composite
//! scout tier
//! ```
//!
//! Every command prints its result as pretty JSON on stdout; logs go to
//! stderr and are filtered with `RUST_LOG`.

mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use scout_core::{
  gate::{Gate, GateStatus, NewGate},
  initiative::{Initiative, InitiativeStatus, RawInitiative, StatusUpdate},
  person::RawPerson,
  store::ScoutStore,
};
use scout_pipeline::{
  import::import_manual,
  ingest::{DEFAULT_SOURCE_TYPE, ingest_initiatives},
  people::ingest_people,
  rank::rank_initiatives,
  report::generate_dd_report,
  run::tracked,
  score::score_initiatives,
  talent::score_talent,
  tier::tier_initiatives,
};
use scout_store_sqlite::SqliteStore;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use settings::{ScoutConfig, expand_tilde};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "scout", version, about = "Track, score and rank university initiatives")]
struct Args {
  /// Path to a TOML config file. Defaults to ./scout.toml when present.
  #[arg(short, long, value_name = "FILE", env = "SCOUT_CONFIG")]
  config: Option<PathBuf>,

  /// Override the database path from the configuration.
  #[arg(long, value_name = "FILE")]
  db: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create the database and schema, then print the effective config.
  Init,

  /// Ingest a JSON array of raw initiative records.
  Ingest {
    file:        PathBuf,
    /// Source type recorded for every record in the file.
    #[arg(long, default_value = DEFAULT_SOURCE_TYPE)]
    source_type: String,
  },

  /// Ingest a JSON array of people and link them to initiatives.
  IngestPeople { file: PathBuf },

  /// Import manual DD rows from a .csv or .json file.
  ImportManual { file: PathBuf },

  /// Score every initiative from its signals.
  Score,

  /// Score every person as operator or alumni angel.
  ScoreTalent,

  /// Rebuild all rankings.
  Rank {
    #[arg(long)]
    top_n: Option<usize>,
  },

  /// Tier every dossier-scored initiative and record movement.
  Tier,

  /// Write investment memos and the DD brief.
  Report {
    #[arg(long)]
    top_n: Option<usize>,
  },

  /// Set the tracking status of an initiative (by id or name).
  SetStatus {
    initiative:     String,
    #[arg(long)]
    status:         InitiativeStatus,
    #[arg(long)]
    owner:          Option<String>,
    /// YYYY-MM-DD.
    #[arg(long)]
    next_step_date: Option<NaiveDate>,
    #[arg(long)]
    note:           Option<String>,
  },

  /// Record the outcome of a DD gate (A–D) for an initiative.
  SetGate {
    initiative: String,
    #[arg(long)]
    gate:       Gate,
    #[arg(long)]
    status:     GateStatus,
    #[arg(long, default_value = "")]
    reason:     String,
    /// Repeat for several pieces of evidence.
    #[arg(long)]
    evidence:   Vec<String>,
  },

  /// List initiatives.
  Initiatives,

  /// List rankings, optionally for one ranking type.
  Rankings {
    #[arg(long = "type")]
    ranking_type: Option<String>,
  },

  /// List initiative tiers, best first.
  Tiers,

  /// List pipeline runs, newest first.
  Runs,

  /// Run score → score-talent → rank → report.
  Run {
    #[arg(long)]
    top_n: Option<usize>,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let mut cfg = ScoutConfig::load(args.config.as_deref())?;
  if let Some(db) = args.db {
    cfg.database_path = db;
  }

  let db_path = expand_tilde(&cfg.database_path);
  if let Some(parent) = db_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let store = SqliteStore::open(&db_path)
    .await
    .with_context(|| format!("failed to open store at {db_path:?}"))?;

  dispatch(&store, &cfg, args.command).await
}

async fn dispatch(store: &SqliteStore, cfg: &ScoutConfig, command: Command) -> anyhow::Result<()> {
  match command {
    Command::Init => print_json(cfg),

    Command::Ingest { file, source_type } => {
      let records: Vec<RawInitiative> = read_json(&file)?;
      let summary =
        tracked(store, "ingest", ingest_initiatives(store, &source_type, records)).await?;
      print_json(&summary)
    }

    Command::IngestPeople { file } => {
      let records: Vec<RawPerson> = read_json(&file)?;
      let summary = tracked(store, "ingest_people", ingest_people(store, records)).await?;
      print_json(&summary)
    }

    Command::ImportManual { file } => {
      let summary = tracked(store, "import_manual", import_manual(store, &file))
        .await
        .with_context(|| format!("manual import of {} failed", file.display()))?;
      print_json(&summary)
    }

    Command::Score => {
      let summary = tracked(store, "score", score_initiatives(store, &cfg.scoring)).await?;
      print_json(&summary)
    }

    Command::ScoreTalent => {
      let summary = tracked(store, "score_talent", score_talent(store)).await?;
      print_json(&summary)
    }

    Command::Rank { top_n } => {
      let top_n = top_n.or(cfg.ranking.top_n);
      let summary = tracked(store, "rank", rank_initiatives(store, top_n)).await?;
      print_json(&summary)
    }

    Command::Tier => {
      let summary = tracked(store, "comparative_rank", tier_initiatives(store)).await?;
      print_json(&summary)
    }

    Command::Report { top_n } => {
      let summary = report(store, cfg, top_n).await?;
      print_json(&summary)
    }

    Command::SetStatus { initiative, status, owner, next_step_date, note } => {
      let target = resolve_initiative(store, &initiative).await?;
      let updated = store
        .set_initiative_status(target.id, StatusUpdate { status, owner, next_step_date, note })
        .await?;
      print_json(&updated)
    }

    Command::SetGate { initiative, gate, status, reason, evidence } => {
      let target = resolve_initiative(store, &initiative).await?;
      let gate = store
        .upsert_dd_gate(NewGate { initiative_id: target.id, gate, status, reason, evidence })
        .await?;
      print_json(&gate)
    }

    Command::Initiatives => print_json(&store.list_initiatives().await?),

    Command::Rankings { ranking_type } => print_json(&store.list_rankings(ranking_type).await?),

    Command::Tiers => print_json(&store.list_tiers().await?),

    Command::Runs => print_json(&store.list_runs().await?),

    Command::Run { top_n } => {
      let scored = tracked(store, "score", score_initiatives(store, &cfg.scoring)).await?;
      let talent = tracked(store, "score_talent", score_talent(store)).await?;
      let ranked = tracked(store, "rank", rank_initiatives(store, cfg.ranking.top_n)).await?;
      let reported = report(store, cfg, top_n).await?;
      print_json(&json!({
        "score": scored,
        "score_talent": talent,
        "rank": ranked,
        "report": reported,
      }))
    }
  }
}

async fn report(
  store: &SqliteStore,
  cfg: &ScoutConfig,
  top_n: Option<usize>,
) -> anyhow::Result<scout_pipeline::report::ReportSummary> {
  let top_n = top_n.unwrap_or(cfg.report.top_n);
  let exports = expand_tilde(&cfg.exports_dir);
  let reports = expand_tilde(&cfg.reports_dir);
  let summary = tracked(
    store,
    "report",
    generate_dd_report(store, &cfg.report.policy, top_n, &exports, &reports),
  )
  .await?;
  Ok(summary)
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Find an initiative by numeric id, falling back to its name.
async fn resolve_initiative(store: &SqliteStore, reference: &str) -> anyhow::Result<Initiative> {
  if let Ok(id) = reference.trim().parse::<i64>()
    && let Some(initiative) = store.get_initiative(id).await?
  {
    return Ok(initiative);
  }
  match store.find_initiative(reference.to_owned()).await? {
    Some(initiative) => Ok(initiative),
    None => bail!("no initiative matches {reference:?}"),
  }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading {}", path.display()))?;
  serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
