//! The `ScoutStore` trait.
//!
//! Storage backends (e.g. `scout-store-sqlite`) implement it. The pipeline
//! stages are generic over this abstraction, not over a concrete backend.

use std::future::Future;

use serde_json::Value;
use uuid::Uuid;

use crate::{
  dossier::{DossierScore, ValidatedDossier},
  gate::{DdGate, NewGate},
  initiative::{Initiative, InitiativeSource, NewInitiative, NewSource, StatusUpdate, Upserted},
  person::{InitiativePerson, NewLink, NewPerson, Person},
  ranking::{NewRanking, Ranking},
  run::{PipelineRun, RunStatus},
  score::{Score, ScoreComponent, ScoreEvidence, ScoreSheet},
  signal::{NewSignal, Signal},
  talent::{NewTalentScore, TalentScore},
  tier::{InitiativeTier, NewTier},
};

/// Abstraction over a Scout store backend.
///
/// Every merge or replacement is atomic per entity: an interrupted call never
/// leaves a half-merged initiative or a partially replaced score or ranking
/// set behind.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded tokio runtime.
pub trait ScoutStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identity resolution ───────────────────────────────────────────────

  /// Insert the initiative, or merge it into the row with the same identity
  /// key. Merging keeps the existing `id` and `created_at`.
  fn upsert_initiative(
    &self,
    input: NewInitiative,
  ) -> impl Future<Output = Result<Upserted<Initiative>, Self::Error>> + Send + '_;

  fn get_initiative(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Initiative>, Self::Error>> + Send + '_;

  /// Look up an initiative by name, compared after normalization.
  fn find_initiative(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Initiative>, Self::Error>> + Send + '_;

  /// All initiatives ordered by `id`.
  fn list_initiatives(
    &self,
  ) -> impl Future<Output = Result<Vec<Initiative>, Self::Error>> + Send + '_;

  /// Apply a manual status update. Errors if the initiative does not exist.
  fn set_initiative_status(
    &self,
    id: i64,
    update: StatusUpdate,
  ) -> impl Future<Output = Result<Initiative, Self::Error>> + Send + '_;

  /// Upsert a source row per `(initiative, source_type, source_url,
  /// external_url)`, bumping `last_seen_at` on repeat sightings.
  fn record_source(
    &self,
    input: NewSource,
  ) -> impl Future<Output = Result<InitiativeSource, Self::Error>> + Send + '_;

  fn list_sources(
    &self,
    initiative_id: i64,
  ) -> impl Future<Output = Result<Vec<InitiativeSource>, Self::Error>> + Send + '_;

  /// Insert the person, or merge into the row with the same normalized name.
  fn upsert_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<Upserted<Person>, Self::Error>> + Send + '_;

  fn list_people(&self) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// Link a person to an initiative. Idempotent per `(initiative, person,
  /// role)`; the flag is `true` only when a new link was created.
  fn link_person(
    &self,
    input: NewLink,
  ) -> impl Future<Output = Result<Upserted<InitiativePerson>, Self::Error>> + Send + '_;

  fn list_links(
    &self,
  ) -> impl Future<Output = Result<Vec<InitiativePerson>, Self::Error>> + Send + '_;

  // ── Signals (append-only) ───────────────────────────────────────────

  /// Append one signal. Rejects non-finite values.
  fn add_signal(
    &self,
    input: NewSignal,
  ) -> impl Future<Output = Result<Signal, Self::Error>> + Send + '_;

  /// Append a batch of signals in one transaction: all rows or none.
  fn add_signals(
    &self,
    inputs: Vec<NewSignal>,
  ) -> impl Future<Output = Result<Vec<Signal>, Self::Error>> + Send + '_;

  /// Signals for one initiative, oldest first.
  fn list_signals(
    &self,
    initiative_id: i64,
  ) -> impl Future<Output = Result<Vec<Signal>, Self::Error>> + Send + '_;

  // ── Scores ────────────────────────────────────────────────────────────

  /// Replace the initiative's score and its breakdown with `sheet`.
  fn replace_score(
    &self,
    sheet: ScoreSheet,
  ) -> impl Future<Output = Result<Score, Self::Error>> + Send + '_;

  fn list_scores(&self) -> impl Future<Output = Result<Vec<Score>, Self::Error>> + Send + '_;

  fn list_score_components(
    &self,
    initiative_id: i64,
  ) -> impl Future<Output = Result<Vec<ScoreComponent>, Self::Error>> + Send + '_;

  fn list_score_evidence(
    &self,
    initiative_id: i64,
  ) -> impl Future<Output = Result<Vec<ScoreEvidence>, Self::Error>> + Send + '_;

  /// Validate and store the person's talent score. A person holds one talent
  /// score at a time: rows under any other `talent_type` are removed.
  fn add_talent_score(
    &self,
    input: NewTalentScore,
  ) -> impl Future<Output = Result<TalentScore, Self::Error>> + Send + '_;

  fn list_talent_scores(
    &self,
  ) -> impl Future<Output = Result<Vec<TalentScore>, Self::Error>> + Send + '_;

  // ── Rankings ──────────────────────────────────────────────────────────

  /// Delete every ranking row and insert `rows`, in one transaction.
  fn replace_rankings(
    &self,
    rows: Vec<NewRanking>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Rankings ordered by type and position, optionally for a single type.
  fn list_rankings(
    &self,
    ranking_type: Option<String>,
  ) -> impl Future<Output = Result<Vec<Ranking>, Self::Error>> + Send + '_;

  // ── Due diligence ─────────────────────────────────────────────────────

  /// Upsert on `(initiative_id, gate)`.
  fn upsert_dd_gate(
    &self,
    input: NewGate,
  ) -> impl Future<Output = Result<DdGate, Self::Error>> + Send + '_;

  fn list_dd_gates(&self) -> impl Future<Output = Result<Vec<DdGate>, Self::Error>> + Send + '_;

  /// Store the validated dossier for an initiative, replacing an older one.
  fn upsert_dossier_score(
    &self,
    initiative_id: i64,
    dossier_hash: String,
    dossier: ValidatedDossier,
  ) -> impl Future<Output = Result<DossierScore, Self::Error>> + Send + '_;

  fn list_dossier_scores(
    &self,
  ) -> impl Future<Output = Result<Vec<DossierScore>, Self::Error>> + Send + '_;

  // ── Tiers ─────────────────────────────────────────────────────────────

  /// Delete every tier row and insert `rows`, in one transaction.
  fn replace_tiers(
    &self,
    rows: Vec<NewTier>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Tiers ordered best first, then by initiative id.
  fn list_tiers(&self) -> impl Future<Output = Result<Vec<InitiativeTier>, Self::Error>> + Send + '_;

  // ── Pipeline runs ─────────────────────────────────────────────────────

  fn start_run(
    &self,
    stage: String,
  ) -> impl Future<Output = Result<PipelineRun, Self::Error>> + Send + '_;

  fn finish_run(
    &self,
    run_id: Uuid,
    status: RunStatus,
    details: Value,
    error_message: Option<String>,
  ) -> impl Future<Output = Result<PipelineRun, Self::Error>> + Send + '_;

  /// Runs newest first.
  fn list_runs(&self) -> impl Future<Output = Result<Vec<PipelineRun>, Self::Error>> + Send + '_;
}
