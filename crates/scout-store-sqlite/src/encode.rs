//! Encoding and decoding helpers between Scout domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, string
//! sets are compact JSON arrays and enums are their snake_case names.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use scout_core::{
  dossier::{DossierScore, ValidatedDossier},
  gate::DdGate,
  initiative::{Initiative, InitiativeSource},
  person::{InitiativePerson, Person},
  ranking::{NewRanking, Ranking},
  run::PipelineRun,
  score::{ComponentValues, EvidenceValues, Score, ScoreComponent, ScoreEvidence, ScoreValues},
  signal::Signal,
  talent::TalentScore,
  tier::{InitiativeTier, NewTier},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_list(items: &[String]) -> Result<String> { Ok(serde_json::to_string(items)?) }

pub fn decode_list(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

/// Parse a stored enum name, reporting which column held the bad value.
pub fn decode_enum<T: FromStr>(kind: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| {
    Error::Core(scout_core::Error::UnknownVariant { kind, value: s.to_owned() })
  })
}

fn count(n: i64) -> usize { usize::try_from(n).unwrap_or(0) }

// ─── Initiatives ─────────────────────────────────────────────────────────────

pub const INITIATIVE_COLUMNS: &str = "id, name, normalized_name, university, primary_url, \
  description, categories, technologies, markets, team_signals, confidence, status, owner, \
  next_step_date, note, last_contact_at, created_at, updated_at";

/// Raw values read directly from an `initiatives` row.
pub struct InitiativeRow {
  pub id:              i64,
  pub name:            String,
  pub normalized_name: String,
  pub university:      String,
  pub primary_url:     String,
  pub description:     String,
  pub categories:      String,
  pub technologies:    String,
  pub markets:         String,
  pub team_signals:    String,
  pub confidence:      f64,
  pub status:          String,
  pub owner:           String,
  pub next_step_date:  Option<String>,
  pub note:            String,
  pub last_contact_at: Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
}

impl InitiativeRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      name:            row.get(1)?,
      normalized_name: row.get(2)?,
      university:      row.get(3)?,
      primary_url:     row.get(4)?,
      description:     row.get(5)?,
      categories:      row.get(6)?,
      technologies:    row.get(7)?,
      markets:         row.get(8)?,
      team_signals:    row.get(9)?,
      confidence:      row.get(10)?,
      status:          row.get(11)?,
      owner:           row.get(12)?,
      next_step_date:  row.get(13)?,
      note:            row.get(14)?,
      last_contact_at: row.get(15)?,
      created_at:      row.get(16)?,
      updated_at:      row.get(17)?,
    })
  }

  pub fn into_initiative(self) -> Result<Initiative> {
    Ok(Initiative {
      id:              self.id,
      name:            self.name,
      normalized_name: self.normalized_name,
      university:      self.university,
      primary_url:     self.primary_url,
      description:     self.description,
      categories:      decode_list(&self.categories)?,
      technologies:    decode_list(&self.technologies)?,
      markets:         decode_list(&self.markets)?,
      team_signals:    decode_list(&self.team_signals)?,
      confidence:      self.confidence,
      status:          decode_enum("initiative status", &self.status)?,
      owner:           self.owner,
      next_step_date:  self.next_step_date.as_deref().map(decode_date).transpose()?,
      note:            self.note,
      last_contact_at: self.last_contact_at.as_deref().map(decode_dt).transpose()?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const SOURCE_COLUMNS: &str = "id, initiative_id, source_type, source_name, source_url, \
  external_url, payload_hash, first_seen_at, last_seen_at";

pub struct SourceRow {
  pub id:            i64,
  pub initiative_id: i64,
  pub source_type:   String,
  pub source_name:   String,
  pub source_url:    String,
  pub external_url:  String,
  pub payload_hash:  String,
  pub first_seen_at: String,
  pub last_seen_at:  String,
}

impl SourceRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      initiative_id: row.get(1)?,
      source_type:   row.get(2)?,
      source_name:   row.get(3)?,
      source_url:    row.get(4)?,
      external_url:  row.get(5)?,
      payload_hash:  row.get(6)?,
      first_seen_at: row.get(7)?,
      last_seen_at:  row.get(8)?,
    })
  }

  pub fn into_source(self) -> Result<InitiativeSource> {
    Ok(InitiativeSource {
      id:            self.id,
      initiative_id: self.initiative_id,
      source_type:   self.source_type,
      source_name:   self.source_name,
      source_url:    self.source_url,
      external_url:  self.external_url,
      payload_hash:  self.payload_hash,
      first_seen_at: decode_dt(&self.first_seen_at)?,
      last_seen_at:  decode_dt(&self.last_seen_at)?,
    })
  }
}

// ─── People ──────────────────────────────────────────────────────────────────

pub const PERSON_COLUMNS: &str = "id, name, normalized_name, person_type, headline, \
  contact_channels, source_urls, confidence, created_at, updated_at";

pub struct PersonRow {
  pub id:               i64,
  pub name:             String,
  pub normalized_name:  String,
  pub person_type:      String,
  pub headline:         String,
  pub contact_channels: String,
  pub source_urls:      String,
  pub confidence:       f64,
  pub created_at:       String,
  pub updated_at:       String,
}

impl PersonRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      name:             row.get(1)?,
      normalized_name:  row.get(2)?,
      person_type:      row.get(3)?,
      headline:         row.get(4)?,
      contact_channels: row.get(5)?,
      source_urls:      row.get(6)?,
      confidence:       row.get(7)?,
      created_at:       row.get(8)?,
      updated_at:       row.get(9)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      id:               self.id,
      name:             self.name,
      normalized_name:  self.normalized_name,
      person_type:      decode_enum("person type", &self.person_type)?,
      headline:         self.headline,
      contact_channels: decode_list(&self.contact_channels)?,
      source_urls:      decode_list(&self.source_urls)?,
      confidence:       self.confidence,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

pub const LINK_COLUMNS: &str = "id, initiative_id, person_id, role, is_primary_contact, \
  source_type, source_url, created_at";

pub struct LinkRow {
  pub id:                 i64,
  pub initiative_id:      i64,
  pub person_id:          i64,
  pub role:               String,
  pub is_primary_contact: bool,
  pub source_type:        String,
  pub source_url:         String,
  pub created_at:         String,
}

impl LinkRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      initiative_id:      row.get(1)?,
      person_id:          row.get(2)?,
      role:               row.get(3)?,
      is_primary_contact: row.get(4)?,
      source_type:        row.get(5)?,
      source_url:         row.get(6)?,
      created_at:         row.get(7)?,
    })
  }

  pub fn into_link(self) -> Result<InitiativePerson> {
    Ok(InitiativePerson {
      id:                 self.id,
      initiative_id:      self.initiative_id,
      person_id:          self.person_id,
      role:               self.role,
      is_primary_contact: self.is_primary_contact,
      source_type:        self.source_type,
      source_url:         self.source_url,
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

// ─── Signals ─────────────────────────────────────────────────────────────────

pub const SIGNAL_COLUMNS: &str = "id, initiative_id, signal_type, signal_key, value, \
  evidence_text, source_type, source_url, created_at";

pub struct SignalRow {
  pub id:            i64,
  pub initiative_id: i64,
  pub signal_type:   String,
  pub signal_key:    String,
  pub value:         f64,
  pub evidence_text: String,
  pub source_type:   String,
  pub source_url:    String,
  pub created_at:    String,
}

impl SignalRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      initiative_id: row.get(1)?,
      signal_type:   row.get(2)?,
      signal_key:    row.get(3)?,
      value:         row.get(4)?,
      evidence_text: row.get(5)?,
      source_type:   row.get(6)?,
      source_url:    row.get(7)?,
      created_at:    row.get(8)?,
    })
  }

  pub fn into_signal(self) -> Result<Signal> {
    Ok(Signal {
      id:            self.id,
      initiative_id: self.initiative_id,
      signal_type:   self.signal_type,
      signal_key:    self.signal_key,
      value:         self.value,
      evidence_text: self.evidence_text,
      source_type:   self.source_type,
      source_url:    self.source_url,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

// ─── Scores ──────────────────────────────────────────────────────────────────

pub const SCORE_COLUMNS: &str = "id, initiative_id, tech_depth, market_opportunity, \
  team_strength, maturity, composite_score, confidence_tech, confidence_market, \
  confidence_team, confidence_maturity, actionability_0_6m, support_fit, outreach_now_score, \
  venture_upside_score, confidence_actionability, confidence_support_fit, scored_at";

pub struct ScoreRow {
  pub id:            i64,
  pub initiative_id: i64,
  pub values:        ScoreValues,
  pub scored_at:     String,
}

impl ScoreRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      initiative_id: row.get(1)?,
      values:        ScoreValues {
        tech_depth:               row.get(2)?,
        market_opportunity:       row.get(3)?,
        team_strength:            row.get(4)?,
        maturity:                 row.get(5)?,
        composite_score:          row.get(6)?,
        confidence_tech:          row.get(7)?,
        confidence_market:        row.get(8)?,
        confidence_team:          row.get(9)?,
        confidence_maturity:      row.get(10)?,
        actionability_0_6m:       row.get(11)?,
        support_fit:              row.get(12)?,
        outreach_now_score:       row.get(13)?,
        venture_upside_score:     row.get(14)?,
        confidence_actionability: row.get(15)?,
        confidence_support_fit:   row.get(16)?,
      },
      scored_at:     row.get(17)?,
    })
  }

  pub fn into_score(self) -> Result<Score> {
    Ok(Score {
      id:            self.id,
      initiative_id: self.initiative_id,
      values:        self.values,
      scored_at:     decode_dt(&self.scored_at)?,
    })
  }
}

pub const COMPONENT_COLUMNS: &str = "id, score_id, initiative_id, dimension, component_key, \
  raw_value, normalized_value, weight, weighted_contribution, confidence, evidence_count, \
  source_mix, provenance";

pub struct ComponentRow {
  pub id:                    i64,
  pub score_id:              i64,
  pub initiative_id:         i64,
  pub dimension:             String,
  pub component_key:         String,
  pub raw_value:             f64,
  pub normalized_value:      f64,
  pub weight:                f64,
  pub weighted_contribution: f64,
  pub confidence:            f64,
  pub evidence_count:        i64,
  pub source_mix:            String,
  pub provenance:            String,
}

impl ComponentRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                    row.get(0)?,
      score_id:              row.get(1)?,
      initiative_id:         row.get(2)?,
      dimension:             row.get(3)?,
      component_key:         row.get(4)?,
      raw_value:             row.get(5)?,
      normalized_value:      row.get(6)?,
      weight:                row.get(7)?,
      weighted_contribution: row.get(8)?,
      confidence:            row.get(9)?,
      evidence_count:        row.get(10)?,
      source_mix:            row.get(11)?,
      provenance:            row.get(12)?,
    })
  }

  pub fn into_component(self) -> Result<ScoreComponent> {
    Ok(ScoreComponent {
      id:            self.id,
      score_id:      self.score_id,
      initiative_id: self.initiative_id,
      values:        ComponentValues {
        dimension:             self.dimension,
        component_key:         self.component_key,
        raw_value:             self.raw_value,
        normalized_value:      self.normalized_value,
        weight:                self.weight,
        weighted_contribution: self.weighted_contribution,
        confidence:            self.confidence,
        evidence_count:        count(self.evidence_count),
        source_mix:            decode_list(&self.source_mix)?,
        provenance:            decode_enum("provenance", &self.provenance)?,
      },
    })
  }
}

pub const EVIDENCE_COLUMNS: &str = "id, score_component_id, initiative_id, signal_id, \
  signal_type, signal_key, value, source_url, snippet";

pub fn read_evidence(row: &Row<'_>) -> rusqlite::Result<ScoreEvidence> {
  Ok(ScoreEvidence {
    id:                 row.get(0)?,
    score_component_id: row.get(1)?,
    initiative_id:      row.get(2)?,
    values:             EvidenceValues {
      signal_id:   row.get(3)?,
      signal_type: row.get(4)?,
      signal_key:  row.get(5)?,
      value:       row.get(6)?,
      source_url:  row.get(7)?,
      snippet:     row.get(8)?,
    },
  })
}

// ─── Talent ──────────────────────────────────────────────────────────────────

pub const TALENT_COLUMNS: &str = "id, person_id, talent_type, reachability, \
  operator_strength, investor_relevance, network_score, composite_score, confidence, reasons, \
  scored_at";

pub struct TalentRow {
  pub id:                 i64,
  pub person_id:          i64,
  pub talent_type:        String,
  pub reachability:       f64,
  pub operator_strength:  f64,
  pub investor_relevance: f64,
  pub network_score:      f64,
  pub composite_score:    f64,
  pub confidence:         f64,
  pub reasons:            String,
  pub scored_at:          String,
}

impl TalentRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      person_id:          row.get(1)?,
      talent_type:        row.get(2)?,
      reachability:       row.get(3)?,
      operator_strength:  row.get(4)?,
      investor_relevance: row.get(5)?,
      network_score:      row.get(6)?,
      composite_score:    row.get(7)?,
      confidence:         row.get(8)?,
      reasons:            row.get(9)?,
      scored_at:          row.get(10)?,
    })
  }

  pub fn into_talent_score(self) -> Result<TalentScore> {
    Ok(TalentScore {
      id:                 self.id,
      person_id:          self.person_id,
      talent_type:        self.talent_type.into(),
      reachability:       self.reachability,
      operator_strength:  self.operator_strength,
      investor_relevance: self.investor_relevance,
      network_score:      self.network_score,
      composite_score:    self.composite_score,
      confidence:         self.confidence,
      reasons:            decode_list(&self.reasons)?,
      scored_at:          decode_dt(&self.scored_at)?,
    })
  }
}

// ─── Rankings ────────────────────────────────────────────────────────────────

pub const RANKING_COLUMNS: &str = "id, ranking_type, entity_id, entity_key, entity_name, \
  rank_position, score, evidence_count, meta, generated_at";

pub struct RankingRow {
  pub id:             i64,
  pub ranking_type:   String,
  pub entity_id:      Option<i64>,
  pub entity_key:     String,
  pub entity_name:    String,
  pub rank_position:  i64,
  pub score:          f64,
  pub evidence_count: i64,
  pub meta:           String,
  pub generated_at:   String,
}

impl RankingRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      ranking_type:   row.get(1)?,
      entity_id:      row.get(2)?,
      entity_key:     row.get(3)?,
      entity_name:    row.get(4)?,
      rank_position:  row.get(5)?,
      score:          row.get(6)?,
      evidence_count: row.get(7)?,
      meta:           row.get(8)?,
      generated_at:   row.get(9)?,
    })
  }

  pub fn into_ranking(self) -> Result<Ranking> {
    Ok(Ranking {
      id:           self.id,
      row:          NewRanking {
        ranking_type:   self.ranking_type,
        entity_id:      self.entity_id,
        entity_key:     self.entity_key,
        entity_name:    self.entity_name,
        rank_position:  count(self.rank_position),
        score:          self.score,
        evidence_count: count(self.evidence_count),
        meta:           serde_json::from_str(&self.meta)?,
      },
      generated_at: decode_dt(&self.generated_at)?,
    })
  }
}

// ─── Due diligence ───────────────────────────────────────────────────────────

pub const GATE_COLUMNS: &str = "id, initiative_id, gate, status, reason, evidence, updated_at";

pub struct GateRow {
  pub id:            i64,
  pub initiative_id: i64,
  pub gate:          String,
  pub status:        String,
  pub reason:        String,
  pub evidence:      String,
  pub updated_at:    String,
}

impl GateRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      initiative_id: row.get(1)?,
      gate:          row.get(2)?,
      status:        row.get(3)?,
      reason:        row.get(4)?,
      evidence:      row.get(5)?,
      updated_at:    row.get(6)?,
    })
  }

  pub fn into_gate(self) -> Result<DdGate> {
    Ok(DdGate {
      id:            self.id,
      initiative_id: self.initiative_id,
      gate:          decode_enum("gate", &self.gate)?,
      status:        decode_enum("gate status", &self.status)?,
      reason:        self.reason,
      evidence:      decode_list(&self.evidence)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

pub const DOSSIER_COLUMNS: &str = "id, initiative_id, dossier_hash, payload, scored_at";

pub struct DossierRow {
  pub id:            i64,
  pub initiative_id: i64,
  pub dossier_hash:  String,
  pub payload:       String,
  pub scored_at:     String,
}

impl DossierRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      initiative_id: row.get(1)?,
      dossier_hash:  row.get(2)?,
      payload:       row.get(3)?,
      scored_at:     row.get(4)?,
    })
  }

  pub fn into_dossier_score(self) -> Result<DossierScore> {
    let dossier: ValidatedDossier = serde_json::from_str(&self.payload)?;
    Ok(DossierScore {
      id: self.id,
      initiative_id: self.initiative_id,
      dossier_hash: self.dossier_hash,
      dossier,
      scored_at: decode_dt(&self.scored_at)?,
    })
  }
}

// ─── Tiers ───────────────────────────────────────────────────────────────────

pub const TIER_COLUMNS: &str = "id, initiative_id, dossier_score_id, tier, rationale, \
  composite_percentile, dimension_percentiles, previous_tier, tier_change, change_reason, \
  cohort_stats, tiered_at";

pub struct TierRow {
  pub id:                    i64,
  pub initiative_id:         i64,
  pub dossier_score_id:      i64,
  pub tier:                  String,
  pub rationale:             String,
  pub composite_percentile:  f64,
  pub dimension_percentiles: String,
  pub previous_tier:         Option<String>,
  pub tier_change:           String,
  pub change_reason:         String,
  pub cohort_stats:          String,
  pub tiered_at:             String,
}

impl TierRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                    row.get(0)?,
      initiative_id:         row.get(1)?,
      dossier_score_id:      row.get(2)?,
      tier:                  row.get(3)?,
      rationale:             row.get(4)?,
      composite_percentile:  row.get(5)?,
      dimension_percentiles: row.get(6)?,
      previous_tier:         row.get(7)?,
      tier_change:           row.get(8)?,
      change_reason:         row.get(9)?,
      cohort_stats:          row.get(10)?,
      tiered_at:             row.get(11)?,
    })
  }

  pub fn into_tier(self) -> Result<InitiativeTier> {
    Ok(InitiativeTier {
      id:        self.id,
      row:       NewTier {
        initiative_id:         self.initiative_id,
        dossier_score_id:      self.dossier_score_id,
        tier:                  decode_enum("tier", &self.tier)?,
        rationale:             self.rationale,
        composite_percentile:  self.composite_percentile,
        dimension_percentiles: serde_json::from_str(&self.dimension_percentiles)?,
        previous_tier:         self
          .previous_tier
          .as_deref()
          .map(|t| decode_enum("tier", t))
          .transpose()?,
        change:                decode_enum("tier change", &self.tier_change)?,
        change_reason:         self.change_reason,
        cohort:                serde_json::from_str(&self.cohort_stats)?,
      },
      tiered_at: decode_dt(&self.tiered_at)?,
    })
  }
}

// ─── Pipeline runs ───────────────────────────────────────────────────────────

pub const RUN_COLUMNS: &str =
  "run_id, stage, status, details, error_message, started_at, finished_at";

pub struct RunRow {
  pub run_id:        String,
  pub stage:         String,
  pub status:        String,
  pub details:       String,
  pub error_message: Option<String>,
  pub started_at:    String,
  pub finished_at:   Option<String>,
}

impl RunRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      run_id:        row.get(0)?,
      stage:         row.get(1)?,
      status:        row.get(2)?,
      details:       row.get(3)?,
      error_message: row.get(4)?,
      started_at:    row.get(5)?,
      finished_at:   row.get(6)?,
    })
  }

  pub fn into_run(self) -> Result<PipelineRun> {
    Ok(PipelineRun {
      run_id:        decode_uuid(&self.run_id)?,
      stage:         self.stage,
      status:        decode_enum("run status", &self.status)?,
      details:       serde_json::from_str(&self.details)?,
      error_message: self.error_message,
      started_at:    decode_dt(&self.started_at)?,
      finished_at:   self.finished_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use scout_core::{gate::Gate, initiative::InitiativeStatus};

  use super::*;

  #[test]
  fn dates_round_trip() {
    let d = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    assert_eq!(encode_date(d), "2026-03-14");
    assert_eq!(decode_date("2026-03-14").unwrap(), d);
    assert!(decode_date("14.03.2026").is_err());
  }

  #[test]
  fn unknown_enum_names_are_reported() {
    let status: InitiativeStatus = decode_enum("initiative status", "priority").unwrap();
    assert_eq!(status, InitiativeStatus::Priority);
    let err = decode_enum::<Gate>("gate", "Z").unwrap_err();
    assert!(err.to_string().contains("\"Z\""));
  }
}
