//! Initiative, the canonical venture entity, and the raw records that
//! resolve into it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::normalize::{IdentityKey, canonicalize_url, union_list, unique_list};

// ─── Status workflow ─────────────────────────────────────────────────────────

/// Manual tracking status set by the operator workflow.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InitiativeStatus {
  #[default]
  New,
  Priority,
  Contacted,
  Discovery,
  Supporting,
  Deferred,
}

impl InitiativeStatus {
  /// Statuses that imply a conversation just happened.
  pub fn marks_contact(self) -> bool {
    matches!(self, Self::Contacted | Self::Discovery | Self::Supporting)
  }
}

/// Input to [`crate::store::ScoutStore::set_initiative_status`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdate {
  pub status:         InitiativeStatus,
  /// Overwrites the current owner only when non-empty.
  pub owner:          Option<String>,
  /// Always replaces the stored date, so `None` clears it.
  pub next_step_date: Option<NaiveDate>,
  /// Overwrites the current note only when non-empty.
  pub note:           Option<String>,
}

// ─── Initiative ──────────────────────────────────────────────────────────────

/// A canonical initiative. Exactly one row exists per [`IdentityKey`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Initiative {
  pub id:              i64,
  /// Display name as first seen.
  pub name:            String,
  pub normalized_name: String,
  pub university:      String,
  pub primary_url:     String,
  pub description:     String,
  pub categories:      Vec<String>,
  pub technologies:    Vec<String>,
  pub markets:         Vec<String>,
  pub team_signals:    Vec<String>,
  pub confidence:      f64,
  pub status:          InitiativeStatus,
  pub owner:           String,
  pub next_step_date:  Option<NaiveDate>,
  pub note:            String,
  pub last_contact_at: Option<DateTime<Utc>>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Initiative {
  pub fn identity_key(&self) -> IdentityKey {
    IdentityKey {
      name: self.normalized_name.clone(),
      url:  self.primary_url.clone(),
    }
  }

  /// Fold an incoming record into this row.
  ///
  /// Set-valued fields are unioned. Scalars are replaced only by non-empty
  /// incoming values. `id`, `name` and `created_at` never change.
  pub fn merge(&mut self, incoming: &NewInitiative, now: DateTime<Utc>) {
    let university = incoming.normalized_university();
    if !university.is_empty() {
      self.university = university;
    }
    let url = incoming.canonical_url();
    if !url.is_empty() {
      self.primary_url = url;
    }
    if let Some(description) = incoming.description.as_deref().map(str::trim)
      && !description.is_empty()
    {
      self.description = description.to_owned();
    }

    self.categories = union_list(&self.categories, &incoming.categories);
    self.technologies = union_list(&self.technologies, &incoming.technologies);
    self.markets = union_list(&self.markets, &incoming.markets);
    self.team_signals = union_list(&self.team_signals, &incoming.team_signals);

    if let Some(confidence) = incoming.confidence {
      self.confidence = self.confidence.max(crate::clip(confidence, 0.0, 1.0));
    }
    self.updated_at = now;
  }

  /// Apply a status update following the overwrite rules on [`StatusUpdate`].
  pub fn apply_status(&mut self, update: &StatusUpdate, now: DateTime<Utc>) {
    self.status = update.status;
    if let Some(owner) = update.owner.as_deref().map(str::trim)
      && !owner.is_empty()
    {
      self.owner = owner.to_owned();
    }
    if let Some(note) = update.note.as_deref().map(str::trim)
      && !note.is_empty()
    {
      self.note = note.to_owned();
    }
    self.next_step_date = update.next_step_date;
    if update.status.marks_contact() {
      self.last_contact_at = Some(now);
    }
    self.updated_at = now;
  }
}

// ─── NewInitiative ───────────────────────────────────────────────────────────

/// Input to [`crate::store::ScoutStore::upsert_initiative`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInitiative {
  pub name:         String,
  pub university:   Option<String>,
  pub primary_url:  Option<String>,
  pub description:  Option<String>,
  #[serde(default)]
  pub categories:   Vec<String>,
  #[serde(default)]
  pub technologies: Vec<String>,
  #[serde(default)]
  pub markets:      Vec<String>,
  #[serde(default)]
  pub team_signals: Vec<String>,
  pub confidence:   Option<f64>,
}

impl NewInitiative {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }

  pub fn identity_key(&self) -> IdentityKey {
    IdentityKey::new(&self.name, self.primary_url.as_deref())
  }

  pub fn canonical_url(&self) -> String {
    self.primary_url.as_deref().map(canonicalize_url).unwrap_or_default()
  }

  pub fn normalized_university(&self) -> String {
    self
      .university
      .as_deref()
      .map(|u| u.trim().to_uppercase())
      .unwrap_or_default()
  }

  /// Build the first-seen row for this record.
  pub fn into_initiative(self, id: i64, now: DateTime<Utc>) -> Initiative {
    let key = self.identity_key();
    let university = self.normalized_university();
    Initiative {
      id,
      name: self.name.trim().to_owned(),
      normalized_name: key.name,
      university,
      primary_url: key.url,
      description: self.description.unwrap_or_default().trim().to_owned(),
      categories: unique_list(&self.categories),
      technologies: unique_list(&self.technologies),
      markets: unique_list(&self.markets),
      team_signals: unique_list(&self.team_signals),
      confidence: self.confidence.map(|c| crate::clip(c, 0.0, 1.0)).unwrap_or(0.0),
      status: InitiativeStatus::New,
      owner: String::new(),
      next_step_date: None,
      note: String::new(),
      last_contact_at: None,
      created_at: now,
      updated_at: now,
    }
  }
}

// ─── Raw input ───────────────────────────────────────────────────────────────

/// A candidate record as produced by a directory scraper, CSV importer or
/// markdown parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawInitiative {
  pub name:            String,
  #[serde(default)]
  pub university:      Option<String>,
  #[serde(default)]
  pub source_name:     String,
  #[serde(default)]
  pub source_url:      String,
  #[serde(default)]
  pub external_url:    Option<String>,
  #[serde(default)]
  pub description_raw: Option<String>,
  #[serde(default)]
  pub categories:      Vec<String>,
  #[serde(default)]
  pub technologies:    Vec<String>,
  #[serde(default)]
  pub markets:         Vec<String>,
  #[serde(default)]
  pub team_signals:    Vec<String>,
  #[serde(default)]
  pub metadata:        serde_json::Map<String, serde_json::Value>,
}

impl RawInitiative {
  pub fn to_new_initiative(&self) -> NewInitiative {
    NewInitiative {
      name:         self.name.clone(),
      university:   self.university.clone(),
      primary_url:  self.external_url.clone(),
      description:  self.description_raw.clone(),
      categories:   self.categories.clone(),
      technologies: self.technologies.clone(),
      markets:      self.markets.clone(),
      team_signals: self.team_signals.clone(),
      confidence:   None,
    }
  }
}

// ─── Source provenance ───────────────────────────────────────────────────────

/// Where an initiative was seen. One row per
/// `(initiative, source_type, source_url, external_url)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiativeSource {
  pub id:            i64,
  pub initiative_id: i64,
  pub source_type:   String,
  pub source_name:   String,
  pub source_url:    String,
  pub external_url:  String,
  pub payload_hash:  String,
  pub first_seen_at: DateTime<Utc>,
  pub last_seen_at:  DateTime<Utc>,
}

/// Input to [`crate::store::ScoutStore::record_source`].
#[derive(Debug, Clone)]
pub struct NewSource {
  pub initiative_id: i64,
  pub source_type:   String,
  pub source_name:   String,
  pub source_url:    String,
  pub external_url:  String,
  pub payload_hash:  String,
}

/// The outcome of an identity-resolving upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upserted<T> {
  pub entity:  T,
  /// `true` when no existing row matched and a new one was inserted.
  pub created: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base() -> Initiative {
    let mut input = NewInitiative::new("Akaflieg München e.V.");
    input.university = Some("hm".into());
    input.primary_url = Some("https://www.akaflieg.example/".into());
    input.categories = vec!["Aerospace".into()];
    input.description = Some("Glider club".into());
    input.into_initiative(7, Utc::now())
  }

  #[test]
  fn first_seen_row_is_normalized() {
    let row = base();
    assert_eq!(row.name, "Akaflieg München e.V.");
    assert_eq!(row.normalized_name, "akaflieg munchen");
    assert_eq!(row.university, "HM");
    assert_eq!(row.primary_url, "https://www.akaflieg.example");
  }

  #[test]
  fn merge_unions_sets_and_keeps_identity() {
    let mut row = base();
    let created = row.created_at;

    let mut incoming = NewInitiative::new("Akaflieg Munchen e.V");
    incoming.categories = vec!["aerospace".into(), "Research".into()];
    incoming.technologies = vec!["aerospace_space".into()];
    incoming.description = Some("   ".into());
    incoming.confidence = Some(0.4);
    row.merge(&incoming, Utc::now());

    assert_eq!(row.id, 7);
    assert_eq!(row.name, "Akaflieg München e.V.");
    assert_eq!(row.created_at, created);
    assert_eq!(row.categories, vec!["Aerospace", "Research"]);
    assert_eq!(row.technologies, vec!["aerospace_space"]);
    assert_eq!(row.description, "Glider club");
    assert_eq!(row.university, "HM");
    assert!((row.confidence - 0.4).abs() < f64::EPSILON);
  }

  #[test]
  fn merge_last_non_empty_scalar_wins() {
    let mut row = base();
    let mut incoming = NewInitiative::new("Akaflieg Munchen");
    incoming.university = Some("TUM".into());
    incoming.description = Some("Student flight research group".into());
    row.merge(&incoming, Utc::now());
    assert_eq!(row.university, "TUM");
    assert_eq!(row.description, "Student flight research group");
    assert_eq!(row.primary_url, "https://www.akaflieg.example");
  }

  #[test]
  fn status_update_keeps_owner_when_blank_and_clears_date() {
    let mut row = base();
    row.apply_status(
      &StatusUpdate {
        status:         InitiativeStatus::Contacted,
        owner:          Some("Scout Test".into()),
        next_step_date: NaiveDate::from_ymd_opt(2026, 2, 20),
        note:           Some("Queued discovery call".into()),
      },
      Utc::now(),
    );
    assert!(row.last_contact_at.is_some());

    row.apply_status(
      &StatusUpdate { status: InitiativeStatus::Deferred, owner: Some(String::new()), ..Default::default() },
      Utc::now(),
    );
    assert_eq!(row.status, InitiativeStatus::Deferred);
    assert_eq!(row.owner, "Scout Test");
    assert_eq!(row.note, "Queued discovery call");
    assert_eq!(row.next_step_date, None);
  }

  #[test]
  fn status_parses_from_snake_case() {
    assert_eq!("priority".parse::<InitiativeStatus>().ok(), Some(InitiativeStatus::Priority));
    assert_eq!(InitiativeStatus::Supporting.as_ref(), "supporting");
    assert!("bogus".parse::<InitiativeStatus>().is_err());
  }
}
