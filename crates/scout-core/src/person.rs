//! People attached to initiatives: operators, alumni angels and the links
//! that tie them to the initiatives they work on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::normalize::{canonicalize_url, normalize_name, union_list, unique_list};

/// What kind of contact a person is.
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
pub enum PersonType {
  Operator,
  AlumniAngel,
  #[default]
  Unknown,
}

/// A canonical person, unique by normalized name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
  pub id:               i64,
  pub name:             String,
  pub normalized_name:  String,
  pub person_type:      PersonType,
  pub headline:         String,
  /// Emails, profile URLs and other ways to reach the person.
  pub contact_channels: Vec<String>,
  /// Canonicalized URLs where the person was found.
  pub source_urls:      Vec<String>,
  pub confidence:       f64,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

impl Person {
  /// Fold an incoming record into this row.
  ///
  /// A known `person_type` is never overwritten; only `Unknown` is upgraded.
  pub fn merge(&mut self, incoming: &NewPerson, now: DateTime<Utc>) {
    if self.person_type == PersonType::Unknown {
      self.person_type = incoming.person_type;
    }
    let headline = incoming.headline.trim();
    if !headline.is_empty() {
      self.headline = headline.to_owned();
    }
    self.contact_channels = union_list(&self.contact_channels, &incoming.contact_channels);
    self.source_urls = union_list(&self.source_urls, &incoming.canonical_sources());
    self.confidence = self.confidence.max(crate::clip(incoming.confidence, 0.0, 1.0));
    self.updated_at = now;
  }
}

/// Input to [`crate::store::ScoutStore::upsert_person`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPerson {
  pub name:             String,
  #[serde(default)]
  pub person_type:      PersonType,
  #[serde(default)]
  pub headline:         String,
  #[serde(default)]
  pub contact_channels: Vec<String>,
  #[serde(default)]
  pub source_urls:      Vec<String>,
  #[serde(default)]
  pub confidence:       f64,
}

impl NewPerson {
  pub fn normalized_name(&self) -> String { normalize_name(&self.name) }

  fn canonical_sources(&self) -> Vec<String> {
    self
      .source_urls
      .iter()
      .map(|u| canonicalize_url(u))
      .filter(|u| !u.is_empty())
      .collect()
  }

  pub fn into_person(self, id: i64, now: DateTime<Utc>) -> Person {
    let source_urls = unique_list(self.canonical_sources());
    Person {
      id,
      normalized_name: self.normalized_name(),
      name: self.name.trim().to_owned(),
      person_type: self.person_type,
      headline: self.headline.trim().to_owned(),
      contact_channels: unique_list(&self.contact_channels),
      source_urls,
      confidence: crate::clip(self.confidence, 0.0, 1.0),
      created_at: now,
      updated_at: now,
    }
  }
}

/// A person as produced by a people scraper or markdown roster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPerson {
  #[serde(flatten)]
  pub person:           NewPerson,
  #[serde(default)]
  pub role:             String,
  #[serde(default)]
  pub is_primary:       bool,
  #[serde(default)]
  pub source_type:      String,
  /// Names of initiatives this person belongs to, matched by identity key.
  #[serde(default)]
  pub initiative_names: Vec<String>,
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// Many-to-many link between an initiative and a person. Unique per
/// `(initiative_id, person_id, role)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiativePerson {
  pub id:                 i64,
  pub initiative_id:      i64,
  pub person_id:          i64,
  pub role:               String,
  pub is_primary_contact: bool,
  pub source_type:        String,
  pub source_url:         String,
  pub created_at:         DateTime<Utc>,
}

/// Input to [`crate::store::ScoutStore::link_person`].
#[derive(Debug, Clone, Default)]
pub struct NewLink {
  pub initiative_id:      i64,
  pub person_id:          i64,
  pub role:               String,
  pub is_primary_contact: bool,
  pub source_type:        String,
  pub source_url:         String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn merge_upgrades_unknown_type_only() {
    let mut person = NewPerson { name: "Op Person".into(), ..Default::default() }
      .into_person(1, Utc::now());
    assert_eq!(person.person_type, PersonType::Unknown);

    let incoming = NewPerson {
      name: "Op Person".into(),
      person_type: PersonType::Operator,
      contact_channels: vec!["op@example.com".into()],
      source_urls: vec!["https://talent.example/team/".into()],
      confidence: 0.8,
      ..Default::default()
    };
    person.merge(&incoming, Utc::now());
    assert_eq!(person.person_type, PersonType::Operator);

    let angel = NewPerson { person_type: PersonType::AlumniAngel, ..incoming.clone() };
    person.merge(&angel, Utc::now());
    assert_eq!(person.person_type, PersonType::Operator);
    assert_eq!(person.contact_channels, vec!["op@example.com"]);
    assert_eq!(person.source_urls, vec!["https://talent.example/team"]);
    assert!((person.confidence - 0.8).abs() < f64::EPSILON);
  }

  #[test]
  fn raw_person_flattens_person_fields() {
    let raw: RawPerson = serde_json::from_value(serde_json::json!({
      "name": "Alumni Angel",
      "person_type": "alumni_angel",
      "role": "Mentor",
      "initiative_names": ["Talent Initiative"]
    }))
    .unwrap();
    assert_eq!(raw.person.person_type, PersonType::AlumniAngel);
    assert_eq!(raw.role, "Mentor");
    assert!(raw.person.contact_channels.is_empty());
  }
}
