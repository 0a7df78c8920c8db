//! Talent scoring: per-person scores partitioned by talent category.

use std::{collections::BTreeSet, convert::Infallible, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  clip,
  error::{ensure_finite, Error},
  normalize::unique_list,
  person::{InitiativePerson, Person, PersonType},
  Result,
};

/// The neutral midpoint; scores away from it must carry reasons.
pub const NEUTRAL_SCORE: f64 = 3.0;

const LEADERSHIP_TOKENS: &[&str] =
  &["lead", "founder", "chair", "president", "cto", "ceo", "captain"];

// ─── Talent type ─────────────────────────────────────────────────────────────

/// Talent category. Used as the ranking partition key, so the set is open.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TalentType {
  Operators,
  AlumniAngels,
  Other(String),
}

impl TalentType {
  pub fn for_person(person_type: PersonType) -> Self {
    match person_type {
      PersonType::AlumniAngel => Self::AlumniAngels,
      PersonType::Operator | PersonType::Unknown => Self::Operators,
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Operators => "operators",
      Self::AlumniAngels => "alumni_angels",
      Self::Other(s) => s,
    }
  }

  /// The ranking partition this category is ranked under.
  pub fn ranking_type(&self) -> String { format!("talent_{}", self.as_str()) }
}

impl fmt::Display for TalentType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for TalentType {
  type Err = Infallible;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    Ok(match s.trim() {
      "operators" => Self::Operators,
      "alumni_angels" => Self::AlumniAngels,
      other => Self::Other(other.to_owned()),
    })
  }
}

impl From<String> for TalentType {
  fn from(s: String) -> Self {
    match s.parse() {
      Ok(t) => t,
      Err(never) => match never {},
    }
  }
}

impl From<TalentType> for String {
  fn from(t: TalentType) -> Self { t.as_str().to_owned() }
}

// ─── Scores ──────────────────────────────────────────────────────────────────

/// A persisted talent score. Unique per `(person_id, talent_type)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalentScore {
  pub id:                 i64,
  pub person_id:          i64,
  pub talent_type:        TalentType,
  pub reachability:       f64,
  pub operator_strength:  f64,
  pub investor_relevance: f64,
  pub network_score:      f64,
  pub composite_score:    f64,
  pub confidence:         f64,
  pub reasons:            Vec<String>,
  pub scored_at:          DateTime<Utc>,
}

/// Input to [`crate::store::ScoutStore::add_talent_score`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTalentScore {
  pub person_id:          i64,
  pub talent_type:        TalentType,
  pub reachability:       f64,
  pub operator_strength:  f64,
  pub investor_relevance: f64,
  pub network_score:      f64,
  pub composite_score:    f64,
  pub confidence:         f64,
  #[serde(default)]
  pub reasons:            Vec<String>,
}

impl NewTalentScore {
  /// Bound every field and enforce the reasons rule.
  ///
  /// Non-finite input is an error rather than something to clamp.
  pub fn validated(self) -> Result<Self> {
    let score = |field, value| ensure_finite(field, value).map(|v| clip(v, 1.0, 5.0));

    let validated = Self {
      reachability: score("reachability", self.reachability)?,
      operator_strength: score("operator_strength", self.operator_strength)?,
      investor_relevance: score("investor_relevance", self.investor_relevance)?,
      network_score: score("network_score", self.network_score)?,
      composite_score: score("composite_score", self.composite_score)?,
      confidence: clip(ensure_finite("confidence", self.confidence)?, 0.0, 1.0),
      reasons: unique_list(self.reasons.iter().map(|r| r.trim()).filter(|r| !r.is_empty())),
      ..self
    };

    if validated.composite_score != NEUTRAL_SCORE && validated.reasons.is_empty() {
      return Err(Error::MissingReasons(validated.person_id));
    }
    Ok(validated)
  }

  pub fn into_talent_score(self, id: i64, now: DateTime<Utc>) -> TalentScore {
    TalentScore {
      id,
      person_id: self.person_id,
      talent_type: self.talent_type,
      reachability: self.reachability,
      operator_strength: self.operator_strength,
      investor_relevance: self.investor_relevance,
      network_score: self.network_score,
      composite_score: self.composite_score,
      confidence: self.confidence,
      reasons: self.reasons,
      scored_at: now,
    }
  }
}

// ─── Assessment ──────────────────────────────────────────────────────────────

/// Derive a talent score from a person's channels, roles and initiative links.
pub fn assess_person(person: &Person, links: &[InitiativePerson]) -> NewTalentScore {
  let channels = &person.contact_channels;
  let has_email = channels.iter().any(|c| c.contains('@'));
  let has_linkedin = channels.iter().any(|c| c.to_lowercase().contains("linkedin.com"));
  let has_web = channels.iter().any(|c| c.starts_with("http"));

  let roles = unique_list(links.iter().map(|l| l.role.trim()).filter(|r| !r.is_empty()));
  let initiatives: BTreeSet<i64> = links.iter().map(|l| l.initiative_id).collect();

  let mut reasons = Vec::new();
  if !person.headline.trim().is_empty() {
    reasons.push(person.headline.trim().to_owned());
  }
  reasons.extend(roles.iter().map(|r| format!("role: {r}")));
  reasons.push(format!(
    "{} contact channel(s), linked to {} initiative(s)",
    channels.len(),
    initiatives.len(),
  ));

  let channel_count = channels.len() as f64;
  let linked = initiatives.len() as f64;
  let reason_count = reasons.len() as f64;

  let reachability = 1.0
    + if has_email { 1.2 } else { 0.0 }
    + if has_linkedin { 0.8 } else { 0.0 }
    + if has_web { 0.3 } else { 0.0 }
    + (0.25 * channel_count).min(1.7);

  let leads = roles.iter().any(|r| {
    let r = r.to_lowercase();
    LEADERSHIP_TOKENS.iter().any(|t| r.contains(t))
  });
  let operator_strength = 1.0
    + if leads { 1.2 } else { 0.4 }
    + (0.4 * linked).min(2.0)
    + (0.2 * reason_count).min(0.8);

  let talent_type = TalentType::for_person(person.person_type);
  let investor_relevance = if talent_type == TalentType::AlumniAngels {
    3.2 + if has_linkedin { 0.8 } else { 0.0 } + (0.2 * reason_count).min(1.0)
  } else {
    1.2
  };

  let network_score = 1.0 + (0.35 * linked).min(1.8) + (0.25 * channel_count).min(1.8);

  let reachability = clip(reachability, 1.0, 5.0);
  let operator_strength = clip(operator_strength, 1.0, 5.0);
  let investor_relevance = clip(investor_relevance, 1.0, 5.0);
  let network_score = clip(network_score, 1.0, 5.0);

  let composite = match talent_type {
    TalentType::AlumniAngels => {
      0.45 * investor_relevance + 0.30 * network_score + 0.25 * reachability
    }
    _ => 0.45 * operator_strength + 0.30 * reachability + 0.25 * network_score,
  };

  NewTalentScore {
    person_id: person.id,
    talent_type,
    reachability,
    operator_strength,
    investor_relevance,
    network_score,
    composite_score: clip(composite, 1.0, 5.0),
    confidence: clip(
      0.3 + 0.1 * person.source_urls.len() as f64 + 0.08 * links.len() as f64,
      0.0,
      1.0,
    ),
    reasons,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::person::NewPerson;

  fn person(kind: PersonType, channels: &[&str]) -> Person {
    NewPerson {
      name: "Dana Example".into(),
      person_type: kind,
      headline: "Robotics PhD".into(),
      contact_channels: channels.iter().map(|c| c.to_string()).collect(),
      source_urls: vec!["https://team.example/people".into()],
      confidence: 0.7,
    }
    .into_person(4, Utc::now())
  }

  fn link(initiative_id: i64, role: &str) -> InitiativePerson {
    InitiativePerson {
      id: initiative_id,
      initiative_id,
      person_id: 4,
      role: role.into(),
      is_primary_contact: false,
      source_type: "people_markdown".into(),
      source_url: String::new(),
      created_at: Utc::now(),
    }
  }

  #[test]
  fn talent_type_round_trips_through_strings() {
    assert_eq!("operators".parse::<TalentType>().unwrap(), TalentType::Operators);
    assert_eq!(
      "mentors".parse::<TalentType>().unwrap(),
      TalentType::Other("mentors".into())
    );
    assert_eq!(TalentType::AlumniAngels.ranking_type(), "talent_alumni_angels");
    let json = serde_json::to_string(&TalentType::AlumniAngels).unwrap();
    assert_eq!(json, "\"alumni_angels\"");
  }

  #[test]
  fn validation_clamps_and_requires_reasons() {
    let base = NewTalentScore {
      person_id: 1,
      talent_type: TalentType::Operators,
      reachability: 9.0,
      operator_strength: -2.0,
      investor_relevance: 3.0,
      network_score: 3.0,
      composite_score: 4.2,
      confidence: 1.7,
      reasons: vec![" lead ".into(), "lead".into(), "".into()],
    };

    let ok = base.clone().validated().unwrap();
    assert_eq!(ok.reachability, 5.0);
    assert_eq!(ok.operator_strength, 1.0);
    assert_eq!(ok.confidence, 1.0);
    assert_eq!(ok.reasons, ["lead"]);

    let missing = NewTalentScore { reasons: vec![], ..base.clone() }.validated();
    assert!(matches!(missing, Err(Error::MissingReasons(1))));

    let neutral =
      NewTalentScore { reasons: vec![], composite_score: NEUTRAL_SCORE, ..base.clone() };
    assert!(neutral.validated().is_ok());

    let nan = NewTalentScore { network_score: f64::NAN, ..base }.validated();
    assert!(matches!(nan, Err(Error::NonFinite { field: "network_score", .. })));
  }

  #[test]
  fn leaders_with_links_score_as_strong_operators() {
    let p = person(PersonType::Operator, &["dana@team.example", "https://linkedin.com/in/dana"]);
    let score = assess_person(&p, &[link(1, "Technical Lead"), link(2, "member")]);

    assert_eq!(score.talent_type, TalentType::Operators);
    // 1 + 1.2 email + 0.8 linkedin + 0.3 web + 0.5 channels
    assert!((score.reachability - 3.8).abs() < 1e-9);
    // headline, two roles, summary: 1 + 1.2 + 0.8 + 0.8
    assert!((score.operator_strength - 3.8).abs() < 1e-9);
    assert_eq!(score.investor_relevance, 1.2);
    assert!((score.confidence - 0.56).abs() < 1e-9);
    assert!(score.reasons.iter().any(|r| r.contains("linked to 2 initiative(s)")));
    assert!(score.clone().validated().is_ok());
  }

  #[test]
  fn alumni_angels_weigh_investor_relevance() {
    let p = person(PersonType::AlumniAngel, &["https://linkedin.com/in/dana"]);
    let score = assess_person(&p, &[]);
    assert_eq!(score.talent_type, TalentType::AlumniAngels);
    // 3.2 + 0.8 linkedin + 0.4 for two reasons
    assert!((score.investor_relevance - 4.4).abs() < 1e-9);
    assert!(score.composite_score > 2.0);
    assert!(!score.reasons.is_empty());
  }

  #[test]
  fn scores_stay_bounded_for_busy_people() {
    let channels: Vec<String> = (0..40).map(|i| format!("p{i}@example.com")).collect();
    let refs: Vec<&str> = channels.iter().map(String::as_str).collect();
    let p = person(PersonType::Operator, &refs);
    let links: Vec<_> = (0..30).map(|i| link(i, "founder")).collect();
    let score = assess_person(&p, &links);
    for v in [
      score.reachability,
      score.operator_strength,
      score.investor_relevance,
      score.network_score,
      score.composite_score,
    ] {
      assert!((1.0..=5.0).contains(&v));
    }
    assert_eq!(score.confidence, 1.0);
  }
}
