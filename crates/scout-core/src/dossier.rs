//! Validation of externally generated dossier scores.
//!
//! The scoring service returns loosely structured JSON. [`validate_response`]
//! turns any value at all into a bounded [`ValidatedDossier`]; it has no
//! failure path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::clip;

/// System prompt sent alongside every dossier.
pub const SCORING_SYSTEM_PROMPT: &str = "\
You are a venture scout assessing early-stage university initiatives for \
investment or support engagement. You receive one evidence dossier. Score it \
on six dimensions from 1.0 to 5.0 in 0.5 steps and give a confidence from 0.0 \
to 1.0 for each. Ground every score in evidence from the dossier and score low \
when evidence is thin.

Dimensions: technical_substance, team_capability, problem_market_clarity, \
traction_momentum, reachability, investability_signal. For each, return \
score, confidence, reasoning, key_evidence (list) and data_gaps (list).

Also return initiative_summary, classification (one of deep_tech_team, \
applied_research, student_venture, student_club, dormant, unclear), \
overall_assessment, recommended_action (one of engage_now, monitor_closely, \
monitor_quarterly, archive) and engagement_hook. Respond with a single JSON \
object.";

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DossierDimension {
  TechnicalSubstance,
  TeamCapability,
  ProblemMarketClarity,
  TractionMomentum,
  Reachability,
  InvestabilitySignal,
}

impl DossierDimension {
  /// Fixed weights; they sum to 1.0.
  pub fn weight(self) -> f64 {
    match self {
      Self::TechnicalSubstance => 0.25,
      Self::TeamCapability => 0.25,
      Self::ProblemMarketClarity => 0.20,
      Self::TractionMomentum => 0.15,
      Self::Reachability => 0.10,
      Self::InvestabilitySignal => 0.05,
    }
  }
}

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
pub enum Classification {
  DeepTechTeam,
  AppliedResearch,
  StudentVenture,
  StudentClub,
  Dormant,
  #[default]
  Unclear,
}

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
pub enum RecommendedAction {
  EngageNow,
  MonitorClosely,
  #[default]
  MonitorQuarterly,
  Archive,
}

// ─── Validated output ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionAssessment {
  pub score:        f64,
  pub confidence:   f64,
  pub reasoning:    String,
  pub key_evidence: Vec<String>,
  pub data_gaps:    Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedDossier {
  pub initiative_summary:   String,
  pub classification:       Classification,
  pub dimensions:           std::collections::BTreeMap<DossierDimension, DimensionAssessment>,
  pub overall_assessment:   String,
  pub recommended_action:   RecommendedAction,
  pub engagement_hook:      String,
  pub composite_score:      f64,
  pub composite_confidence: f64,
}

/// A dossier score as stored, keyed by the hash of the dossier text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DossierScore {
  pub id:            i64,
  pub initiative_id: i64,
  pub dossier_hash:  String,
  #[serde(flatten)]
  pub dossier:       ValidatedDossier,
  pub scored_at:     chrono::DateTime<chrono::Utc>,
}

// ─── Coercion ────────────────────────────────────────────────────────────────

fn number(value: Option<&Value>) -> Option<f64> {
  let n = match value? {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
    _ => None,
  }?;
  n.is_finite().then_some(n)
}

fn text(value: Option<&Value>) -> String {
  match value {
    None | Some(Value::Null) => String::new(),
    Some(Value::String(s)) => s.clone(),
    Some(other) => other.to_string(),
  }
}

fn list(value: Option<&Value>) -> Vec<String> {
  match value {
    Some(Value::Array(items)) => items
      .iter()
      .map(|item| text(Some(item)))
      .filter(|s| !s.trim().is_empty())
      .collect(),
    Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
    _ => Vec::new(),
  }
}

fn variant<T: std::str::FromStr + Default>(value: Option<&Value>) -> T {
  value
    .and_then(Value::as_str)
    .and_then(|s| s.trim().parse().ok())
    .unwrap_or_default()
}

fn validate_dimension(raw: Option<&Map<String, Value>>) -> DimensionAssessment {
  let field = |name: &str| raw.and_then(|m| m.get(name));
  DimensionAssessment {
    score:        clip(number(field("score")).unwrap_or(1.0), 1.0, 5.0),
    confidence:   clip(number(field("confidence")).unwrap_or(0.0), 0.0, 1.0),
    reasoning:    text(field("reasoning")),
    key_evidence: list(field("key_evidence")),
    data_gaps:    list(field("data_gaps")),
  }
}

fn round4(value: f64) -> f64 { (value * 10_000.0).round() / 10_000.0 }

/// Sanitize an arbitrary scoring response.
pub fn validate_response(raw: &Value) -> ValidatedDossier {
  let top = raw.as_object();
  let field = |name: &str| top.and_then(|m| m.get(name));
  let raw_dimensions = field("dimensions").and_then(Value::as_object);

  let dimensions: std::collections::BTreeMap<_, _> = DossierDimension::iter()
    .map(|d| {
      let sub = raw_dimensions.and_then(|m| m.get(d.as_ref())).and_then(Value::as_object);
      (d, validate_dimension(sub))
    })
    .collect();

  let mut composite = 0.0;
  let mut weighted_confidence = 0.0;
  let mut total_weight = 0.0;
  for (d, a) in &dimensions {
    let w = d.weight();
    composite += w * a.score * a.confidence;
    weighted_confidence += w * a.confidence;
    total_weight += w;
  }

  ValidatedDossier {
    initiative_summary: text(field("initiative_summary")),
    classification: variant(field("classification")),
    dimensions,
    overall_assessment: text(field("overall_assessment")),
    recommended_action: variant(field("recommended_action")),
    engagement_hook: text(field("engagement_hook")),
    composite_score: round4(composite),
    composite_confidence: round4(if total_weight > 0.0 {
      weighted_confidence / total_weight
    } else {
      0.0
    }),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn weights_sum_to_one() {
    let total: f64 = DossierDimension::iter().map(DossierDimension::weight).sum();
    assert!((total - 1.0).abs() < 1e-12);
  }

  #[test]
  fn empty_object_yields_safe_defaults() {
    let v = validate_response(&json!({}));
    assert_eq!(v.classification, Classification::Unclear);
    assert_eq!(v.recommended_action, RecommendedAction::MonitorQuarterly);
    assert_eq!(v.dimensions.len(), 6);
    for a in v.dimensions.values() {
      assert_eq!(a.score, 1.0);
      assert_eq!(a.confidence, 0.0);
      assert!(a.key_evidence.is_empty());
    }
    assert_eq!(v.composite_score, 0.0);
    assert_eq!(v.composite_confidence, 0.0);
  }

  #[test]
  fn non_objects_are_accepted() {
    for raw in [json!(null), json!(42), json!("text"), json!([1, 2, 3])] {
      let v = validate_response(&raw);
      assert_eq!(v.classification, Classification::Unclear);
      assert_eq!(v.composite_confidence, 0.0);
    }
  }

  #[test]
  fn out_of_range_values_are_clamped() {
    let v = validate_response(&json!({
      "classification": "unicorn",
      "recommended_action": "buy_everything",
      "dimensions": {
        "technical_substance": { "score": 11, "confidence": 3.5 },
        "team_capability": { "score": -4, "confidence": -1 },
        "traction_momentum": { "score": "4.5", "confidence": "0.5" },
        "reachability": { "score": "lots", "confidence": null },
        "investability_signal": "not an object"
      }
    }));

    let dims = &v.dimensions;
    assert_eq!(dims[&DossierDimension::TechnicalSubstance].score, 5.0);
    assert_eq!(dims[&DossierDimension::TechnicalSubstance].confidence, 1.0);
    assert_eq!(dims[&DossierDimension::TeamCapability].score, 1.0);
    assert_eq!(dims[&DossierDimension::TeamCapability].confidence, 0.0);
    assert_eq!(dims[&DossierDimension::TractionMomentum].score, 4.5);
    assert_eq!(dims[&DossierDimension::Reachability].score, 1.0);
    assert_eq!(dims[&DossierDimension::InvestabilitySignal].score, 1.0);
    assert_eq!(v.classification, Classification::Unclear);
    assert_eq!(v.recommended_action, RecommendedAction::MonitorQuarterly);
  }

  #[test]
  fn composite_is_weighted_by_confidence() {
    let v = validate_response(&json!({
      "classification": "deep_tech_team",
      "recommended_action": "engage_now",
      "dimensions": {
        "technical_substance": { "score": 4.0, "confidence": 1.0 },
        "team_capability": { "score": 3.0, "confidence": 0.5 }
      }
    }));
    // 0.25 * 4 * 1 + 0.25 * 3 * 0.5
    assert_eq!(v.composite_score, 1.375);
    // (0.25 + 0.125) / 1.0
    assert_eq!(v.composite_confidence, 0.375);
    assert_eq!(v.classification, Classification::DeepTechTeam);
    assert_eq!(v.recommended_action, RecommendedAction::EngageNow);
  }

  #[test]
  fn text_and_lists_are_coerced() {
    let v = validate_response(&json!({
      "initiative_summary": 7,
      "dimensions": {
        "reachability": {
          "reasoning": ["named", "contacts"],
          "key_evidence": "contact page",
          "data_gaps": [null, "email", 3]
        }
      }
    }));
    assert_eq!(v.initiative_summary, "7");
    let reach = &v.dimensions[&DossierDimension::Reachability];
    assert_eq!(reach.reasoning, r#"["named","contacts"]"#);
    assert_eq!(reach.key_evidence, ["contact page"]);
    assert_eq!(reach.data_gaps, ["email", "3"]);
  }
}
