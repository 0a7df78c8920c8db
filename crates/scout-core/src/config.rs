//! Scoring configuration: the weight table the scoring engine consumes.
//!
//! Every field falls back to a built-in default, so a partial table (or none
//! at all) is always usable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
  clip,
  score::{Dimension, Metric},
  signal::kinds,
};

/// Weight table for [`crate::scoring::score_signals`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
  /// Base dimension weights used by the composite score.
  pub dimensions:          BTreeMap<Dimension, f64>,
  /// Per derived metric, the weight of each input dimension.
  pub metrics:             BTreeMap<Metric, BTreeMap<Dimension, f64>>,
  /// Which dimension each `signal_type` feeds. Unlisted types are ignored.
  pub signal_dimensions:   BTreeMap<String, Dimension>,
  /// Multiplier per `signal_type`; unlisted types weigh 1.0.
  pub signal_type_weights: BTreeMap<String, f64>,
  /// Trust per `source_type`.
  pub source_reliability:  BTreeMap<String, f64>,
  /// Trust for a `source_type` missing from `source_reliability`.
  pub default_reliability: f64,
  /// Count-like signal keys and the raw value at which they saturate to 5.0.
  pub saturation:          BTreeMap<String, f64>,
}

impl Default for ScoringWeights {
  fn default() -> Self {
    use Dimension::*;

    let dimensions = BTreeMap::from([
      (TechDepth, 0.30),
      (MarketOpportunity, 0.25),
      (TeamStrength, 0.25),
      (Maturity, 0.20),
    ]);

    let metrics = BTreeMap::from([
      (
        Metric::Actionability,
        BTreeMap::from([(Maturity, 0.40), (TeamStrength, 0.35), (MarketOpportunity, 0.25)]),
      ),
      (
        Metric::SupportFit,
        BTreeMap::from([(TechDepth, 0.40), (TeamStrength, 0.30), (MarketOpportunity, 0.30)]),
      ),
      (
        Metric::OutreachNow,
        BTreeMap::from([(TeamStrength, 0.35), (Maturity, 0.35), (MarketOpportunity, 0.30)]),
      ),
      (
        Metric::VentureUpside,
        BTreeMap::from([(TechDepth, 0.40), (MarketOpportunity, 0.40), (TeamStrength, 0.20)]),
      ),
    ]);

    let signal_dimensions = [
      (kinds::TECHNOLOGY_DOMAIN, TechDepth),
      (kinds::TECH_METRIC, TechDepth),
      (kinds::MARKET_DOMAIN, MarketOpportunity),
      (kinds::MARKET_METRIC, MarketOpportunity),
      (kinds::TEAM_METRIC, TeamStrength),
      (kinds::MATURITY_METRIC, Maturity),
    ]
    .into_iter()
    .map(|(kind, dimension)| (kind.to_owned(), dimension))
    .collect();

    let source_reliability = [
      ("manual_dd", 1.0),
      ("github_api", 0.9),
      ("people_markdown", 0.8),
      ("public_signals", 0.6),
      ("website_enrichment", 0.5),
      ("seed_markdown", 0.4),
    ]
    .into_iter()
    .map(|(source, trust)| (source.to_owned(), trust))
    .collect();

    let saturation = [
      ("team_size", 50.0),
      ("commercial_mentions", 10.0),
      ("repo_count", 10.0),
      ("contributor_count", 25.0),
    ]
    .into_iter()
    .map(|(key, at)| (key.to_owned(), at))
    .collect();

    Self {
      dimensions,
      metrics,
      signal_dimensions,
      signal_type_weights: BTreeMap::new(),
      source_reliability,
      default_reliability: 0.5,
      saturation,
    }
  }
}

impl ScoringWeights {
  pub fn dimension_for(&self, signal_type: &str) -> Option<Dimension> {
    self.signal_dimensions.get(signal_type).copied()
  }

  pub fn dimension_weight(&self, dimension: Dimension) -> f64 {
    sanitize_weight(self.dimensions.get(&dimension).copied().unwrap_or(0.0))
  }

  /// Effective weight of one signal: type multiplier times source trust.
  pub fn signal_weight(&self, signal_type: &str, source_type: &str) -> f64 {
    let type_weight = self.signal_type_weights.get(signal_type).copied().unwrap_or(1.0);
    let reliability = self
      .source_reliability
      .get(source_type)
      .copied()
      .unwrap_or(self.default_reliability);
    sanitize_weight(type_weight) * sanitize_weight(reliability)
  }

  /// Map a raw signal value onto the 1–5 scale.
  pub fn normalize(&self, signal_key: &str, value: f64) -> f64 {
    match self.saturation.get(signal_key) {
      Some(&at) if at.is_finite() && at > 0.0 => 1.0 + 4.0 * (value.max(0.0) / at).min(1.0),
      _ => clip(value, 1.0, 5.0),
    }
  }
}

/// Negative or non-finite weights count as zero.
fn sanitize_weight(weight: f64) -> f64 {
  if weight.is_finite() { weight.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn saturating_keys_scale_onto_the_range() {
    let weights = ScoringWeights::default();
    assert_eq!(weights.normalize("team_size", 0.0), 1.0);
    assert_eq!(weights.normalize("team_size", 25.0), 3.0);
    assert_eq!(weights.normalize("team_size", 500.0), 5.0);
    assert_eq!(weights.normalize("team_size", -3.0), 1.0);
  }

  #[test]
  fn other_keys_are_clamped() {
    let weights = ScoringWeights::default();
    assert_eq!(weights.normalize("robotics", 3.5), 3.5);
    assert_eq!(weights.normalize("robotics", 9.0), 5.0);
    assert_eq!(weights.normalize("robotics", 0.0), 1.0);
  }

  #[test]
  fn unknown_sources_use_the_default_reliability() {
    let weights = ScoringWeights::default();
    assert_eq!(weights.signal_weight(kinds::TEAM_METRIC, "manual_dd"), 1.0);
    assert_eq!(weights.signal_weight(kinds::TEAM_METRIC, "carrier_pigeon"), 0.5);
  }

  #[test]
  fn partial_tables_fill_in_defaults() {
    let weights: ScoringWeights =
      serde_json::from_str(r#"{ "default_reliability": 0.7 }"#).unwrap();
    assert_eq!(weights.default_reliability, 0.7);
    assert_eq!(weights.dimension_weight(Dimension::TechDepth), 0.30);
    assert_eq!(weights.dimension_for(kinds::MARKET_METRIC), Some(Dimension::MarketOpportunity));
  }

  #[test]
  fn metric_weights_deserialize_by_name() {
    let weights: ScoringWeights = serde_json::from_str(
      r#"{ "metrics": { "actionability_0_6m": { "maturity": 1.0 } } }"#,
    )
    .unwrap();
    let actionability = &weights.metrics[&Metric::Actionability];
    assert_eq!(actionability.get(&Dimension::Maturity), Some(&1.0));
    assert!(!weights.metrics.contains_key(&Metric::SupportFit));
  }
}
