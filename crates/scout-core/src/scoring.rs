//! The scoring engine: turns an initiative's signals into bounded dimension
//! scores, derived metrics and an explainable breakdown.
//!
//! Everything here is pure. Persistence lives behind
//! [`crate::store::ScoutStore::replace_score`].

use std::collections::{BTreeMap, BTreeSet};

use strum::IntoEnumIterator;

use crate::{
  clip,
  config::ScoringWeights,
  score::{
    ComponentDraft, ComponentValues, Dimension, EvidenceValues, Metric, Provenance, Rated,
    ScoreSheet, ScoreValues,
  },
  signal::Signal,
};

/// Label used for signals without a `source_type`.
const UNKNOWN_SOURCE: &str = "unknown";

/// Confidence from evidence volume and source diversity.
///
/// Grows with the number of signals (`n / (n + 2)`) and is scaled by how many
/// distinct sources back them, saturating at three.
pub fn evidence_confidence(count: usize, distinct_sources: usize) -> f64 {
  if count == 0 {
    return 0.0;
  }
  let n = count as f64;
  let diversity = distinct_sources.clamp(1, 3) as f64 / 3.0;
  clip(n / (n + 2.0) * (0.6 + 0.4 * diversity), 0.0, 1.0)
}

/// Score one initiative from its full signal set.
pub fn score_signals(
  initiative_id: i64,
  signals: &[Signal],
  weights: &ScoringWeights,
) -> ScoreSheet {
  let mut by_dimension: BTreeMap<Dimension, Vec<&Signal>> = BTreeMap::new();
  for signal in signals {
    if let Some(dimension) = weights.dimension_for(&signal.signal_type) {
      by_dimension.entry(dimension).or_default().push(signal);
    }
  }

  let mut rated = BTreeMap::new();
  let mut components = Vec::new();
  let mut mix: BTreeMap<Dimension, (usize, Vec<String>)> = BTreeMap::new();

  for dimension in Dimension::iter() {
    let matching = by_dimension.remove(&dimension).unwrap_or_default();
    let (value, drafts) = aggregate_dimension(dimension, &matching, weights);
    mix.insert(dimension, (matching.len(), source_mix(&matching)));
    rated.insert(dimension, value);
    components.extend(drafts);
  }

  let mut derived = BTreeMap::new();
  for metric in Metric::iter() {
    let (value, drafts) = derive_metric(metric, &rated, &mix, weights);
    derived.insert(metric, value);
    components.extend(drafts);
  }

  let composite_score = composite(&rated, weights);

  let get = |d: Dimension| rated.get(&d).copied().unwrap_or(Rated::FLOOR);
  let metric = |m: Metric| derived.get(&m).copied().unwrap_or(Rated::FLOOR);

  let values = ScoreValues {
    tech_depth: get(Dimension::TechDepth).value,
    market_opportunity: get(Dimension::MarketOpportunity).value,
    team_strength: get(Dimension::TeamStrength).value,
    maturity: get(Dimension::Maturity).value,
    composite_score,
    confidence_tech: get(Dimension::TechDepth).confidence,
    confidence_market: get(Dimension::MarketOpportunity).confidence,
    confidence_team: get(Dimension::TeamStrength).confidence,
    confidence_maturity: get(Dimension::Maturity).confidence,
    actionability_0_6m: metric(Metric::Actionability).value,
    support_fit: metric(Metric::SupportFit).value,
    outreach_now_score: metric(Metric::OutreachNow).value,
    venture_upside_score: metric(Metric::VentureUpside).value,
    confidence_actionability: metric(Metric::Actionability).confidence,
    confidence_support_fit: metric(Metric::SupportFit).confidence,
  };

  ScoreSheet { initiative_id, values, components }
}

/// Confidence-weighted mean of the base dimensions; 0.0 when nothing applies.
pub fn composite(rated: &BTreeMap<Dimension, Rated>, weights: &ScoringWeights) -> f64 {
  let mut numerator = 0.0;
  let mut denominator = 0.0;
  for (dimension, r) in rated {
    let applied = weights.dimension_weight(*dimension) * r.confidence;
    numerator += applied * r.value;
    denominator += applied;
  }
  if denominator > 0.0 { numerator / denominator } else { 0.0 }
}

// ─── Base dimensions ─────────────────────────────────────────────────────────

fn aggregate_dimension(
  dimension: Dimension,
  signals: &[&Signal],
  weights: &ScoringWeights,
) -> (Rated, Vec<ComponentDraft>) {
  if signals.is_empty() {
    return (Rated::FLOOR, Vec::new());
  }

  let weighted: Vec<(&Signal, f64, f64)> = signals
    .iter()
    .map(|s| {
      let normalized = weights.normalize(&s.signal_key, s.value);
      let weight = weights.signal_weight(&s.signal_type, &s.source_type);
      (*s, normalized, weight)
    })
    .collect();

  let total_weight: f64 = weighted.iter().map(|(_, _, w)| w).sum();
  if total_weight <= 0.0 {
    return (Rated::FLOOR, Vec::new());
  }

  let value = clip(
    weighted.iter().map(|(_, n, w)| n * w).sum::<f64>() / total_weight,
    1.0,
    5.0,
  );
  let confidence = evidence_confidence(signals.len(), distinct_sources(signals));

  let mut by_key: BTreeMap<&str, Vec<(&Signal, f64, f64)>> = BTreeMap::new();
  for entry in &weighted {
    by_key.entry(entry.0.signal_key.as_str()).or_default().push(*entry);
  }

  let drafts = by_key
    .into_iter()
    .map(|(key, group)| {
      let key_weight: f64 = group.iter().map(|(_, _, w)| w).sum();
      let raw_value = group.iter().map(|(s, _, _)| s.value).sum::<f64>() / group.len() as f64;
      let normalized_value = if key_weight > 0.0 {
        group.iter().map(|(_, n, w)| n * w).sum::<f64>() / key_weight
      } else {
        group.iter().map(|(_, n, _)| n).sum::<f64>() / group.len() as f64
      };
      let share = key_weight / total_weight;
      let members: Vec<&Signal> = group.iter().map(|(s, _, _)| *s).collect();

      ComponentDraft {
        component: ComponentValues {
          dimension: dimension.to_string(),
          component_key: key.to_owned(),
          raw_value,
          normalized_value,
          weight: share,
          weighted_contribution: share * normalized_value,
          confidence: evidence_confidence(members.len(), distinct_sources(&members)),
          evidence_count: members.len(),
          source_mix: source_mix(&members),
          provenance: Provenance::Signal,
        },
        evidence: members.iter().map(|s| evidence_for(s)).collect(),
      }
    })
    .collect();

  (Rated { value, confidence }, drafts)
}

fn evidence_for(signal: &Signal) -> EvidenceValues {
  EvidenceValues {
    signal_id:   signal.id,
    signal_type: signal.signal_type.clone(),
    signal_key:  signal.signal_key.clone(),
    value:       signal.value,
    source_url:  signal.source_url.clone(),
    snippet:     signal.evidence_text.chars().take(280).collect(),
  }
}

fn source_label(signal: &Signal) -> &str {
  if signal.source_type.is_empty() { UNKNOWN_SOURCE } else { &signal.source_type }
}

fn distinct_sources(signals: &[&Signal]) -> usize {
  signals.iter().map(|s| source_label(s)).collect::<BTreeSet<_>>().len()
}

fn source_mix(signals: &[&Signal]) -> Vec<String> {
  signals
    .iter()
    .map(|s| source_label(s))
    .collect::<BTreeSet<_>>()
    .into_iter()
    .map(str::to_owned)
    .collect()
}

// ─── Derived metrics ─────────────────────────────────────────────────────────

/// A derived metric is the weighted mean of its input dimensions, pulled
/// toward the floor when those inputs are uncertain.
fn derive_metric(
  metric: Metric,
  rated: &BTreeMap<Dimension, Rated>,
  mix: &BTreeMap<Dimension, (usize, Vec<String>)>,
  weights: &ScoringWeights,
) -> (Rated, Vec<ComponentDraft>) {
  let Some(inputs) = weights.metrics.get(&metric) else {
    return (Rated::FLOOR, Vec::new());
  };

  let applied: Vec<(Dimension, f64, Rated)> = inputs
    .iter()
    .map(|(d, w)| {
      let w = if w.is_finite() { w.max(0.0) } else { 0.0 };
      (*d, w, rated.get(d).copied().unwrap_or(Rated::FLOOR))
    })
    .filter(|(_, w, _)| *w > 0.0)
    .collect();

  let total: f64 = applied.iter().map(|(_, w, _)| w).sum();
  if total <= 0.0 {
    return (Rated::FLOOR, Vec::new());
  }

  let raw = applied.iter().map(|(_, w, r)| w * r.value).sum::<f64>() / total;
  let confidence = clip(
    applied.iter().map(|(_, w, r)| w * r.confidence).sum::<f64>() / total,
    0.0,
    1.0,
  );
  let value = clip(1.0 + (raw - 1.0) * (0.5 + 0.5 * confidence), 1.0, 5.0);

  let drafts = applied
    .iter()
    .map(|(dimension, w, r)| {
      let (count, sources) = mix.get(dimension).cloned().unwrap_or_default();
      let share = w / total;
      ComponentDraft {
        component: ComponentValues {
          dimension: metric.to_string(),
          component_key: dimension.to_string(),
          raw_value: r.value,
          normalized_value: r.value,
          weight: share,
          weighted_contribution: share * r.value,
          confidence: r.confidence,
          evidence_count: count,
          source_mix: sources,
          provenance: Provenance::Derived,
        },
        evidence: Vec::new(),
      }
    })
    .collect();

  (Rated { value, confidence }, drafts)
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::signal::kinds;

  fn signal(id: i64, kind: &str, key: &str, value: f64, source: &str) -> Signal {
    Signal {
      id,
      initiative_id: 1,
      signal_type: kind.to_owned(),
      signal_key: key.to_owned(),
      value,
      evidence_text: format!("{key} observed"),
      source_type: source.to_owned(),
      source_url: String::new(),
      created_at: Utc::now(),
    }
  }

  fn assert_bounded(values: &ScoreValues) {
    for d in Dimension::iter() {
      let r = values.dimension(d);
      assert!((1.0..=5.0).contains(&r.value), "{d} = {}", r.value);
      assert!((0.0..=1.0).contains(&r.confidence), "{d} confidence = {}", r.confidence);
    }
    for m in Metric::iter() {
      assert!((1.0..=5.0).contains(&values.metric(m)), "{m} = {}", values.metric(m));
    }
  }

  #[test]
  fn empty_signal_set_scores_the_floor() {
    let sheet = score_signals(1, &[], &ScoringWeights::default());
    assert_bounded(&sheet.values);
    assert_eq!(sheet.values.tech_depth, 1.0);
    assert_eq!(sheet.values.confidence_tech, 0.0);
    assert_eq!(sheet.values.composite_score, 0.0);
    assert!(sheet.components.is_empty());
  }

  #[test]
  fn aggregation_stays_within_the_input_range() {
    let signals = [
      signal(1, kinds::TECHNOLOGY_DOMAIN, "robotics", 3.0, "seed_markdown"),
      signal(2, kinds::TECHNOLOGY_DOMAIN, "robotics", 5.0, "github_api"),
    ];
    let sheet = score_signals(1, &signals, &ScoringWeights::default());
    assert!((3.0..=5.0).contains(&sheet.values.tech_depth));
    assert_bounded(&sheet.values);
  }

  #[test]
  fn reliable_sources_pull_harder() {
    let signals = [
      signal(1, kinds::TECHNOLOGY_DOMAIN, "robotics", 2.0, "seed_markdown"),
      signal(2, kinds::TECHNOLOGY_DOMAIN, "robotics", 5.0, "manual_dd"),
    ];
    let sheet = score_signals(1, &signals, &ScoringWeights::default());
    // (0.4 * 2 + 1.0 * 5) / 1.4
    assert!((sheet.values.tech_depth - 5.8 / 1.4).abs() < 1e-9);
  }

  #[test]
  fn wild_values_are_bounded() {
    let signals = [
      signal(1, kinds::TEAM_METRIC, "team_size", 10_000.0, "manual_dd"),
      signal(2, kinds::MARKET_METRIC, "commercial_mentions", -40.0, "public_signals"),
      signal(3, kinds::MATURITY_METRIC, "stage", 1e12, ""),
      signal(4, kinds::TECH_METRIC, "papers", -1e12, "github_api"),
    ];
    let sheet = score_signals(1, &signals, &ScoringWeights::default());
    assert_bounded(&sheet.values);
    assert_eq!(sheet.values.team_strength, 5.0);
    assert_eq!(sheet.values.market_opportunity, 1.0);
  }

  #[test]
  fn confidence_grows_with_count_and_diversity() {
    assert_eq!(evidence_confidence(0, 0), 0.0);
    assert!(evidence_confidence(2, 1) > evidence_confidence(1, 1));
    assert!(evidence_confidence(3, 3) > evidence_confidence(3, 1));
    assert!(evidence_confidence(1_000, 10) <= 1.0);
  }

  #[test]
  fn unmapped_signal_types_are_ignored() {
    let signals = [signal(1, kinds::CATEGORY, "robotics", 1.0, "")];
    let sheet = score_signals(1, &signals, &ScoringWeights::default());
    assert!(sheet.components.is_empty());
    assert_eq!(sheet.values.composite_score, 0.0);
  }

  #[test]
  fn components_trace_back_to_signals() {
    let signals = [
      signal(7, kinds::TEAM_METRIC, "commitment_level", 4.0, "manual_dd"),
      signal(8, kinds::TEAM_METRIC, "commitment_level", 3.0, "manual_dd"),
      signal(9, kinds::TEAM_METRIC, "team_size", 25.0, "people_markdown"),
    ];
    let sheet = score_signals(1, &signals, &ScoringWeights::default());

    let team: Vec<_> = sheet
      .components
      .iter()
      .filter(|c| c.component.dimension == "team_strength")
      .collect();
    assert_eq!(team.len(), 2);

    let commitment = team
      .iter()
      .find(|c| c.component.component_key == "commitment_level")
      .unwrap();
    assert_eq!(commitment.component.evidence_count, 2);
    assert_eq!(commitment.component.raw_value, 3.5);
    let ids: Vec<_> = commitment.evidence.iter().map(|e| e.signal_id).collect();
    assert_eq!(ids, [7, 8]);

    let shares: f64 = team.iter().map(|c| c.component.weight).sum();
    assert!((shares - 1.0).abs() < 1e-9);
    let contributions: f64 = team.iter().map(|c| c.component.weighted_contribution).sum();
    assert!((contributions - sheet.values.team_strength).abs() < 1e-9);
  }

  #[test]
  fn derived_metrics_record_their_inputs() {
    let signals = [signal(1, kinds::MATURITY_METRIC, "stage", 4.0, "manual_dd")];
    let sheet = score_signals(1, &signals, &ScoringWeights::default());
    let inputs: Vec<_> = sheet
      .components
      .iter()
      .filter(|c| c.component.dimension == "actionability_0_6m")
      .map(|c| c.component.component_key.as_str())
      .collect();
    assert_eq!(inputs.len(), 3);
    assert!(inputs.contains(&"maturity"));
    assert!(sheet
      .components
      .iter()
      .filter(|c| c.component.provenance == Provenance::Derived)
      .all(|c| c.evidence.is_empty()));
  }

  #[test]
  fn scoring_is_deterministic() {
    let signals = [
      signal(1, kinds::TECHNOLOGY_DOMAIN, "ai", 4.0, "github_api"),
      signal(2, kinds::MARKET_METRIC, "commercial_mentions", 3.0, "public_signals"),
    ];
    let weights = ScoringWeights::default();
    assert_eq!(score_signals(1, &signals, &weights), score_signals(1, &signals, &weights));
  }

  #[test]
  fn composite_ignores_unconfident_dimensions() {
    let signals = [signal(1, kinds::TECHNOLOGY_DOMAIN, "ai", 4.0, "manual_dd")];
    let sheet = score_signals(1, &signals, &ScoringWeights::default());
    assert!((sheet.values.composite_score - 4.0).abs() < 1e-9);
  }
}
