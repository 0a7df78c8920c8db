//! Comparative tiering of dossier scores.
//!
//! Every initiative with a stored dossier score is placed in a tier from its
//! composite score and confidence, ranked against the rest of the pool by
//! percentile, and compared with the tier it held on the previous pass.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::dossier::{Classification, DossierDimension, DossierScore};

/// A dimension confidence below this counts as missing evidence.
pub const LOW_CONFIDENCE: f64 = 0.10;

/// This many low-confidence dimensions put an initiative in [`Tier::X`].
pub const INSUFFICIENT_DIMENSIONS: usize = 4;

/// Classifications that can rank no better than [`Tier::B`].
pub const CAPPED_CLASSIFICATIONS: &[Classification] =
  &[Classification::StudentClub, Classification::Dormant];

// ─── Tiers ───────────────────────────────────────────────────────────────────

/// Tiers from best to worst. `X` holds initiatives with too little evidence
/// to tier at all.
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
pub enum Tier {
  S,
  A,
  B,
  C,
  X,
}

impl Tier {
  /// Minimum `(composite, confidence)` to reach this tier.
  pub fn threshold(self) -> Option<(f64, f64)> {
    match self {
      Self::S => Some((3.8, 0.5)),
      Self::A => Some((3.2, 0.35)),
      Self::B => Some((2.5, 0.25)),
      Self::C => Some((0.0, 0.0)),
      Self::X => None,
    }
  }
}

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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TierChange {
  New,
  Stable,
  Upgraded,
  Downgraded,
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// Pool-wide counts shared by every row of one tiering pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortStats {
  pub pool_size:                   usize,
  pub tier_distribution:           BTreeMap<Tier, usize>,
  pub university_breakdown:        BTreeMap<String, BTreeMap<Tier, usize>>,
  pub classification_distribution: BTreeMap<String, usize>,
}

/// A tier row before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTier {
  pub initiative_id:         i64,
  pub dossier_score_id:      i64,
  pub tier:                  Tier,
  pub rationale:             String,
  /// 0–100, one decimal.
  pub composite_percentile:  f64,
  pub dimension_percentiles: BTreeMap<DossierDimension, f64>,
  pub previous_tier:         Option<Tier>,
  pub change:                TierChange,
  pub change_reason:         String,
  pub cohort:                CohortStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiativeTier {
  pub id:        i64,
  #[serde(flatten)]
  pub row:       NewTier,
  pub tiered_at: DateTime<Utc>,
}

/// A stored dossier score together with its initiative's university.
#[derive(Debug, Clone, Copy)]
pub struct TierInput<'a> {
  pub score:      &'a DossierScore,
  pub university: &'a str,
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// Place one initiative in a tier and explain why.
pub fn assign_tier(
  composite: f64,
  confidence: f64,
  classification: Classification,
  low_confidence_dims: usize,
) -> (Tier, String) {
  if low_confidence_dims >= INSUFFICIENT_DIMENSIONS {
    return (Tier::X, "Insufficient data: low confidence on 4+ dimensions".to_owned());
  }

  let capped = CAPPED_CLASSIFICATIONS.contains(&classification);
  for tier in Tier::iter() {
    let Some((min_composite, min_confidence)) = tier.threshold() else {
      continue;
    };
    if composite < min_composite || confidence < min_confidence {
      continue;
    }
    if capped && tier < Tier::B {
      return (Tier::B, format!("Capped at B due to {classification} classification"));
    }
    let mut rationale = format!(
      "Composite {composite:.2} >= {min_composite:.1}, confidence {confidence:.2} >= \
       {min_confidence:.2}"
    );
    if tier == Tier::S {
      rationale.push_str(&format!("; classification: {classification}"));
    }
    return (tier, rationale);
  }

  (Tier::C, format!("Composite {composite:.2} below all thresholds"))
}

/// Percentile of `value` within `values`: values below count fully, equal
/// values count half. Empty pools give 0.
pub fn percentile_rank(values: &[f64], value: f64) -> f64 {
  if values.is_empty() {
    return 0.0;
  }
  let below = values.iter().filter(|v| **v < value).count() as f64;
  let equal = values.iter().filter(|v| **v == value).count() as f64;
  let pct = (below + 0.5 * equal) / values.len() as f64 * 100.0;
  (pct * 10.0).round() / 10.0
}

/// Movement from the previous pass. A lower letter is a better tier.
pub fn tier_change(previous: Option<Tier>, current: Tier) -> (TierChange, String) {
  match previous {
    None => (TierChange::New, "First scoring".to_owned()),
    Some(prev) if prev == current => (TierChange::Stable, String::new()),
    Some(prev) if current < prev => {
      (TierChange::Upgraded, format!("Improved from {prev} to {current}"))
    }
    Some(prev) => (TierChange::Downgraded, format!("Declined from {prev} to {current}")),
  }
}

fn dimension_score(score: &DossierScore, dim: DossierDimension) -> f64 {
  score.dossier.dimensions.get(&dim).map_or(0.0, |a| a.score)
}

fn low_confidence_dims(score: &DossierScore) -> usize {
  DossierDimension::iter()
    .filter(|d| {
      score.dossier.dimensions.get(d).is_none_or(|a| a.confidence < LOW_CONFIDENCE)
    })
    .count()
}

// ─── Pass ────────────────────────────────────────────────────────────────────

/// Tier the whole pool. Rows come out in input order; `previous` maps
/// initiative ids to the tier each held before this pass.
pub fn build_tiers(inputs: &[TierInput<'_>], previous: &BTreeMap<i64, Tier>) -> Vec<NewTier> {
  let composites: Vec<f64> = inputs.iter().map(|i| i.score.dossier.composite_score).collect();
  let pools: BTreeMap<DossierDimension, Vec<f64>> = DossierDimension::iter()
    .map(|d| (d, inputs.iter().map(|i| dimension_score(i.score, d)).collect()))
    .collect();

  let mut cohort = CohortStats { pool_size: inputs.len(), ..CohortStats::default() };
  let mut rows: Vec<NewTier> = inputs
    .iter()
    .map(|input| {
      let dossier = &input.score.dossier;
      let (tier, rationale) = assign_tier(
        dossier.composite_score,
        dossier.composite_confidence,
        dossier.classification,
        low_confidence_dims(input.score),
      );
      let previous_tier = previous.get(&input.score.initiative_id).copied();
      let (change, change_reason) = tier_change(previous_tier, tier);

      let university = if input.university.trim().is_empty() {
        "Unknown".to_owned()
      } else {
        input.university.to_owned()
      };
      *cohort.tier_distribution.entry(tier).or_default() += 1;
      *cohort.university_breakdown.entry(university).or_default().entry(tier).or_default() += 1;
      *cohort
        .classification_distribution
        .entry(dossier.classification.to_string())
        .or_default() += 1;

      NewTier {
        initiative_id: input.score.initiative_id,
        dossier_score_id: input.score.id,
        tier,
        rationale,
        composite_percentile: percentile_rank(&composites, dossier.composite_score),
        dimension_percentiles: pools
          .iter()
          .map(|(d, pool)| (*d, percentile_rank(pool, dimension_score(input.score, *d))))
          .collect(),
        previous_tier,
        change,
        change_reason,
        cohort: CohortStats::default(),
      }
    })
    .collect();

  for row in &mut rows {
    row.cohort = cohort.clone();
  }
  rows
}

#[cfg(test)]
mod tests {
  use crate::dossier::{DimensionAssessment, ValidatedDossier};

  use super::*;

  fn assessment(score: f64, confidence: f64) -> DimensionAssessment {
    DimensionAssessment {
      score,
      confidence,
      reasoning: String::new(),
      key_evidence: vec![],
      data_gaps: vec![],
    }
  }

  fn dossier_score(
    id: i64,
    composite: f64,
    confidence: f64,
    classification: Classification,
  ) -> DossierScore {
    DossierScore {
      id,
      initiative_id: id,
      dossier_hash: format!("hash-{id}"),
      dossier: ValidatedDossier {
        initiative_summary:   String::new(),
        classification,
        dimensions:           DossierDimension::iter()
          .map(|d| (d, assessment(composite, confidence)))
          .collect(),
        overall_assessment:   String::new(),
        recommended_action:   Default::default(),
        engagement_hook:      String::new(),
        composite_score:      composite,
        composite_confidence: confidence,
      },
      scored_at: Utc::now(),
    }
  }

  #[test]
  fn each_threshold_is_inclusive() {
    let team = Classification::DeepTechTeam;
    assert_eq!(assign_tier(3.8, 0.5, team, 0).0, Tier::S);
    assert_eq!(assign_tier(3.79, 0.5, team, 0).0, Tier::A);
    assert_eq!(assign_tier(3.8, 0.49, team, 0).0, Tier::A);
    assert_eq!(assign_tier(3.2, 0.35, team, 0).0, Tier::A);
    assert_eq!(assign_tier(3.19, 0.35, team, 0).0, Tier::B);
    assert_eq!(assign_tier(3.2, 0.34, team, 0).0, Tier::B);
    assert_eq!(assign_tier(2.5, 0.25, team, 0).0, Tier::B);
    assert_eq!(assign_tier(2.49, 0.25, team, 0).0, Tier::C);
    assert_eq!(assign_tier(4.9, 0.24, team, 0).0, Tier::C);
    assert_eq!(assign_tier(0.0, 0.0, team, 0).0, Tier::C);
  }

  #[test]
  fn s_tier_rationale_names_the_classification() {
    let (tier, rationale) = assign_tier(4.0, 0.8, Classification::StudentVenture, 0);
    assert_eq!(tier, Tier::S);
    assert!(rationale.contains("classification: student_venture"), "{rationale}");
  }

  #[test]
  fn clubs_and_dormant_initiatives_cap_at_b() {
    for classification in [Classification::StudentClub, Classification::Dormant] {
      let (tier, rationale) = assign_tier(4.5, 0.9, classification, 0);
      assert_eq!(tier, Tier::B);
      assert_eq!(rationale, format!("Capped at B due to {classification} classification"));
      assert_eq!(assign_tier(3.3, 0.4, classification, 0).0, Tier::B);
      // Already at or below the cap.
      assert_eq!(assign_tier(2.6, 0.3, classification, 0).0, Tier::B);
      assert_eq!(assign_tier(1.0, 0.1, classification, 0).0, Tier::C);
    }
  }

  #[test]
  fn four_thin_dimensions_mean_insufficient_data() {
    assert_eq!(assign_tier(4.5, 0.9, Classification::DeepTechTeam, 3).0, Tier::S);
    let (tier, rationale) = assign_tier(4.5, 0.9, Classification::DeepTechTeam, 4);
    assert_eq!(tier, Tier::X);
    assert!(rationale.starts_with("Insufficient data"));
  }

  #[test]
  fn percentile_counts_ties_as_half() {
    assert_eq!(percentile_rank(&[], 3.0), 0.0);
    assert_eq!(percentile_rank(&[1.0, 2.0, 3.0, 4.0], 3.0), 62.5);
    assert_eq!(percentile_rank(&[2.0, 2.0, 2.0], 2.0), 50.0);
    assert_eq!(percentile_rank(&[1.0, 2.0, 3.0], 3.0), 83.3);
    assert_eq!(percentile_rank(&[1.0, 2.0, 3.0], 0.5), 0.0);
  }

  #[test]
  fn movement_compares_with_the_previous_tier() {
    assert_eq!(tier_change(None, Tier::B), (TierChange::New, "First scoring".to_owned()));
    assert_eq!(tier_change(Some(Tier::B), Tier::B), (TierChange::Stable, String::new()));
    assert_eq!(
      tier_change(Some(Tier::B), Tier::A),
      (TierChange::Upgraded, "Improved from B to A".to_owned())
    );
    assert_eq!(
      tier_change(Some(Tier::C), Tier::X),
      (TierChange::Downgraded, "Declined from C to X".to_owned())
    );
  }

  #[test]
  fn pool_is_tiered_with_shared_cohort_stats() {
    let strong = dossier_score(1, 4.0, 0.8, Classification::DeepTechTeam);
    let club = dossier_score(2, 4.0, 0.8, Classification::StudentClub);
    let thin = dossier_score(3, 1.0, 0.05, Classification::Unclear);
    let inputs = [
      TierInput { score: &strong, university: "TUM" },
      TierInput { score: &club, university: "TUM" },
      TierInput { score: &thin, university: "" },
    ];
    let previous = BTreeMap::from([(1, Tier::A), (2, Tier::B)]);

    let rows = build_tiers(&inputs, &previous);
    let tiers: Vec<_> = rows.iter().map(|r| (r.initiative_id, r.tier, r.change)).collect();
    assert_eq!(tiers, vec![
      (1, Tier::S, TierChange::Upgraded),
      (2, Tier::B, TierChange::Stable),
      (3, Tier::X, TierChange::New),
    ]);

    assert_eq!(rows[0].composite_percentile, 66.7);
    assert_eq!(rows[2].composite_percentile, 16.7);
    assert_eq!(rows[0].dimension_percentiles[&DossierDimension::TeamCapability], 66.7);
    assert_eq!(rows[0].dimension_percentiles.len(), 6);

    let cohort = &rows[0].cohort;
    assert_eq!(cohort.pool_size, 3);
    assert_eq!(cohort.tier_distribution[&Tier::S], 1);
    assert_eq!(cohort.university_breakdown["TUM"][&Tier::B], 1);
    assert_eq!(cohort.university_breakdown["Unknown"][&Tier::X], 1);
    assert_eq!(cohort.classification_distribution["student_club"], 1);
    assert!(rows.iter().all(|r| r.cohort == *cohort));
  }
}
