//! Persisted score rows and their explainability breakdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ─── Dimensions ──────────────────────────────────────────────────────────────

/// The four base scoring dimensions, each in `[1.0, 5.0]`.
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
pub enum Dimension {
  TechDepth,
  MarketOpportunity,
  TeamStrength,
  Maturity,
}

/// Second-order metrics derived from the base dimensions.
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
pub enum Metric {
  #[serde(rename = "actionability_0_6m")]
  #[strum(serialize = "actionability_0_6m")]
  Actionability,
  #[serde(rename = "support_fit")]
  #[strum(serialize = "support_fit")]
  SupportFit,
  #[serde(rename = "outreach_now_score")]
  #[strum(serialize = "outreach_now_score")]
  OutreachNow,
  #[serde(rename = "venture_upside_score")]
  #[strum(serialize = "venture_upside_score")]
  VentureUpside,
}

/// A bounded value with its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rated {
  pub value:      f64,
  pub confidence: f64,
}

impl Rated {
  /// The value of a dimension with no evidence.
  pub const FLOOR: Rated = Rated { value: 1.0, confidence: 0.0 };
}

// ─── Score ───────────────────────────────────────────────────────────────────

/// Score values for one initiative, as computed by a scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreValues {
  pub tech_depth:               f64,
  pub market_opportunity:       f64,
  pub team_strength:            f64,
  pub maturity:                 f64,
  pub composite_score:          f64,
  pub confidence_tech:          f64,
  pub confidence_market:        f64,
  pub confidence_team:          f64,
  pub confidence_maturity:      f64,
  pub actionability_0_6m:       f64,
  pub support_fit:              f64,
  pub outreach_now_score:       f64,
  pub venture_upside_score:     f64,
  pub confidence_actionability: f64,
  pub confidence_support_fit:   f64,
}

impl ScoreValues {
  pub fn dimension(&self, dimension: Dimension) -> Rated {
    let (value, confidence) = match dimension {
      Dimension::TechDepth => (self.tech_depth, self.confidence_tech),
      Dimension::MarketOpportunity => (self.market_opportunity, self.confidence_market),
      Dimension::TeamStrength => (self.team_strength, self.confidence_team),
      Dimension::Maturity => (self.maturity, self.confidence_maturity),
    };
    Rated { value, confidence }
  }

  pub fn metric(&self, metric: Metric) -> f64 {
    match metric {
      Metric::Actionability => self.actionability_0_6m,
      Metric::SupportFit => self.support_fit,
      Metric::OutreachNow => self.outreach_now_score,
      Metric::VentureUpside => self.venture_upside_score,
    }
  }
}

/// The single persisted score row for an initiative; replaced on every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
  pub id:            i64,
  pub initiative_id: i64,
  #[serde(flatten)]
  pub values:        ScoreValues,
  pub scored_at:     DateTime<Utc>,
}

// ─── Breakdown ───────────────────────────────────────────────────────────────

/// Whether a component summarizes raw signals or other dimensions.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Provenance {
  Signal,
  Derived,
}

/// One weighted contribution to a dimension or metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentValues {
  /// A [`Dimension`] or [`Metric`] name.
  pub dimension:             String,
  /// The signal key, or the input dimension for derived metrics.
  pub component_key:         String,
  pub raw_value:             f64,
  pub normalized_value:      f64,
  /// Share of the dimension's total weight, in `[0, 1]`.
  pub weight:                f64,
  pub weighted_contribution: f64,
  pub confidence:            f64,
  pub evidence_count:        usize,
  pub source_mix:            Vec<String>,
  pub provenance:            Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
  pub id:            i64,
  pub score_id:      i64,
  pub initiative_id: i64,
  #[serde(flatten)]
  pub values:        ComponentValues,
}

/// Link from a component back to the signal it summarizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceValues {
  pub signal_id:   i64,
  pub signal_type: String,
  pub signal_key:  String,
  pub value:       f64,
  pub source_url:  String,
  pub snippet:     String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEvidence {
  pub id:                 i64,
  pub score_component_id: i64,
  pub initiative_id:      i64,
  #[serde(flatten)]
  pub values:             EvidenceValues,
}

/// A component together with the evidence it cites.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDraft {
  pub component: ComponentValues,
  pub evidence:  Vec<EvidenceValues>,
}

/// Everything one scoring pass writes for one initiative. Input to
/// [`crate::store::ScoutStore::replace_score`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSheet {
  pub initiative_id: i64,
  pub values:        ScoreValues,
  pub components:    Vec<ComponentDraft>,
}
