//! Investment memos: gate results plus scores folded into a decision.
//!
//! Memos are derived artifacts. They carry no timestamps, so regenerating
//! from unchanged inputs yields byte-identical output.

use std::{collections::BTreeMap, fmt::Write as _};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoEnumIterator};

use crate::{
  gate::{DdGate, Gate, GateStatus},
  initiative::Initiative,
  score::{Dimension, Score},
};

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
pub enum Decision {
  Invest,
  Monitor,
  Pass,
}

/// Thresholds used when deciding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoPolicy {
  /// Minimum conviction for an invest decision.
  pub invest_threshold:     f64,
  /// Dimensions below this are reported as risks.
  pub weak_dimension_below: f64,
  /// Dimensions at or above this are reported as strengths.
  pub strong_dimension_at:  f64,
  pub low_confidence_below: f64,
}

impl Default for MemoPolicy {
  fn default() -> Self {
    Self {
      invest_threshold:     3.8,
      weak_dimension_below: 2.5,
      strong_dimension_at:  4.0,
      low_confidence_below: 0.4,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentMemo {
  pub initiative_id:   i64,
  pub initiative_name: String,
  pub decision:        Decision,
  pub rationale:       String,
  pub top_risks:       Vec<String>,
  pub next_actions:    Vec<String>,
  pub strong_in:       Vec<Dimension>,
  pub need_help_in:    Vec<Dimension>,
  pub conviction:      f64,
  pub confidence:      f64,
  /// Every gate A–D; gates never asserted are `pending`.
  pub gate_status:     BTreeMap<Gate, GateStatus>,
}

fn round4(value: f64) -> f64 { (value * 10_000.0).round() / 10_000.0 }

fn join_or_none<T: AsRef<str>>(items: &[T]) -> String {
  if items.is_empty() {
    "none".to_owned()
  } else {
    let parts: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    parts.join(", ")
  }
}

/// Decide on one initiative.
///
/// `invest` needs every gate passing and conviction at the threshold; any
/// failed gate means `pass`; everything else is `monitor`.
pub fn decide(
  initiative: &Initiative,
  score: &Score,
  gates: &[DdGate],
  policy: &MemoPolicy,
) -> InvestmentMemo {
  let mut gate_status: BTreeMap<Gate, GateStatus> =
    Gate::iter().map(|g| (g, GateStatus::Pending)).collect();
  for gate in gates.iter().filter(|g| g.initiative_id == initiative.id) {
    gate_status.insert(gate.gate, gate.status);
  }

  let count = |status| gate_status.values().filter(|s| **s == status).count();
  let (passed, failed, pending) =
    (count(GateStatus::Pass), count(GateStatus::Fail), count(GateStatus::Pending));
  let failing: Vec<&str> = gate_status
    .iter()
    .filter(|(_, s)| **s == GateStatus::Fail)
    .map(|(g, _)| g.as_ref())
    .collect();
  let open: Vec<&str> = gate_status
    .iter()
    .filter(|(_, s)| **s == GateStatus::Pending)
    .map(|(g, _)| g.as_ref())
    .collect();

  let values = &score.values;
  let conviction = round4(values.composite_score);
  let confidence = round4(
    Dimension::iter().map(|d| values.dimension(d).confidence).sum::<f64>() / 4.0,
  );

  let decision = if failed > 0 {
    Decision::Pass
  } else if passed == gate_status.len() && conviction >= policy.invest_threshold {
    Decision::Invest
  } else {
    Decision::Monitor
  };

  let strong_in: Vec<Dimension> = Dimension::iter()
    .filter(|d| values.dimension(*d).value >= policy.strong_dimension_at)
    .collect();
  let need_help_in: Vec<Dimension> = Dimension::iter()
    .filter(|d| values.dimension(*d).value < policy.weak_dimension_below)
    .collect();

  let mut rationale = format!(
    "Conviction {conviction:.2}/5, confidence {confidence:.2}. \
     Gate pass={passed}/{}, fail={failed}, pending={pending}.",
    gate_status.len(),
  );
  if !failing.is_empty() || !open.is_empty() {
    let blocking: Vec<&str> = failing.iter().chain(&open).copied().collect();
    let _ = write!(rationale, " Blocking gates: {}.", blocking.join(", "));
  }

  let mut top_risks = Vec::new();
  if !failing.is_empty() {
    top_risks.push(format!("Failed gates: {}", failing.join(", ")));
  }
  if !open.is_empty() {
    top_risks.push(format!("Unresolved gates: {}", open.join(", ")));
  }
  for d in &need_help_in {
    top_risks.push(format!("Weak {d} ({:.2}/5)", values.dimension(*d).value));
  }
  for d in Dimension::iter() {
    let r = values.dimension(d);
    if r.confidence < policy.low_confidence_below {
      top_risks.push(format!("Thin evidence on {d} (confidence {:.2})", r.confidence));
    }
  }

  let mut next_actions = Vec::new();
  match decision {
    Decision::Invest => {
      next_actions.push("Run founder diligence on technical execution depth".to_owned());
      next_actions.push("Confirm one paying customer path with a named decision owner".to_owned());
      next_actions.push("Agree a 30-day support sprint with concrete outcomes".to_owned());
    }
    Decision::Monitor => {
      if !open.is_empty() {
        next_actions.push(format!("Resolve open gates: {}", open.join(", ")));
      }
      for d in &need_help_in {
        next_actions.push(format!("Collect evidence to lift {d}"));
      }
      if conviction < policy.invest_threshold {
        next_actions.push("Define two milestone proofs, one technical and one commercial".to_owned());
      }
      next_actions.push("Re-score after new evidence is added".to_owned());
    }
    Decision::Pass => {
      next_actions.push(format!("Document blockers for gates {}", failing.join(", ")));
      next_actions.push("Revisit only after the failed gates are resolved".to_owned());
    }
  }

  InvestmentMemo {
    initiative_id: initiative.id,
    initiative_name: initiative.name.clone(),
    decision,
    rationale,
    top_risks,
    next_actions,
    strong_in,
    need_help_in,
    conviction,
    confidence,
    gate_status,
  }
}

/// Render the markdown brief for a set of memos.
pub fn render_brief(memos: &[InvestmentMemo]) -> String {
  let tally = |decision| memos.iter().filter(|m| m.decision == decision).count();

  let mut out = String::from("# Due Diligence Brief\n\n## Summary\n");
  let _ = writeln!(out, "- Memos generated: {}", memos.len());
  let _ = writeln!(out, "- Invest decisions: {}", tally(Decision::Invest));
  let _ = writeln!(out, "- Monitor decisions: {}", tally(Decision::Monitor));
  let _ = writeln!(out, "- Pass decisions: {}", tally(Decision::Pass));
  out.push_str("\n## Recommendations\n");

  for memo in memos {
    let strong: Vec<&str> = memo.strong_in.iter().map(AsRef::as_ref).collect();
    let weak: Vec<&str> = memo.need_help_in.iter().map(AsRef::as_ref).collect();
    let _ = writeln!(
      out,
      "- {}: {} (conviction {:.4}, confidence {:.4})",
      memo.initiative_name, memo.decision, memo.conviction, memo.confidence,
    );
    let _ = writeln!(out, "  - Strong in: {}", join_or_none(&strong));
    let _ = writeln!(out, "  - Need help in: {}", join_or_none(&weak));
    let _ = writeln!(out, "  - Rationale: {}", memo.rationale);
    let _ = writeln!(out, "  - Top risks: {}", join_or_none(&memo.top_risks));
    let _ = writeln!(out, "  - Next actions: {}", join_or_none(&memo.next_actions));
  }
  out
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::{initiative::NewInitiative, score::ScoreValues};

  fn score(composite: f64, confidence: f64) -> Score {
    Score {
      id: 1,
      initiative_id: 1,
      values: ScoreValues {
        tech_depth: 4.5,
        market_opportunity: 4.0,
        team_strength: 3.5,
        maturity: 2.0,
        composite_score: composite,
        confidence_tech: confidence,
        confidence_market: confidence,
        confidence_team: confidence,
        confidence_maturity: confidence,
        actionability_0_6m: 3.0,
        support_fit: 3.0,
        outreach_now_score: 3.0,
        venture_upside_score: 3.0,
        confidence_actionability: confidence,
        confidence_support_fit: confidence,
      },
      scored_at: Utc::now(),
    }
  }

  fn gates(statuses: &[(Gate, GateStatus)]) -> Vec<DdGate> {
    statuses
      .iter()
      .enumerate()
      .map(|(i, (gate, status))| DdGate {
        id: i as i64,
        initiative_id: 1,
        gate: *gate,
        status: *status,
        reason: String::new(),
        evidence: vec![],
        updated_at: Utc::now(),
      })
      .collect()
  }

  fn initiative() -> Initiative {
    NewInitiative::new("Akaflieg München").into_initiative(1, Utc::now())
  }

  fn all_pass() -> Vec<DdGate> {
    gates(&[
      (Gate::A, GateStatus::Pass),
      (Gate::B, GateStatus::Pass),
      (Gate::C, GateStatus::Pass),
      (Gate::D, GateStatus::Pass),
    ])
  }

  #[test]
  fn all_gates_and_high_conviction_invest() {
    let memo = decide(&initiative(), &score(4.1, 0.8), &all_pass(), &MemoPolicy::default());
    assert_eq!(memo.decision, Decision::Invest);
    assert!(memo.rationale.contains("Gate pass=4/4"));
    assert!(!memo.next_actions.is_empty());
    assert_eq!(memo.strong_in, [Dimension::TechDepth, Dimension::MarketOpportunity]);
    assert_eq!(memo.need_help_in, [Dimension::Maturity]);
  }

  #[test]
  fn low_conviction_only_monitors() {
    let memo = decide(&initiative(), &score(3.0, 0.8), &all_pass(), &MemoPolicy::default());
    assert_eq!(memo.decision, Decision::Monitor);
  }

  #[test]
  fn any_failed_gate_passes() {
    let gates = gates(&[(Gate::A, GateStatus::Pass), (Gate::C, GateStatus::Fail)]);
    let memo = decide(&initiative(), &score(4.9, 0.9), &gates, &MemoPolicy::default());
    assert_eq!(memo.decision, Decision::Pass);
    assert!(memo.rationale.contains("Gate pass=1/4, fail=1, pending=2"));
    assert!(memo.top_risks.iter().any(|r| r.contains("Failed gates: C")));
  }

  #[test]
  fn missing_gates_are_pending() {
    let gates = gates(&[(Gate::A, GateStatus::Pass)]);
    let memo = decide(&initiative(), &score(4.5, 0.2), &gates, &MemoPolicy::default());
    assert_eq!(memo.decision, Decision::Monitor);
    assert_eq!(memo.gate_status[&Gate::D], GateStatus::Pending);
    assert!(memo.next_actions[0].contains("B, C, D"));
    assert!(memo.top_risks.iter().any(|r| r.starts_with("Thin evidence")));
  }

  #[test]
  fn brief_lists_every_memo() {
    let policy = MemoPolicy::default();
    let memo = decide(&initiative(), &score(4.1, 0.8), &all_pass(), &policy);
    let brief = render_brief(&[memo.clone()]);
    assert!(brief.starts_with("# Due Diligence Brief"));
    assert!(brief.contains("Akaflieg München: invest"));
    assert!(brief.contains("- Invest decisions: 1"));
    assert_eq!(brief, render_brief(&[memo]));
  }

  #[test]
  fn memos_serialize_gate_letters() {
    let memo = decide(&initiative(), &score(4.1, 0.8), &all_pass(), &MemoPolicy::default());
    let json = serde_json::to_value(&memo).unwrap();
    assert_eq!(json["gate_status"]["A"], "pass");
    assert_eq!(json["decision"], "invest");
  }
}
