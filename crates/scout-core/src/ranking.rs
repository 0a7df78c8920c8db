//! Ranking engine: deterministic total orders within a ranking partition.
//!
//! Rankings are derived data. A ranking pass builds every partition from
//! scratch here and the store swaps the whole set in one transaction.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
  initiative::Initiative,
  person::Person,
  score::Score,
  talent::TalentScore,
};

/// Initiative ranking partitions and the score column each one orders by.
pub const INITIATIVE_RANKINGS: &[&str] = &[
  "composite",
  "tech_depth",
  "market_opportunity",
  "team_strength",
  "maturity",
  "outreach_targets",
  "venture_upside",
];

pub const TECHNOLOGY_RANKING: &str = "technologies";
pub const MARKET_RANKING: &str = "markets";

// ─── Types ───────────────────────────────────────────────────────────────────

/// Identity of a ranked entity. Ties are broken by ascending key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RankKey {
  Entity(i64),
  Domain(String),
}

impl RankKey {
  pub fn entity_id(&self) -> Option<i64> {
    match self {
      Self::Entity(id) => Some(*id),
      Self::Domain(_) => None,
    }
  }

  pub fn as_key(&self) -> String {
    match self {
      Self::Entity(id) => id.to_string(),
      Self::Domain(domain) => domain.clone(),
    }
  }
}

/// Something to be placed in a ranking.
#[derive(Debug, Clone)]
pub struct Candidate {
  pub key:            RankKey,
  pub name:           String,
  pub score:          f64,
  pub evidence_count: usize,
  pub meta:           Value,
}

/// A ranking row before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRanking {
  pub ranking_type:   String,
  /// Set for initiatives and people; empty for domain rankings.
  pub entity_id:      Option<i64>,
  pub entity_key:     String,
  pub entity_name:    String,
  /// 1-based and unique within `ranking_type`.
  pub rank_position:  usize,
  pub score:          f64,
  pub evidence_count: usize,
  pub meta:           Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
  pub id:           i64,
  #[serde(flatten)]
  pub row:          NewRanking,
  pub generated_at: DateTime<Utc>,
}

/// An initiative with its current score, as fed to the ranking pass.
#[derive(Debug, Clone, Copy)]
pub struct ScoredInitiative<'a> {
  pub initiative:     &'a Initiative,
  pub score:          &'a Score,
  pub evidence_count: usize,
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// Order candidates by score descending, then key ascending, and assign
/// positions from 1. `top_n` keeps only the leading rows.
pub fn rank(
  ranking_type: &str,
  mut candidates: Vec<Candidate>,
  top_n: Option<usize>,
) -> Vec<NewRanking> {
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
  if let Some(n) = top_n {
    candidates.truncate(n);
  }

  candidates
    .into_iter()
    .enumerate()
    .map(|(i, c)| NewRanking {
      ranking_type:   ranking_type.to_owned(),
      entity_id:      c.key.entity_id(),
      entity_key:     c.key.as_key(),
      entity_name:    c.name,
      rank_position:  i + 1,
      score:          c.score,
      evidence_count: c.evidence_count,
      meta:           c.meta,
    })
    .collect()
}

// ─── Partitions ──────────────────────────────────────────────────────────────

/// One partition per scoring axis.
pub fn initiative_rankings(scored: &[ScoredInitiative<'_>], top_n: Option<usize>) -> Vec<NewRanking> {
  INITIATIVE_RANKINGS
    .iter()
    .flat_map(|ranking_type| {
      let candidates = scored
        .iter()
        .map(|s| {
          let v = &s.score.values;
          let score = match *ranking_type {
            "tech_depth" => v.tech_depth,
            "market_opportunity" => v.market_opportunity,
            "team_strength" => v.team_strength,
            "maturity" => v.maturity,
            "outreach_targets" => v.outreach_now_score,
            "venture_upside" => v.venture_upside_score,
            _ => v.composite_score,
          };
          Candidate {
            key: RankKey::Entity(s.initiative.id),
            name: s.initiative.name.clone(),
            score,
            evidence_count: s.evidence_count,
            meta: json!({
              "university": s.initiative.university,
              "status": s.initiative.status,
              "composite_score": v.composite_score,
            }),
          }
        })
        .collect();
      rank(ranking_type, candidates, top_n)
    })
    .collect()
}

/// One partition per talent category, named `talent_<type>`.
pub fn talent_rankings(
  people: &[Person],
  scores: &[TalentScore],
  top_n: Option<usize>,
) -> Vec<NewRanking> {
  let names: BTreeMap<i64, &str> = people.iter().map(|p| (p.id, p.name.as_str())).collect();

  let mut partitions: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
  for score in scores {
    let Some(name) = names.get(&score.person_id) else { continue };
    partitions
      .entry(score.talent_type.ranking_type())
      .or_default()
      .push(Candidate {
        key: RankKey::Entity(score.person_id),
        name: (*name).to_owned(),
        score: score.composite_score,
        evidence_count: score.reasons.len(),
        meta: json!({
          "talent_type": score.talent_type,
          "confidence": score.confidence,
          "reasons": score.reasons,
        }),
      });
  }

  partitions
    .into_iter()
    .flat_map(|(ranking_type, candidates)| rank(&ranking_type, candidates, top_n))
    .collect()
}

/// Technology and market domains ranked by the mean contribution of the
/// initiatives that list them.
pub fn domain_rankings(scored: &[ScoredInitiative<'_>], top_n: Option<usize>) -> Vec<NewRanking> {
  let technologies = aggregate_domains(scored, |s| {
    let v = &s.score.values;
    let strength = 0.5 * v.tech_depth + 0.3 * v.market_opportunity + 0.2 * v.team_strength;
    (&s.initiative.technologies, strength * (0.5 + 0.5 * v.confidence_tech))
  });
  let markets = aggregate_domains(scored, |s| {
    let v = &s.score.values;
    let strength = 0.55 * v.market_opportunity + 0.25 * v.tech_depth + 0.2 * v.team_strength;
    (&s.initiative.markets, strength * (0.5 + 0.5 * v.confidence_market))
  });

  let mut rows = rank(TECHNOLOGY_RANKING, technologies, top_n);
  rows.extend(rank(MARKET_RANKING, markets, top_n));
  rows
}

fn aggregate_domains<'a, F>(scored: &[ScoredInitiative<'a>], contribution: F) -> Vec<Candidate>
where
  F: Fn(&ScoredInitiative<'a>) -> (&'a Vec<String>, f64),
{
  let mut domains: BTreeMap<String, (f64, BTreeSet<String>)> = BTreeMap::new();
  for s in scored {
    let (labels, value) = contribution(s);
    let labels: BTreeSet<String> = labels
      .iter()
      .map(|l| l.trim().to_lowercase())
      .filter(|l| !l.is_empty())
      .collect();
    for label in labels {
      let entry = domains.entry(label).or_default();
      entry.0 += value;
      entry.1.insert(s.initiative.name.clone());
    }
  }

  domains
    .into_iter()
    .map(|(domain, (total, initiatives))| Candidate {
      name: domain.clone(),
      score: total / initiatives.len().max(1) as f64,
      evidence_count: initiatives.len(),
      meta: json!({ "initiatives": initiatives }),
      key: RankKey::Domain(domain),
    })
    .collect()
}
