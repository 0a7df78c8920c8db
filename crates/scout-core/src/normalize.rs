//! Identity normalization: the folding rules that make differently-spelled
//! records resolve to one canonical key.

use serde::{Deserialize, Serialize};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use url::Url;

/// Legal-entity suffixes dropped from the end of a folded name. Multi-token
/// entries are matched token by token ("e.V." folds to `e v`).
const LEGAL_SUFFIXES: &[&[&str]] = &[
  &["e", "v"],
  &["ev"],
  &["gmbh"],
  &["ggmbh"],
  &["mbh"],
  &["ug"],
  &["ag"],
  &["kg"],
  &["gbr"],
  &["ltd"],
  &["llc"],
  &["inc"],
  &["haftungsbeschrankt"],
];

/// Fold a display name to its identity form: diacritics removed, lowercased,
/// punctuation collapsed to single spaces, trailing legal suffixes stripped.
/// Letters and digits of any script are kept.
///
/// A name consisting only of a suffix keeps it rather than folding to empty.
pub fn normalize_name(value: &str) -> String {
  let folded: String = value
    .replace('ß', "ss")
    .nfkd()
    .filter(|c| !is_combining_mark(*c))
    .collect::<String>()
    .to_lowercase();

  let spaced: String = folded
    .chars()
    .map(|c| if c.is_alphanumeric() { c } else { ' ' })
    .collect();

  let mut tokens: Vec<&str> = spaced.split_whitespace().collect();
  'strip: loop {
    for suffix in LEGAL_SUFFIXES {
      if tokens.len() > suffix.len() && tokens.ends_with(suffix) {
        tokens.truncate(tokens.len() - suffix.len());
        continue 'strip;
      }
    }
    break;
  }

  tokens.join(" ")
}

/// Canonical form of a URL: lowercase scheme and host, no query or fragment,
/// no trailing slash. Empty input yields an empty string; unparseable input
/// is lowercased and trimmed rather than rejected.
pub fn canonicalize_url(raw: &str) -> String {
  let candidate = raw.trim();
  if candidate.is_empty() {
    return String::new();
  }

  let with_scheme = if candidate.contains("://") {
    candidate.to_owned()
  } else {
    format!("https://{candidate}")
  };

  let Ok(parsed) = Url::parse(&with_scheme) else {
    return candidate.trim_end_matches('/').to_lowercase();
  };

  let host = parsed.host_str().unwrap_or_default().to_lowercase();
  let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();
  let path = parsed.path().trim_end_matches('/');
  format!("{}://{host}{port}{path}", parsed.scheme())
}

/// Case-insensitive, order-preserving de-duplication; blank entries dropped.
pub fn unique_list<I, S>(items: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let mut seen = std::collections::HashSet::new();
  let mut out = Vec::new();
  for item in items {
    let trimmed = item.as_ref().trim();
    if trimmed.is_empty() {
      continue;
    }
    if seen.insert(trimmed.to_lowercase()) {
      out.push(trimmed.to_owned());
    }
  }
  out
}

/// Union of two set-valued fields, existing entries first.
pub fn union_list(existing: &[String], incoming: &[String]) -> Vec<String> {
  unique_list(existing.iter().chain(incoming))
}

/// The key under which an initiative is unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
  pub name: String,
  /// Canonical primary URL, or empty when unknown.
  pub url:  String,
}

impl IdentityKey {
  pub fn new(name: &str, url: Option<&str>) -> Self {
    Self {
      name: normalize_name(name),
      url:  url.map(canonicalize_url).unwrap_or_default(),
    }
  }

  /// Two keys denote the same entity when the names agree and the URLs do not
  /// contradict each other (equal, or at least one side unknown).
  pub fn matches(&self, other: &IdentityKey) -> bool {
    self.name == other.name
      && (self.url == other.url || self.url.is_empty() || other.url.is_empty())
  }
}

// ─── Fuzzy fallback ──────────────────────────────────────────────────────────

/// Similarity at which an initiative at the same university is the same
/// entity despite a differently folded name.
pub const SAME_UNIVERSITY_SIMILARITY: f64 = 0.95;

/// Similarity at which any two initiatives are the same entity.
pub const GLOBAL_SIMILARITY: f64 = 0.97;

/// Levenshtein similarity of two folded names in `[0, 1]`, normalized by the
/// longer name.
pub fn name_similarity(a: &str, b: &str) -> f64 { strsim::normalized_levenshtein(a, b) }

/// A stored initiative as seen by [`fuzzy_match`].
#[derive(Debug, Clone)]
pub struct Candidate {
  pub id:         i64,
  pub name:       String,
  pub university: String,
  pub url:        String,
}

/// Pick the stored initiative a near-miss name resolves to.
///
/// The most similar candidate at the same university wins if it reaches
/// [`SAME_UNIVERSITY_SIMILARITY`]; otherwise the lowest-id candidate anywhere
/// reaching [`GLOBAL_SIMILARITY`]. Candidates whose URL contradicts the key
/// are never considered. `candidates` are expected in id order.
pub fn fuzzy_match(key: &IdentityKey, university: &str, candidates: &[Candidate]) -> Option<i64> {
  if key.name.is_empty() {
    return None;
  }
  let compatible = candidates
    .iter()
    .filter(|c| key.url.is_empty() || c.url.is_empty() || c.url == key.url);

  let mut best: Option<(f64, i64)> = None;
  for c in compatible.clone().filter(|c| c.university == university) {
    let similarity = name_similarity(&key.name, &c.name);
    if best.is_none_or(|(top, _)| similarity > top) {
      best = Some((similarity, c.id));
    }
  }
  if let Some((similarity, id)) = best
    && similarity >= SAME_UNIVERSITY_SIMILARITY
  {
    return Some(id);
  }

  compatible
    .into_iter()
    .find(|c| name_similarity(&key.name, &c.name) >= GLOBAL_SIMILARITY)
    .map(|c| c.id)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn diacritics_and_suffix_variants_fold_together() {
    assert_eq!(normalize_name("Akaflieg München e.V."), "akaflieg munchen");
    assert_eq!(normalize_name("Akaflieg Munchen e.V"), "akaflieg munchen");
    assert_eq!(normalize_name("  AKAFLIEG   münchen  "), "akaflieg munchen");
  }

  #[test]
  fn strips_stacked_suffixes_but_never_to_empty() {
    assert_eq!(normalize_name("Rocket Labs GmbH & Co. KG"), "rocket labs gmbh co");
    assert_eq!(normalize_name("Acme UG (haftungsbeschränkt)"), "acme");
    assert_eq!(normalize_name("GmbH"), "gmbh");
  }

  #[test]
  fn non_latin_names_keep_their_letters() {
    assert_eq!(normalize_name("Технопарк МГУ"), "технопарк мгу");
    assert_eq!(normalize_name("東京大学 ロケット部"), "東京大学 ロケット部");
    assert_eq!(normalize_name("Ｒｏｂｏ　Ｃｌｕｂ"), "robo club");
    assert_eq!(normalize_name("!!! ---"), "");
  }

  #[test]
  fn sharp_s_folds_to_ss() {
    assert_eq!(normalize_name("Straße Robotik"), "strasse robotik");
  }

  #[test]
  fn url_trailing_slash_and_case_are_ignored() {
    assert_eq!(
      canonicalize_url("https://www.Akaflieg.example/"),
      canonicalize_url("HTTPS://www.akaflieg.example")
    );
    assert_eq!(canonicalize_url("https://www.akaflieg.example/"), "https://www.akaflieg.example");
  }

  #[test]
  fn url_without_scheme_gets_https_and_loses_query() {
    assert_eq!(canonicalize_url("www.team.example/about/?utm=x#top"), "https://www.team.example/about");
    assert_eq!(canonicalize_url("http://team.example:8080/"), "http://team.example:8080");
    assert_eq!(canonicalize_url("   "), "");
  }

  #[test]
  fn unique_list_is_case_insensitive_and_ordered() {
    let out = unique_list(["AI", "robotics", "ai", " ", "Robotics", "space"]);
    assert_eq!(out, vec!["AI", "robotics", "space"]);
  }

  fn candidate(id: i64, name: &str, university: &str, url: &str) -> Candidate {
    Candidate {
      id,
      name: normalize_name(name),
      university: university.into(),
      url: url.into(),
    }
  }

  #[test]
  fn fuzzy_match_within_university_uses_lower_threshold() {
    // One edit in 25 characters: 0.96.
    let stored = [candidate(1, "TUM Autonomous Racing Lab", "TUM", "")];
    let key = IdentityKey::new("TUM Autonomus Racing Lab", None);
    assert!(name_similarity(&key.name, &stored[0].name) >= SAME_UNIVERSITY_SIMILARITY);
    assert!(name_similarity(&key.name, &stored[0].name) < GLOBAL_SIMILARITY);

    assert_eq!(fuzzy_match(&key, "TUM", &stored), Some(1));
    assert_eq!(fuzzy_match(&key, "LMU", &stored), None);
  }

  #[test]
  fn fuzzy_match_across_universities_needs_global_threshold() {
    // One edit in 40 characters: 0.975.
    let stored = [
      candidate(1, "Rocket Team", "LMU", ""),
      candidate(2, "Technical University Robotics Laboratory", "TUM", ""),
    ];
    let key = IdentityKey::new("Technical University Robotic Laboratory", None);
    assert_eq!(fuzzy_match(&key, "", &stored), Some(2));

    let far = IdentityKey::new("Technical University Robotic Lab", None);
    assert_eq!(fuzzy_match(&far, "", &stored), None);
  }

  #[test]
  fn fuzzy_match_prefers_the_closest_name_and_respects_urls() {
    let stored = [
      candidate(1, "Munich Formula Student Team Alpha", "TUM", "https://a.example"),
      candidate(2, "Munich Formula Student Team Alpah", "TUM", ""),
    ];
    let key = IdentityKey::new("Munich Formula Student Team Alph", Some("https://b.example"));
    assert_eq!(fuzzy_match(&key, "TUM", &stored), Some(2));

    let exact = IdentityKey::new("Munich Formula Student Team Alpha", Some("https://c.example"));
    assert_eq!(fuzzy_match(&exact, "TUM", &stored[..1]), None);
  }

  #[test]
  fn identity_keys_tolerate_missing_url() {
    let a = IdentityKey::new("Akaflieg München e.V.", Some("https://www.akaflieg.example/"));
    let b = IdentityKey::new("Akaflieg Munchen e.V", None);
    let c = IdentityKey::new("Akaflieg Munchen", Some("https://other.example"));
    assert!(a.matches(&b));
    assert!(!a.matches(&c));
  }
}
