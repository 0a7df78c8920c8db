//! People ingest: rosters resolved by name and linked to known initiatives.

use scout_core::{
  person::{NewLink, RawPerson},
  store::ScoutStore,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeopleSummary {
  pub people_upserted:       usize,
  pub people_created:        usize,
  pub links_created:         usize,
  /// Initiative names that did not resolve to a stored initiative.
  pub unmatched_initiatives: Vec<String>,
}

/// Upsert every person and link them to the initiatives they name.
///
/// Initiatives are matched by normalized name; names that match nothing are
/// reported in the summary rather than creating placeholder initiatives.
pub async fn ingest_people<S>(store: &S, records: Vec<RawPerson>) -> Result<PeopleSummary>
where
  S: ScoutStore,
{
  let mut summary = PeopleSummary::default();

  for record in records {
    let source_url = record.person.source_urls.first().cloned().unwrap_or_default();
    let upserted = store.upsert_person(record.person).await.map_err(Error::store)?;
    let person = upserted.entity;
    summary.people_upserted += 1;
    if upserted.created {
      summary.people_created += 1;
    }

    for name in &record.initiative_names {
      let Some(initiative) = store.find_initiative(name.clone()).await.map_err(Error::store)? else {
        warn!(person = %person.name, initiative = %name, "initiative not found; link skipped");
        if !summary.unmatched_initiatives.contains(name) {
          summary.unmatched_initiatives.push(name.clone());
        }
        continue;
      };

      let link = store
        .link_person(NewLink {
          initiative_id:      initiative.id,
          person_id:          person.id,
          role:               record.role.clone(),
          is_primary_contact: record.is_primary,
          source_type:        record.source_type.clone(),
          source_url:         source_url.clone(),
        })
        .await
        .map_err(Error::store)?;
      if link.created {
        summary.links_created += 1;
      }
      debug!(person = person.id, initiative = initiative.id, created = link.created, "person linked");
    }
  }

  info!(
    upserted = summary.people_upserted,
    created = summary.people_created,
    links = summary.links_created,
    "people ingested"
  );
  Ok(summary)
}

#[cfg(test)]
mod tests {
  use scout_core::{
    initiative::NewInitiative,
    person::{NewPerson, PersonType},
  };
  use scout_store_sqlite::SqliteStore;

  use super::*;

  fn roster_entry(name: &str, role: &str, initiatives: &[&str]) -> RawPerson {
    RawPerson {
      person: NewPerson {
        name: name.into(),
        person_type: PersonType::Operator,
        contact_channels: vec!["lead@example.org".into()],
        source_urls: vec!["https://roster.example.org/team".into()],
        ..NewPerson::default()
      },
      role: role.into(),
      is_primary: true,
      source_type: "people_markdown".into(),
      initiative_names: initiatives.iter().map(|n| (*n).to_owned()).collect(),
    }
  }

  #[tokio::test]
  async fn links_people_by_normalized_initiative_name() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store.upsert_initiative(NewInitiative::new("Akaflieg München e.V.")).await.unwrap();

    let summary = ingest_people(&store, vec![
      roster_entry("Jördis Beck", "Lead", &["akaflieg munchen", "Unknown Club"]),
      roster_entry("Jordis Beck", "Lead", &["Akaflieg München"]),
    ])
    .await
    .unwrap();

    assert_eq!(summary.people_upserted, 2);
    assert_eq!(summary.people_created, 1);
    assert_eq!(summary.links_created, 1);
    assert_eq!(summary.unmatched_initiatives, vec!["Unknown Club"]);

    let links = store.list_links().await.unwrap();
    assert_eq!(links.len(), 1);
    assert!(links[0].is_primary_contact);
    assert_eq!(links[0].source_url, "https://roster.example.org/team");
  }
}
