//! [`SqliteStore`]: the SQLite implementation of [`ScoutStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, Transaction, params};
use serde_json::Value;
use uuid::Uuid;

use scout_core::{
  dossier::{DossierScore, ValidatedDossier},
  gate::{DdGate, NewGate},
  initiative::{
    Initiative, InitiativeSource, NewInitiative, NewSource, StatusUpdate, Upserted,
  },
  normalize::{Candidate, IdentityKey, canonicalize_url, fuzzy_match, normalize_name},
  person::{InitiativePerson, NewLink, NewPerson, Person},
  ranking::{NewRanking, Ranking},
  run::{PipelineRun, RunStatus},
  score::{Score, ScoreComponent, ScoreEvidence, ScoreSheet},
  signal::{NewSignal, Signal},
  store::ScoutStore,
  talent::{NewTalentScore, TalentScore},
  tier::{InitiativeTier, NewTier},
};

use crate::{
  Error, Result,
  encode::{
    COMPONENT_COLUMNS, ComponentRow, DOSSIER_COLUMNS, DossierRow, EVIDENCE_COLUMNS, GATE_COLUMNS,
    GateRow, INITIATIVE_COLUMNS, InitiativeRow, LINK_COLUMNS, LinkRow, PERSON_COLUMNS, PersonRow,
    RANKING_COLUMNS, RUN_COLUMNS, RankingRow, RunRow, SCORE_COLUMNS, SIGNAL_COLUMNS,
    SOURCE_COLUMNS, ScoreRow, SignalRow, SourceRow, TALENT_COLUMNS, TIER_COLUMNS, TalentRow,
    TierRow, encode_date, encode_dt, encode_list, encode_uuid, read_evidence,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Scout store backed by a single SQLite file.
///
/// Clones share the same connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside one transaction on the connection thread.
  ///
  /// The transaction commits only if `f` returns `Ok`; otherwise it is rolled
  /// back when dropped.
  async fn transact<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let out = f(&tx);
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  /// Run a plain read on the connection thread.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
  {
    Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
  }
}

// ─── Row helpers (connection thread) ─────────────────────────────────────────

fn select_initiative(conn: &Connection, id: i64) -> Result<Option<Initiative>> {
  conn
    .query_row(
      &format!("SELECT {INITIATIVE_COLUMNS} FROM initiatives WHERE id = ?1"),
      params![id],
      InitiativeRow::read,
    )
    .optional()?
    .map(InitiativeRow::into_initiative)
    .transpose()
}

fn require_initiative(conn: &Connection, id: i64) -> Result<Initiative> {
  select_initiative(conn, id)?.ok_or(Error::InitiativeNotFound(id))
}

fn require_person(conn: &Connection, id: i64) -> Result<()> {
  conn
    .query_row("SELECT 1 FROM people WHERE id = ?1", params![id], |_| Ok(()))
    .optional()?
    .ok_or(Error::PersonNotFound(id))
}

/// Find the row an incoming identity key resolves to.
///
/// Same normalized name with a compatible URL wins, preferring an exact URL
/// match, then the oldest row. Failing that, an exact non-empty URL match,
/// and last a near-identical name (see [`fuzzy_match`]).
fn resolve_initiative(
  conn: &Connection,
  key: &IdentityKey,
  university: &str,
) -> Result<Option<Initiative>> {
  let by_name = conn
    .query_row(
      &format!(
        "SELECT {INITIATIVE_COLUMNS} FROM initiatives
         WHERE normalized_name = ?1
           AND (primary_url = ?2 OR primary_url = '' OR ?2 = '')
         ORDER BY (primary_url = ?2) DESC, id ASC
         LIMIT 1"
      ),
      params![key.name, key.url],
      InitiativeRow::read,
    )
    .optional()?;

  let row = match by_name {
    Some(row) => Some(row),
    None if !key.url.is_empty() => conn
      .query_row(
        &format!(
          "SELECT {INITIATIVE_COLUMNS} FROM initiatives
           WHERE primary_url = ?1
           ORDER BY id ASC
           LIMIT 1"
        ),
        params![key.url],
        InitiativeRow::read,
      )
      .optional()?,
    None => None,
  };

  if let Some(row) = row {
    return row.into_initiative().map(Some);
  }

  let mut stmt = conn.prepare(
    "SELECT id, normalized_name, university, primary_url FROM initiatives ORDER BY id",
  )?;
  let candidates = stmt
    .query_map([], |r| {
      Ok(Candidate { id: r.get(0)?, name: r.get(1)?, university: r.get(2)?, url: r.get(3)? })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  match fuzzy_match(key, university, &candidates) {
    Some(id) => select_initiative(conn, id),
    None => Ok(None),
  }
}

fn insert_initiative(conn: &Connection, i: &Initiative) -> Result<i64> {
  conn.execute(
    "INSERT INTO initiatives (
       name, normalized_name, university, primary_url, description,
       categories, technologies, markets, team_signals, confidence,
       status, owner, next_step_date, note, last_contact_at,
       created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
    params![
      i.name,
      i.normalized_name,
      i.university,
      i.primary_url,
      i.description,
      encode_list(&i.categories)?,
      encode_list(&i.technologies)?,
      encode_list(&i.markets)?,
      encode_list(&i.team_signals)?,
      i.confidence,
      i.status.as_ref(),
      i.owner,
      i.next_step_date.map(encode_date),
      i.note,
      i.last_contact_at.map(encode_dt),
      encode_dt(i.created_at),
      encode_dt(i.updated_at),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

fn update_initiative(conn: &Connection, i: &Initiative) -> Result<()> {
  conn.execute(
    "UPDATE initiatives SET
       university = ?2, primary_url = ?3, description = ?4,
       categories = ?5, technologies = ?6, markets = ?7, team_signals = ?8,
       confidence = ?9, status = ?10, owner = ?11, next_step_date = ?12,
       note = ?13, last_contact_at = ?14, updated_at = ?15
     WHERE id = ?1",
    params![
      i.id,
      i.university,
      i.primary_url,
      i.description,
      encode_list(&i.categories)?,
      encode_list(&i.technologies)?,
      encode_list(&i.markets)?,
      encode_list(&i.team_signals)?,
      i.confidence,
      i.status.as_ref(),
      i.owner,
      i.next_step_date.map(encode_date),
      i.note,
      i.last_contact_at.map(encode_dt),
      encode_dt(i.updated_at),
    ],
  )?;
  Ok(())
}

fn insert_signal(conn: &Connection, input: NewSignal, now: DateTime<Utc>) -> Result<Signal> {
  require_initiative(conn, input.initiative_id)?;
  let mut signal = input.into_signal(0, now)?;
  conn.execute(
    "INSERT INTO signals (
       initiative_id, signal_type, signal_key, value,
       evidence_text, source_type, source_url, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      signal.initiative_id,
      signal.signal_type,
      signal.signal_key,
      signal.value,
      signal.evidence_text,
      signal.source_type,
      signal.source_url,
      encode_dt(signal.created_at),
    ],
  )?;
  signal.id = conn.last_insert_rowid();
  Ok(signal)
}

fn decode_all<R, T>(rows: Vec<R>, decode: impl Fn(R) -> Result<T>) -> Result<Vec<T>> {
  rows.into_iter().map(decode).collect()
}

// ─── ScoutStore impl ─────────────────────────────────────────────────────────

impl ScoutStore for SqliteStore {
  type Error = Error;

  // ── Identity resolution ───────────────────────────────────────────────────

  async fn upsert_initiative(&self, input: NewInitiative) -> Result<Upserted<Initiative>> {
    let now = Utc::now();
    self
      .transact(move |tx| {
        let key = input.identity_key();
        if key.name.is_empty() {
          return Err(scout_core::Error::EmptyName("initiative").into());
        }

        match resolve_initiative(tx, &key, &input.normalized_university())? {
          Some(mut existing) => {
            existing.merge(&input, now);
            update_initiative(tx, &existing)?;
            Ok(Upserted { entity: existing, created: false })
          }
          None => {
            let mut initiative = input.into_initiative(0, now);
            initiative.id = insert_initiative(tx, &initiative)?;
            Ok(Upserted { entity: initiative, created: true })
          }
        }
      })
      .await
  }

  async fn get_initiative(&self, id: i64) -> Result<Option<Initiative>> {
    let raw = self
      .read(move |conn| {
        conn
          .query_row(
            &format!("SELECT {INITIATIVE_COLUMNS} FROM initiatives WHERE id = ?1"),
            params![id],
            InitiativeRow::read,
          )
          .optional()
      })
      .await?;
    raw.map(InitiativeRow::into_initiative).transpose()
  }

  async fn find_initiative(&self, name: String) -> Result<Option<Initiative>> {
    let normalized = normalize_name(&name);
    let raw = self
      .read(move |conn| {
        conn
          .query_row(
            &format!(
              "SELECT {INITIATIVE_COLUMNS} FROM initiatives
               WHERE normalized_name = ?1
               ORDER BY id ASC
               LIMIT 1"
            ),
            params![normalized],
            InitiativeRow::read,
          )
          .optional()
      })
      .await?;
    raw.map(InitiativeRow::into_initiative).transpose()
  }

  async fn list_initiatives(&self) -> Result<Vec<Initiative>> {
    let raws = self
      .read(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {INITIATIVE_COLUMNS} FROM initiatives ORDER BY id"))?;
        stmt.query_map([], InitiativeRow::read)?.collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    decode_all(raws, InitiativeRow::into_initiative)
  }

  async fn set_initiative_status(&self, id: i64, update: StatusUpdate) -> Result<Initiative> {
    let now = Utc::now();
    self
      .transact(move |tx| {
        let mut initiative = require_initiative(tx, id)?;
        initiative.apply_status(&update, now);
        update_initiative(tx, &initiative)?;
        Ok(initiative)
      })
      .await
  }

  async fn record_source(&self, input: NewSource) -> Result<InitiativeSource> {
    let now = encode_dt(Utc::now());
    self
      .transact(move |tx| {
        require_initiative(tx, input.initiative_id)?;
        let source_url = canonicalize_url(&input.source_url);
        let external_url = canonicalize_url(&input.external_url);

        tx.execute(
          "INSERT INTO initiative_sources (
             initiative_id, source_type, source_name, source_url, external_url,
             payload_hash, first_seen_at, last_seen_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
           ON CONFLICT (initiative_id, source_type, source_url, external_url) DO UPDATE SET
             source_name  = excluded.source_name,
             payload_hash = excluded.payload_hash,
             last_seen_at = excluded.last_seen_at",
          params![
            input.initiative_id,
            input.source_type.trim(),
            input.source_name.trim(),
            source_url,
            external_url,
            input.payload_hash,
            now,
          ],
        )?;

        let row = tx.query_row(
          &format!(
            "SELECT {SOURCE_COLUMNS} FROM initiative_sources
             WHERE initiative_id = ?1 AND source_type = ?2
               AND source_url = ?3 AND external_url = ?4"
          ),
          params![input.initiative_id, input.source_type.trim(), source_url, external_url],
          SourceRow::read,
        )?;
        row.into_source()
      })
      .await
  }

  async fn list_sources(&self, initiative_id: i64) -> Result<Vec<InitiativeSource>> {
    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SOURCE_COLUMNS} FROM initiative_sources WHERE initiative_id = ?1 ORDER BY id"
        ))?;
        stmt
          .query_map(params![initiative_id], SourceRow::read)?
          .collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    decode_all(raws, SourceRow::into_source)
  }

  async fn upsert_person(&self, input: NewPerson) -> Result<Upserted<Person>> {
    let now = Utc::now();
    self
      .transact(move |tx| {
        let normalized = input.normalized_name();
        if normalized.is_empty() {
          return Err(scout_core::Error::EmptyName("person").into());
        }

        let existing = tx
          .query_row(
            &format!("SELECT {PERSON_COLUMNS} FROM people WHERE normalized_name = ?1"),
            params![normalized],
            PersonRow::read,
          )
          .optional()?
          .map(PersonRow::into_person)
          .transpose()?;

        if let Some(mut person) = existing {
          person.merge(&input, now);
          tx.execute(
            "UPDATE people SET
               person_type = ?2, headline = ?3, contact_channels = ?4,
               source_urls = ?5, confidence = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
              person.id,
              person.person_type.as_ref(),
              person.headline,
              encode_list(&person.contact_channels)?,
              encode_list(&person.source_urls)?,
              person.confidence,
              encode_dt(person.updated_at),
            ],
          )?;
          return Ok(Upserted { entity: person, created: false });
        }

        let mut person = input.into_person(0, now);
        tx.execute(
          "INSERT INTO people (
             name, normalized_name, person_type, headline, contact_channels,
             source_urls, confidence, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          params![
            person.name,
            person.normalized_name,
            person.person_type.as_ref(),
            person.headline,
            encode_list(&person.contact_channels)?,
            encode_list(&person.source_urls)?,
            person.confidence,
            encode_dt(person.created_at),
            encode_dt(person.updated_at),
          ],
        )?;
        person.id = tx.last_insert_rowid();
        Ok(Upserted { entity: person, created: true })
      })
      .await
  }

  async fn list_people(&self) -> Result<Vec<Person>> {
    let raws = self
      .read(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT {PERSON_COLUMNS} FROM people ORDER BY id"))?;
        stmt.query_map([], PersonRow::read)?.collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    decode_all(raws, PersonRow::into_person)
  }

  async fn link_person(&self, input: NewLink) -> Result<Upserted<InitiativePerson>> {
    let now = Utc::now();
    self
      .transact(move |tx| {
        require_initiative(tx, input.initiative_id)?;
        require_person(tx, input.person_id)?;
        let role = input.role.trim().to_owned();

        let select = format!(
          "SELECT {LINK_COLUMNS} FROM initiative_people
           WHERE initiative_id = ?1 AND person_id = ?2 AND role = ?3"
        );
        let existing = tx
          .query_row(&select, params![input.initiative_id, input.person_id, role], LinkRow::read)
          .optional()?;

        if let Some(row) = existing {
          let mut link = row.into_link()?;
          if input.is_primary_contact && !link.is_primary_contact {
            tx.execute(
              "UPDATE initiative_people SET is_primary_contact = 1 WHERE id = ?1",
              params![link.id],
            )?;
            link.is_primary_contact = true;
          }
          return Ok(Upserted { entity: link, created: false });
        }

        let link = InitiativePerson {
          id: 0,
          initiative_id: input.initiative_id,
          person_id: input.person_id,
          role,
          is_primary_contact: input.is_primary_contact,
          source_type: input.source_type.trim().to_owned(),
          source_url: canonicalize_url(&input.source_url),
          created_at: now,
        };
        tx.execute(
          "INSERT INTO initiative_people (
             initiative_id, person_id, role, is_primary_contact,
             source_type, source_url, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![
            link.initiative_id,
            link.person_id,
            link.role,
            link.is_primary_contact,
            link.source_type,
            link.source_url,
            encode_dt(link.created_at),
          ],
        )?;
        Ok(Upserted { entity: InitiativePerson { id: tx.last_insert_rowid(), ..link }, created: true })
      })
      .await
  }

  async fn list_links(&self) -> Result<Vec<InitiativePerson>> {
    let raws = self
      .read(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {LINK_COLUMNS} FROM initiative_people ORDER BY id"))?;
        stmt.query_map([], LinkRow::read)?.collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    decode_all(raws, LinkRow::into_link)
  }

  // ── Signals (append-only) ───────────────────────────────────────────────

  async fn add_signal(&self, input: NewSignal) -> Result<Signal> {
    let now = Utc::now();
    self.transact(move |tx| insert_signal(tx, input, now)).await
  }

  async fn add_signals(&self, inputs: Vec<NewSignal>) -> Result<Vec<Signal>> {
    let now = Utc::now();
    self
      .transact(move |tx| {
        inputs.into_iter().map(|input| insert_signal(tx, input, now)).collect()
      })
      .await
  }

  async fn list_signals(&self, initiative_id: i64) -> Result<Vec<Signal>> {
    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SIGNAL_COLUMNS} FROM signals WHERE initiative_id = ?1 ORDER BY id"
        ))?;
        stmt
          .query_map(params![initiative_id], SignalRow::read)?
          .collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    decode_all(raws, SignalRow::into_signal)
  }

  // ── Scores ────────────────────────────────────────────────────────────────

  async fn replace_score(&self, sheet: ScoreSheet) -> Result<Score> {
    let now = Utc::now();
    self
      .transact(move |tx| {
        let initiative_id = sheet.initiative_id;
        require_initiative(tx, initiative_id)?;

        tx.execute("DELETE FROM score_evidence WHERE initiative_id = ?1", params![initiative_id])?;
        tx.execute(
          "DELETE FROM score_components WHERE initiative_id = ?1",
          params![initiative_id],
        )?;

        let v = &sheet.values;
        tx.execute(
          "INSERT INTO scores (
             initiative_id, tech_depth, market_opportunity, team_strength, maturity,
             composite_score, confidence_tech, confidence_market, confidence_team,
             confidence_maturity, actionability_0_6m, support_fit, outreach_now_score,
             venture_upside_score, confidence_actionability, confidence_support_fit, scored_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
           ON CONFLICT (initiative_id) DO UPDATE SET
             tech_depth               = excluded.tech_depth,
             market_opportunity       = excluded.market_opportunity,
             team_strength            = excluded.team_strength,
             maturity                 = excluded.maturity,
             composite_score          = excluded.composite_score,
             confidence_tech          = excluded.confidence_tech,
             confidence_market        = excluded.confidence_market,
             confidence_team          = excluded.confidence_team,
             confidence_maturity      = excluded.confidence_maturity,
             actionability_0_6m       = excluded.actionability_0_6m,
             support_fit              = excluded.support_fit,
             outreach_now_score       = excluded.outreach_now_score,
             venture_upside_score     = excluded.venture_upside_score,
             confidence_actionability = excluded.confidence_actionability,
             confidence_support_fit   = excluded.confidence_support_fit,
             scored_at                = excluded.scored_at",
          params![
            initiative_id,
            v.tech_depth,
            v.market_opportunity,
            v.team_strength,
            v.maturity,
            v.composite_score,
            v.confidence_tech,
            v.confidence_market,
            v.confidence_team,
            v.confidence_maturity,
            v.actionability_0_6m,
            v.support_fit,
            v.outreach_now_score,
            v.venture_upside_score,
            v.confidence_actionability,
            v.confidence_support_fit,
            encode_dt(now),
          ],
        )?;

        let score_id: i64 = tx.query_row(
          "SELECT id FROM scores WHERE initiative_id = ?1",
          params![initiative_id],
          |r| r.get(0),
        )?;

        for draft in &sheet.components {
          let c = &draft.component;
          tx.execute(
            "INSERT INTO score_components (
               score_id, initiative_id, dimension, component_key, raw_value,
               normalized_value, weight, weighted_contribution, confidence,
               evidence_count, source_mix, provenance
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
              score_id,
              initiative_id,
              c.dimension,
              c.component_key,
              c.raw_value,
              c.normalized_value,
              c.weight,
              c.weighted_contribution,
              c.confidence,
              c.evidence_count as i64,
              encode_list(&c.source_mix)?,
              c.provenance.as_ref(),
            ],
          )?;
          let component_id = tx.last_insert_rowid();

          for e in &draft.evidence {
            tx.execute(
              "INSERT INTO score_evidence (
                 score_component_id, initiative_id, signal_id, signal_type,
                 signal_key, value, source_url, snippet
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
              params![
                component_id,
                initiative_id,
                e.signal_id,
                e.signal_type,
                e.signal_key,
                e.value,
                e.source_url,
                e.snippet,
              ],
            )?;
          }
        }

        Ok(Score { id: score_id, initiative_id, values: sheet.values, scored_at: now })
      })
      .await
  }

  async fn list_scores(&self) -> Result<Vec<Score>> {
    let raws = self
      .read(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {SCORE_COLUMNS} FROM scores ORDER BY initiative_id"))?;
        stmt.query_map([], ScoreRow::read)?.collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    decode_all(raws, ScoreRow::into_score)
  }

  async fn list_score_components(&self, initiative_id: i64) -> Result<Vec<ScoreComponent>> {
    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COMPONENT_COLUMNS} FROM score_components WHERE initiative_id = ?1 ORDER BY id"
        ))?;
        stmt
          .query_map(params![initiative_id], ComponentRow::read)?
          .collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    decode_all(raws, ComponentRow::into_component)
  }

  async fn list_score_evidence(&self, initiative_id: i64) -> Result<Vec<ScoreEvidence>> {
    self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EVIDENCE_COLUMNS} FROM score_evidence WHERE initiative_id = ?1 ORDER BY id"
        ))?;
        stmt
          .query_map(params![initiative_id], read_evidence)?
          .collect::<rusqlite::Result<Vec<_>>>()
      })
      .await
  }

  async fn add_talent_score(&self, input: NewTalentScore) -> Result<TalentScore> {
    let input = input.validated()?;
    let now = encode_dt(Utc::now());
    self
      .transact(move |tx| {
        require_person(tx, input.person_id)?;
        let talent_type = input.talent_type.to_string();
        tx.execute(
          "INSERT INTO talent_scores (
             person_id, talent_type, reachability, operator_strength,
             investor_relevance, network_score, composite_score, confidence,
             reasons, scored_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
           ON CONFLICT (person_id, talent_type) DO UPDATE SET
             reachability       = excluded.reachability,
             operator_strength  = excluded.operator_strength,
             investor_relevance = excluded.investor_relevance,
             network_score      = excluded.network_score,
             composite_score    = excluded.composite_score,
             confidence         = excluded.confidence,
             reasons            = excluded.reasons,
             scored_at          = excluded.scored_at",
          params![
            input.person_id,
            talent_type,
            input.reachability,
            input.operator_strength,
            input.investor_relevance,
            input.network_score,
            input.composite_score,
            input.confidence,
            encode_list(&input.reasons)?,
            now,
          ],
        )?;
        tx.execute(
          "DELETE FROM talent_scores WHERE person_id = ?1 AND talent_type <> ?2",
          params![input.person_id, talent_type],
        )?;
        let row = tx.query_row(
          &format!(
            "SELECT {TALENT_COLUMNS} FROM talent_scores WHERE person_id = ?1 AND talent_type = ?2"
          ),
          params![input.person_id, talent_type],
          TalentRow::read,
        )?;
        row.into_talent_score()
      })
      .await
  }

  async fn list_talent_scores(&self) -> Result<Vec<TalentScore>> {
    let raws = self
      .read(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TALENT_COLUMNS} FROM talent_scores ORDER BY person_id, talent_type"
        ))?;
        stmt.query_map([], TalentRow::read)?.collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    decode_all(raws, TalentRow::into_talent_score)
  }

  // ── Rankings ──────────────────────────────────────────────────────────────

  async fn replace_rankings(&self, rows: Vec<NewRanking>) -> Result<usize> {
    let now = encode_dt(Utc::now());
    self
      .transact(move |tx| {
        tx.execute("DELETE FROM rankings", [])?;
        let mut stmt = tx.prepare(
          "INSERT INTO rankings (
             ranking_type, entity_id, entity_key, entity_name, rank_position,
             score, evidence_count, meta, generated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for r in &rows {
          stmt.execute(params![
            r.ranking_type,
            r.entity_id,
            r.entity_key,
            r.entity_name,
            r.rank_position as i64,
            r.score,
            r.evidence_count as i64,
            serde_json::to_string(&r.meta)?,
            now,
          ])?;
        }
        Ok(rows.len())
      })
      .await
  }

  async fn list_rankings(&self, ranking_type: Option<String>) -> Result<Vec<Ranking>> {
    let raws = self
      .read(move |conn| {
        if let Some(t) = ranking_type {
          let mut stmt = conn.prepare(&format!(
            "SELECT {RANKING_COLUMNS} FROM rankings WHERE ranking_type = ?1
             ORDER BY rank_position"
          ))?;
          stmt.query_map(params![t], RankingRow::read)?.collect::<rusqlite::Result<Vec<_>>>()
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {RANKING_COLUMNS} FROM rankings ORDER BY ranking_type, rank_position"
          ))?;
          stmt.query_map([], RankingRow::read)?.collect::<rusqlite::Result<Vec<_>>>()
        }
      })
      .await?;
    decode_all(raws, RankingRow::into_ranking)
  }

  // ── Due diligence ─────────────────────────────────────────────────────────

  async fn upsert_dd_gate(&self, input: NewGate) -> Result<DdGate> {
    let gate = input.into_gate(0, Utc::now());
    self
      .transact(move |tx| {
        require_initiative(tx, gate.initiative_id)?;
        tx.execute(
          "INSERT INTO dd_gates (initiative_id, gate, status, reason, evidence, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (initiative_id, gate) DO UPDATE SET
             status     = excluded.status,
             reason     = excluded.reason,
             evidence   = excluded.evidence,
             updated_at = excluded.updated_at",
          params![
            gate.initiative_id,
            gate.gate.as_ref(),
            gate.status.as_ref(),
            gate.reason,
            encode_list(&gate.evidence)?,
            encode_dt(gate.updated_at),
          ],
        )?;
        let id: i64 = tx.query_row(
          "SELECT id FROM dd_gates WHERE initiative_id = ?1 AND gate = ?2",
          params![gate.initiative_id, gate.gate.as_ref()],
          |r| r.get(0),
        )?;
        Ok(DdGate { id, ..gate })
      })
      .await
  }

  async fn list_dd_gates(&self) -> Result<Vec<DdGate>> {
    let raws = self
      .read(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {GATE_COLUMNS} FROM dd_gates ORDER BY initiative_id, gate"))?;
        stmt.query_map([], GateRow::read)?.collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    decode_all(raws, GateRow::into_gate)
  }

  async fn upsert_dossier_score(
    &self,
    initiative_id: i64,
    dossier_hash:  String,
    dossier:       ValidatedDossier,
  ) -> Result<DossierScore> {
    let now = Utc::now();
    let payload = serde_json::to_string(&dossier)?;
    self
      .transact(move |tx| {
        require_initiative(tx, initiative_id)?;
        tx.execute(
          "INSERT INTO dossier_scores (
             initiative_id, dossier_hash, classification, recommended_action,
             composite_score, composite_confidence, payload, scored_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT (initiative_id) DO UPDATE SET
             dossier_hash         = excluded.dossier_hash,
             classification       = excluded.classification,
             recommended_action   = excluded.recommended_action,
             composite_score      = excluded.composite_score,
             composite_confidence = excluded.composite_confidence,
             payload              = excluded.payload,
             scored_at            = excluded.scored_at",
          params![
            initiative_id,
            dossier_hash,
            dossier.classification.as_ref(),
            dossier.recommended_action.as_ref(),
            dossier.composite_score,
            dossier.composite_confidence,
            payload,
            encode_dt(now),
          ],
        )?;
        let id: i64 = tx.query_row(
          "SELECT id FROM dossier_scores WHERE initiative_id = ?1",
          params![initiative_id],
          |r| r.get(0),
        )?;
        Ok(DossierScore { id, initiative_id, dossier_hash, dossier, scored_at: now })
      })
      .await
  }

  async fn list_dossier_scores(&self) -> Result<Vec<DossierScore>> {
    let raws = self
      .read(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DOSSIER_COLUMNS} FROM dossier_scores ORDER BY initiative_id"
        ))?;
        stmt.query_map([], DossierRow::read)?.collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    decode_all(raws, DossierRow::into_dossier_score)
  }

  // ── Tiers ─────────────────────────────────────────────────────────────────

  async fn replace_tiers(&self, rows: Vec<NewTier>) -> Result<usize> {
    let now = encode_dt(Utc::now());
    self
      .transact(move |tx| {
        tx.execute("DELETE FROM initiative_tiers", [])?;
        let mut stmt = tx.prepare(
          "INSERT INTO initiative_tiers (
             initiative_id, dossier_score_id, tier, rationale, composite_percentile,
             dimension_percentiles, previous_tier, tier_change, change_reason,
             cohort_stats, tiered_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        for t in &rows {
          stmt.execute(params![
            t.initiative_id,
            t.dossier_score_id,
            t.tier.as_ref(),
            t.rationale,
            t.composite_percentile,
            serde_json::to_string(&t.dimension_percentiles)?,
            t.previous_tier.map(|p| p.as_ref().to_owned()),
            t.change.as_ref(),
            t.change_reason,
            serde_json::to_string(&t.cohort)?,
            now,
          ])?;
        }
        Ok(rows.len())
      })
      .await
  }

  async fn list_tiers(&self) -> Result<Vec<InitiativeTier>> {
    let raws = self
      .read(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TIER_COLUMNS} FROM initiative_tiers ORDER BY initiative_id"
        ))?;
        stmt.query_map([], TierRow::read)?.collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    let mut tiers = decode_all(raws, TierRow::into_tier)?;
    // Tier letters do not sort alphabetically into quality order.
    tiers.sort_by_key(|t| (t.row.tier, t.row.initiative_id));
    Ok(tiers)
  }

  // ── Pipeline runs ─────────────────────────────────────────────────────────

  async fn start_run(&self, stage: String) -> Result<PipelineRun> {
    let run = PipelineRun::start(stage, Utc::now());
    let run_id = encode_uuid(run.run_id);
    let stage = run.stage.clone();
    let status = run.status.as_ref().to_owned();
    let details = serde_json::to_string(&run.details)?;
    let started_at = encode_dt(run.started_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO pipeline_runs (run_id, stage, status, details, started_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![run_id, stage, status, details, started_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(run)
  }

  async fn finish_run(
    &self,
    run_id:        Uuid,
    status:        RunStatus,
    details:       Value,
    error_message: Option<String>,
  ) -> Result<PipelineRun> {
    let id = encode_uuid(run_id);
    let status = status.as_ref().to_owned();
    let details = serde_json::to_string(&details)?;
    let finished_at = encode_dt(Utc::now());

    let raw = self
      .read(move |conn| {
        conn.execute(
          "UPDATE pipeline_runs
           SET status = ?2, details = ?3, error_message = ?4, finished_at = ?5
           WHERE run_id = ?1",
          params![id, status, details, error_message, finished_at],
        )?;
        conn
          .query_row(
            &format!("SELECT {RUN_COLUMNS} FROM pipeline_runs WHERE run_id = ?1"),
            params![id],
            RunRow::read,
          )
          .optional()
      })
      .await?;

    raw.ok_or(Error::RunNotFound(run_id))?.into_run()
  }

  async fn list_runs(&self) -> Result<Vec<PipelineRun>> {
    let raws = self
      .read(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RUN_COLUMNS} FROM pipeline_runs ORDER BY started_at DESC, run_id"
        ))?;
        stmt.query_map([], RunRow::read)?.collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    decode_all(raws, RunRow::into_run)
  }
}
