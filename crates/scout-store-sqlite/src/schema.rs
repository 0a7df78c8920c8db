//! SQL schema for the Scout SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for future migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per identity key (normalized name, canonical URL).
CREATE TABLE IF NOT EXISTS initiatives (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    normalized_name TEXT NOT NULL,
    university      TEXT NOT NULL DEFAULT '',
    primary_url     TEXT NOT NULL DEFAULT '',
    description     TEXT NOT NULL DEFAULT '',
    categories      TEXT NOT NULL DEFAULT '[]',
    technologies    TEXT NOT NULL DEFAULT '[]',
    markets         TEXT NOT NULL DEFAULT '[]',
    team_signals    TEXT NOT NULL DEFAULT '[]',
    confidence      REAL NOT NULL DEFAULT 0,
    status          TEXT NOT NULL DEFAULT 'new',
    owner           TEXT NOT NULL DEFAULT '',
    next_step_date  TEXT,            -- YYYY-MM-DD
    note            TEXT NOT NULL DEFAULT '',
    last_contact_at TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    UNIQUE (normalized_name, primary_url)
);

CREATE TABLE IF NOT EXISTS initiative_sources (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    initiative_id INTEGER NOT NULL REFERENCES initiatives(id),
    source_type   TEXT NOT NULL,
    source_name   TEXT NOT NULL DEFAULT '',
    source_url    TEXT NOT NULL DEFAULT '',
    external_url  TEXT NOT NULL DEFAULT '',
    payload_hash  TEXT NOT NULL,
    first_seen_at TEXT NOT NULL,
    last_seen_at  TEXT NOT NULL,
    UNIQUE (initiative_id, source_type, source_url, external_url)
);

CREATE TABLE IF NOT EXISTS people (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    name             TEXT NOT NULL,
    normalized_name  TEXT NOT NULL UNIQUE,
    person_type      TEXT NOT NULL DEFAULT 'unknown',
    headline         TEXT NOT NULL DEFAULT '',
    contact_channels TEXT NOT NULL DEFAULT '[]',
    source_urls      TEXT NOT NULL DEFAULT '[]',
    confidence       REAL NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS initiative_people (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    initiative_id      INTEGER NOT NULL REFERENCES initiatives(id),
    person_id          INTEGER NOT NULL REFERENCES people(id),
    role               TEXT NOT NULL DEFAULT '',
    is_primary_contact INTEGER NOT NULL DEFAULT 0,
    source_type        TEXT NOT NULL DEFAULT '',
    source_url         TEXT NOT NULL DEFAULT '',
    created_at         TEXT NOT NULL,
    UNIQUE (initiative_id, person_id, role)
);

-- Signals are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS signals (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    initiative_id INTEGER NOT NULL REFERENCES initiatives(id),
    signal_type   TEXT NOT NULL,
    signal_key    TEXT NOT NULL,
    value         REAL NOT NULL,
    evidence_text TEXT NOT NULL DEFAULT '',
    source_type   TEXT NOT NULL DEFAULT '',
    source_url    TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL
);

-- One row per initiative, overwritten by every scoring pass.
CREATE TABLE IF NOT EXISTS scores (
    id                       INTEGER PRIMARY KEY AUTOINCREMENT,
    initiative_id            INTEGER NOT NULL UNIQUE REFERENCES initiatives(id),
    tech_depth               REAL NOT NULL,
    market_opportunity       REAL NOT NULL,
    team_strength            REAL NOT NULL,
    maturity                 REAL NOT NULL,
    composite_score          REAL NOT NULL,
    confidence_tech          REAL NOT NULL,
    confidence_market        REAL NOT NULL,
    confidence_team          REAL NOT NULL,
    confidence_maturity      REAL NOT NULL,
    actionability_0_6m       REAL NOT NULL,
    support_fit              REAL NOT NULL,
    outreach_now_score       REAL NOT NULL,
    venture_upside_score     REAL NOT NULL,
    confidence_actionability REAL NOT NULL,
    confidence_support_fit   REAL NOT NULL,
    scored_at                TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS score_components (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    score_id              INTEGER NOT NULL REFERENCES scores(id),
    initiative_id         INTEGER NOT NULL REFERENCES initiatives(id),
    dimension             TEXT NOT NULL,
    component_key         TEXT NOT NULL,
    raw_value             REAL NOT NULL,
    normalized_value      REAL NOT NULL,
    weight                REAL NOT NULL,
    weighted_contribution REAL NOT NULL,
    confidence            REAL NOT NULL,
    evidence_count        INTEGER NOT NULL,
    source_mix            TEXT NOT NULL DEFAULT '[]',
    provenance            TEXT NOT NULL   -- 'signal' | 'derived'
);

CREATE TABLE IF NOT EXISTS score_evidence (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    score_component_id INTEGER NOT NULL REFERENCES score_components(id),
    initiative_id      INTEGER NOT NULL REFERENCES initiatives(id),
    signal_id          INTEGER NOT NULL REFERENCES signals(id),
    signal_type        TEXT NOT NULL,
    signal_key         TEXT NOT NULL,
    value              REAL NOT NULL,
    source_url         TEXT NOT NULL DEFAULT '',
    snippet            TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS talent_scores (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    person_id          INTEGER NOT NULL REFERENCES people(id),
    talent_type        TEXT NOT NULL,
    reachability       REAL NOT NULL,
    operator_strength  REAL NOT NULL,
    investor_relevance REAL NOT NULL,
    network_score      REAL NOT NULL,
    composite_score    REAL NOT NULL,
    confidence         REAL NOT NULL,
    reasons            TEXT NOT NULL DEFAULT '[]',
    scored_at          TEXT NOT NULL,
    UNIQUE (person_id, talent_type)
);

-- Fully replaced by every ranking pass.
CREATE TABLE IF NOT EXISTS rankings (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    ranking_type   TEXT NOT NULL,
    entity_id      INTEGER,          -- NULL for domain rankings
    entity_key     TEXT NOT NULL,
    entity_name    TEXT NOT NULL,
    rank_position  INTEGER NOT NULL,
    score          REAL NOT NULL,
    evidence_count INTEGER NOT NULL,
    meta           TEXT NOT NULL DEFAULT '{}',
    generated_at   TEXT NOT NULL,
    UNIQUE (ranking_type, rank_position),
    UNIQUE (ranking_type, entity_key)
);

CREATE TABLE IF NOT EXISTS dd_gates (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    initiative_id INTEGER NOT NULL REFERENCES initiatives(id),
    gate          TEXT NOT NULL,     -- 'A' | 'B' | 'C' | 'D'
    status        TEXT NOT NULL,     -- 'pass' | 'fail' | 'pending'
    reason        TEXT NOT NULL DEFAULT '',
    evidence      TEXT NOT NULL DEFAULT '[]',
    updated_at    TEXT NOT NULL,
    UNIQUE (initiative_id, gate)
);

CREATE TABLE IF NOT EXISTS dossier_scores (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    initiative_id        INTEGER NOT NULL UNIQUE REFERENCES initiatives(id),
    dossier_hash         TEXT NOT NULL,
    classification       TEXT NOT NULL,
    recommended_action   TEXT NOT NULL,
    composite_score      REAL NOT NULL,
    composite_confidence REAL NOT NULL,
    payload              TEXT NOT NULL,   -- JSON-encoded validated dossier
    scored_at            TEXT NOT NULL
);

-- Fully replaced by every tiering pass.
CREATE TABLE IF NOT EXISTS initiative_tiers (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    initiative_id         INTEGER NOT NULL UNIQUE REFERENCES initiatives(id),
    dossier_score_id      INTEGER NOT NULL REFERENCES dossier_scores(id),
    tier                  TEXT NOT NULL,     -- 'S' | 'A' | 'B' | 'C' | 'X'
    rationale             TEXT NOT NULL,
    composite_percentile  REAL NOT NULL,
    dimension_percentiles TEXT NOT NULL DEFAULT '{}',
    previous_tier         TEXT,
    tier_change           TEXT NOT NULL,     -- 'new' | 'stable' | 'upgraded' | 'downgraded'
    change_reason         TEXT NOT NULL DEFAULT '',
    cohort_stats          TEXT NOT NULL DEFAULT '{}',
    tiered_at             TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pipeline_runs (
    run_id        TEXT PRIMARY KEY,
    stage         TEXT NOT NULL,
    status        TEXT NOT NULL,     -- 'running' | 'success' | 'failed'
    details       TEXT NOT NULL DEFAULT '{}',
    error_message TEXT,
    started_at    TEXT NOT NULL,
    finished_at   TEXT
);

CREATE INDEX IF NOT EXISTS initiatives_url_idx      ON initiatives(primary_url);
CREATE INDEX IF NOT EXISTS signals_initiative_idx   ON signals(initiative_id);
CREATE INDEX IF NOT EXISTS components_initiative_idx ON score_components(initiative_id);
CREATE INDEX IF NOT EXISTS evidence_initiative_idx  ON score_evidence(initiative_id);
CREATE INDEX IF NOT EXISTS rankings_type_idx        ON rankings(ranking_type);

PRAGMA user_version = 1;
";
