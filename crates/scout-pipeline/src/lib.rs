//! Batch stages of the Scout pipeline.
//!
//! Every stage is generic over any [`scout_core::store::ScoutStore`], runs to
//! completion before returning, and reports what it wrote as a serializable
//! summary. Stages are safe to re-run: they converge on the same store state.
//!
//! ```text
//! ingest → ingest_people → import_manual → score → score_talent → rank → report
//!                                                   score_dossiers → tier (optional)
//! ```

pub mod dossier;
pub mod error;
pub mod import;
pub mod ingest;
pub mod people;
pub mod rank;
pub mod report;
pub mod retry;
pub mod run;
pub mod score;
pub mod talent;
pub mod tier;

pub use error::{Error, Result};

use serde::Serialize;
use sha2::{Digest as _, Sha256};

/// SHA-256 hex digest of `value`'s JSON encoding.
pub(crate) fn payload_hash<T: Serialize>(value: &T) -> Result<String> {
  let bytes = serde_json::to_vec(value)?;
  Ok(text_hash(&bytes))
}

/// SHA-256 hex digest of raw bytes.
pub(crate) fn text_hash(bytes: &[u8]) -> String { hex::encode(Sha256::digest(bytes)) }
