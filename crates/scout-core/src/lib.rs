//! Core types and pure logic for the Scout initiative tracker.
//!
//! This crate is deliberately free of database and I/O dependencies. It owns
//! the domain model, identity normalization, the scoring, ranking and memo
//! rules, and the [`store::ScoutStore`] trait that storage backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod config;
pub mod dossier;
pub mod error;
pub mod gate;
pub mod initiative;
pub mod memo;
pub mod normalize;
pub mod person;
pub mod ranking;
pub mod run;
pub mod score;
pub mod scoring;
pub mod signal;
pub mod store;
pub mod talent;
pub mod tier;

pub use error::{Error, Result};

/// Clamp `value` into `[low, high]`. Non-finite input collapses to `low`.
pub fn clip(value: f64, low: f64, high: f64) -> f64 {
  if value.is_nan() {
    return low;
  }
  value.clamp(low, high)
}
