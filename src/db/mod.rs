//! Report persistence: entity models and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: typed rows returned by repositories.
//! - `repo`: SQL-only functions that map rows into entities.
//!
//! External modules should import from `reddit_outreach::db`; the repository
//! API and models are re-exported here.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{AppendedRound, StoredRow};
