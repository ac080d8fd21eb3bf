//! Domain layer for the Spill backend.
//!
//! This crate contains:
//! - Domain models and request/response types
//! - Pure business rules (vent visibility, streaks, challenges, matches)
//! - Service traits such as the toxicity classifier

pub mod models;
pub mod services;
