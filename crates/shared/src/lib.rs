//! Shared utilities for the Spill backend.
//!
//! - Session tokens (JWT)
//! - Password hashing with Argon2id
//! - Stream cursors for polled message lists
//! - Custom validators and anonymous handle generation

pub mod jwt;
pub mod names;
pub mod pagination;
pub mod password;
pub mod validation;
