//! Domain model for persisted weather locations.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Make the bifurcated location identity explicit via `NaturalKey`.
//!
//! # Invariants
//! - Surrogate ids come from storage, never from callers.
//! - Deletion is a hard delete; there are no tombstones.

pub mod location;
