//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the location store data access contract.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Lookups report absence as `Ok(None)`, never as an error or placeholder.
//! - Repositories only accept connections with migrations fully applied.

pub mod location_repo;
