//! In-process adapters that live inside the domain crate for convenience.
//!
//! These back unit tests, the demo CLI and the server's `memory` storage
//! provider. Real adapters (DynamoDB, SQLite) live in separate crates.

pub mod memory_repo;
