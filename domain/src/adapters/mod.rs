//! Adapters that live inside the domain crate for convenience.
//!
//! The in-memory store backs unit tests and the api-server's volatile
//! storage mode. The SQLite store lives in its own crate.

pub mod memory_repo;
