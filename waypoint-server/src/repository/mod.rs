//! Repository Module
//!
//! Database-backed progress storage for the server.

pub mod progress;

pub use progress::PgProgressStore;
