//! Waypoint Core
//!
//! Core types and abstractions for the Waypoint progress tracker.
//!
//! This crate contains:
//! - Domain types: step catalogs and per-job progress records
//! - The message classifier mapping free-text status lines onto steps
//! - DTOs: snapshots and requests exchanged with readers and job drivers

pub mod classifier;
pub mod domain;
pub mod dto;
pub mod error;

pub use classifier::classify;
pub use error::ConfigurationError;
