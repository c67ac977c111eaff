//! Data Transfer Objects
//!
//! Types exchanged with job drivers and readers. Snapshots are owned copies
//! computed at read time; requests describe job registration and updates.

pub mod job;
pub mod progress;
