//! Core domain types
//!
//! This module contains the domain structures shared by the tracker (which
//! mutates and persists them) and by readers (which only see snapshots).

pub mod catalog;
pub mod progress;
