//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the CLI decoupled from storage details.
//! - Own the ranking engine: discipline passes, aggregation and the change
//!   trigger that re-runs them after writes.

pub mod recompute_service;
pub mod result_service;
pub mod roster_service;
pub mod start_list;
