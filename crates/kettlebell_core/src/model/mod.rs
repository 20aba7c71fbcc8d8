//! Competition domain model.
//!
//! # Responsibility
//! - Define the roster records (athletes, categories) the engine reads.
//! - Define the fixed discipline enumeration and raw result shapes.
//! - Define the standings records the engine writes.
//!
//! # Invariants
//! - Every discipline code maps to exactly one input shape.
//! - Rank outputs are keyed by category, never by athlete alone.

pub mod athlete;
pub mod discipline;
pub mod result;
