//! Pure scoring and ranking logic.
//!
//! Nothing in here touches storage; the recompute service feeds it rows and
//! persists what comes out.

pub mod formula;
pub mod ranking;
