//! Scoring and ranking engine for kettlebell competitions.
//! This crate owns the ranking rules and the standings storage schema.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scoring;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::athlete::{Athlete, AthleteId, AthleteValidationError, Category, CategoryId};
pub use model::discipline::{Discipline, DisciplineShape};
pub use model::result::{DisciplineResult, OverallResult, RawAttempts, ResultValidationError};
pub use repo::athlete_repo::{AthleteRepository, RepoError, RepoResult, SqliteAthleteRepository};
pub use repo::result_repo::{ResultRepository, SqliteResultRepository};
pub use repo::standings_repo::{
    PositionUpdate, SqliteStandingsRepository, StandingsBatch, StandingsRepository,
};
pub use scoring::ranking::RANK_EPSILON;
pub use service::recompute_service::{
    CategoryFailure, CategoryRecompute, DisciplineStandingRow, RecomputeError, RecomputeReport,
    RecomputeService, StandingRow, TIEBREAK_ADJUSTMENT,
};
pub use service::result_service::{ResultService, ResultServiceError};
pub use service::roster_service::{normalize_discipline_codes, RosterService, RosterServiceError};
pub use service::start_list::{build_start_list, StartListError, Station, StationDistribution};

/// Health-check used by the CLI `ping` command.
pub fn ping() -> &'static str {
    "pong"
}

pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
