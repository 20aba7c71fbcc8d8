//! Result write path.
//!
//! # Responsibility
//! - Validate and persist raw discipline results.
//! - Fire the recompute trigger after every successful write.
//!
//! # Invariants
//! - The result row is committed before any recompute starts; a failing
//!   recompute never rolls the write back.

use crate::model::athlete::AthleteId;
use crate::model::discipline::Discipline;
use crate::model::result::{DisciplineResult, RawAttempts, ResultValidationError};
use crate::repo::athlete_repo::RepoError;
use crate::repo::result_repo::ResultRepository;
use crate::repo::standings_repo::StandingsRepository;
use crate::service::recompute_service::{RecomputeError, RecomputeReport, RecomputeService};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from result write operations.
#[derive(Debug)]
pub enum ResultServiceError {
    InvalidResult(ResultValidationError),
    AthleteNotFound(AthleteId),
    Repo(RepoError),
    /// The row was saved but the trigger could not resolve categories.
    Trigger(RecomputeError),
}

impl Display for ResultServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidResult(err) => write!(f, "{err}"),
            Self::AthleteNotFound(id) => write!(f, "athlete not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Trigger(err) => write!(f, "result saved but recompute failed: {err}"),
        }
    }
}

impl Error for ResultServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidResult(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Trigger(err) => Some(err),
            Self::AthleteNotFound(_) => None,
        }
    }
}

impl From<ResultValidationError> for ResultServiceError {
    fn from(value: ResultValidationError) -> Self {
        Self::InvalidResult(value)
    }
}

impl From<RepoError> for ResultServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ResultValidation(err) => Self::InvalidResult(err),
            RepoError::NotFound {
                entity: "athlete",
                id,
            } => Self::AthleteNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Result service facade over result storage and the ranking engine.
pub struct ResultService<R: ResultRepository, S: StandingsRepository> {
    repo: R,
    recompute: RecomputeService<S>,
}

impl<R: ResultRepository, S: StandingsRepository> ResultService<R, S> {
    pub fn new(repo: R, standings: S) -> Self {
        Self {
            repo,
            recompute: RecomputeService::new(standings),
        }
    }

    /// Saves one result and recomputes every category of its athlete.
    pub fn save_result(
        &self,
        result: &DisciplineResult,
    ) -> Result<RecomputeReport, ResultServiceError> {
        result.validate()?;
        self.repo.upsert_result(result)?;
        info!(
            "event=result_save module=service status=ok athlete={} discipline={}",
            result.athlete_id, result.discipline
        );

        let report = match self.recompute.on_result_saved(result.athlete_id) {
            Ok(report) => report,
            Err(err) => {
                error!(
                    "event=result_trigger module=service status=error athlete={} error={}",
                    result.athlete_id, err
                );
                return Err(ResultServiceError::Trigger(err));
            }
        };
        for failure in &report.failed {
            warn!(
                "event=result_trigger module=service status=partial athlete={} category={} error={}",
                result.athlete_id, failure.category_id, failure.error
            );
        }
        Ok(report)
    }

    /// Builds, validates and saves a result in one call.
    pub fn record(
        &self,
        athlete_id: AthleteId,
        discipline: Discipline,
        attempts: RawAttempts,
    ) -> Result<RecomputeReport, ResultServiceError> {
        let result = DisciplineResult::new(athlete_id, discipline, attempts)?;
        self.save_result(&result)
    }

    pub fn get_result(
        &self,
        athlete_id: AthleteId,
        discipline: Discipline,
    ) -> Result<Option<DisciplineResult>, ResultServiceError> {
        Ok(self.repo.get_result(athlete_id, discipline)?)
    }

    pub fn recompute_service(&self) -> &RecomputeService<S> {
        &self.recompute
    }
}
