//! Roster use-case service.
//!
//! # Responsibility
//! - Register and update athletes, create and configure categories.
//! - Manage category membership, seeding result rows on enrollment.
//! - Keep standings current after roster changes that affect ranking.
//!
//! # Invariants
//! - Category discipline codes are trimmed, lowercased and deduplicated
//!   in their given order; unrecognized codes are dropped.
//! - Enrollment never overwrites an existing result row.

use crate::model::athlete::{
    Athlete, AthleteId, AthleteValidationError, Category, CategoryId,
};
use crate::model::discipline::Discipline;
use crate::repo::athlete_repo::{AthleteRepository, RepoError};
use crate::repo::result_repo::ResultRepository;
use crate::repo::standings_repo::StandingsRepository;
use crate::service::recompute_service::{
    CategoryRecompute, RecomputeError, RecomputeReport, RecomputeService,
};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Errors from roster operations.
#[derive(Debug)]
pub enum RosterServiceError {
    InvalidRoster(AthleteValidationError),
    AthleteNotFound(AthleteId),
    CategoryNotFound(CategoryId),
    /// No category matches the given uuid or name.
    UnknownCategory(String),
    DuplicateCategoryName(String),
    NotEnrolled {
        athlete_id: AthleteId,
        category_id: CategoryId,
    },
    Repo(RepoError),
    Recompute(RecomputeError),
}

impl Display for RosterServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRoster(err) => write!(f, "{err}"),
            Self::AthleteNotFound(id) => write!(f, "athlete not found: {id}"),
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::UnknownCategory(value) => write!(f, "unknown category: `{value}`"),
            Self::DuplicateCategoryName(name) => {
                write!(f, "category name already exists: `{name}`")
            }
            Self::NotEnrolled {
                athlete_id,
                category_id,
            } => write!(
                f,
                "athlete {athlete_id} is not enrolled in category {category_id}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Recompute(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RosterServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRoster(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Recompute(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RosterServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvalidRoster(err),
            RepoError::DuplicateCategoryName(name) => Self::DuplicateCategoryName(name),
            RepoError::NotFound {
                entity: "athlete",
                id,
            } => Self::AthleteNotFound(id),
            RepoError::NotFound {
                entity: "category",
                id,
            } => Self::CategoryNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<RecomputeError> for RosterServiceError {
    fn from(value: RecomputeError) -> Self {
        match value {
            RecomputeError::CategoryNotFound(id) => Self::CategoryNotFound(id),
            other => Self::Recompute(other),
        }
    }
}

/// Normalizes configured discipline codes.
///
/// Codes are trimmed and lowercased; duplicates keep their first position and
/// codes outside the discipline enumeration are dropped with a warning.
pub fn normalize_discipline_codes<T: AsRef<str>>(codes: &[T]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes {
        let raw = code.as_ref();
        match Discipline::from_code(raw) {
            Some(discipline) => {
                let code = discipline.code().to_string();
                if !normalized.contains(&code) {
                    normalized.push(code);
                }
            }
            None => warn!(
                "event=category_disciplines module=service status=skipped discipline_code={} reason=unknown_discipline",
                raw.trim()
            ),
        }
    }
    normalized
}

/// Roster service facade.
pub struct RosterService<A, R, S>
where
    A: AthleteRepository,
    R: ResultRepository,
    S: StandingsRepository,
{
    roster: A,
    results: R,
    recompute: RecomputeService<S>,
}

impl<A, R, S> RosterService<A, R, S>
where
    A: AthleteRepository,
    R: ResultRepository,
    S: StandingsRepository,
{
    pub fn new(roster: A, results: R, standings: S) -> Self {
        Self {
            roster,
            results,
            recompute: RecomputeService::new(standings),
        }
    }

    pub fn register_athlete(&self, athlete: &Athlete) -> Result<AthleteId, RosterServiceError> {
        let id = self.roster.create_athlete(athlete)?;
        info!("event=athlete_register module=service status=ok athlete={id}");
        Ok(id)
    }

    /// Persists athlete changes and recomputes all of their categories, since
    /// body weight and the tie-break flag feed the rankings.
    pub fn update_athlete(&self, athlete: &Athlete) -> Result<RecomputeReport, RosterServiceError> {
        self.roster.update_athlete(athlete)?;
        Ok(self.recompute.on_result_saved(athlete.uuid)?)
    }

    pub fn get_athlete(&self, id: AthleteId) -> Result<Option<Athlete>, RosterServiceError> {
        Ok(self.roster.get_athlete(id)?)
    }

    pub fn list_athletes(&self, category_id: CategoryId) -> Result<Vec<Athlete>, RosterServiceError> {
        Ok(self.roster.list_athletes_in_category(category_id)?)
    }

    /// Creates a category with normalized discipline codes.
    pub fn create_category<T: AsRef<str>>(
        &self,
        name: &str,
        codes: &[T],
    ) -> Result<Category, RosterServiceError> {
        let category = Category {
            uuid: Uuid::new_v4(),
            name: name.trim().to_string(),
            disciplines: normalize_discipline_codes(codes),
        };
        self.roster.create_category(&category)?;
        info!(
            "event=category_create module=service status=ok category={} disciplines={}",
            category.uuid,
            category.disciplines.len()
        );
        Ok(category)
    }

    /// Replaces the category's disciplines and recomputes it.
    ///
    /// Emptying the list clears the category's standings; the recompute that
    /// follows is a no-op.
    pub fn set_category_disciplines<T: AsRef<str>>(
        &self,
        category_id: CategoryId,
        codes: &[T],
    ) -> Result<CategoryRecompute, RosterServiceError> {
        let normalized = normalize_discipline_codes(codes);
        self.roster.set_category_disciplines(category_id, &normalized)?;
        Ok(self.recompute.recompute_category(category_id)?)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>, RosterServiceError> {
        Ok(self.roster.list_categories()?)
    }

    /// Looks a category up by uuid text first, then by case-insensitive name.
    pub fn resolve_category(&self, value: &str) -> Result<Category, RosterServiceError> {
        let value = value.trim();
        if let Ok(id) = Uuid::parse_str(value) {
            if let Some(category) = self.roster.get_category(id)? {
                return Ok(category);
            }
        }
        self.roster
            .find_category_by_name(value)?
            .ok_or_else(|| RosterServiceError::UnknownCategory(value.to_string()))
    }

    /// Adds the athlete to a category, seeds zeroed result rows for its
    /// enabled disciplines and recomputes the athlete's categories.
    pub fn enroll_athlete(
        &self,
        athlete_id: AthleteId,
        category_id: CategoryId,
    ) -> Result<RecomputeReport, RosterServiceError> {
        let created = self.roster.enroll(athlete_id, category_id)?;
        let category = self
            .roster
            .get_category(category_id)?
            .ok_or(RosterServiceError::CategoryNotFound(category_id))?;

        let mut seeded = 0_usize;
        for discipline in category.enabled_disciplines() {
            if self.results.insert_default_if_absent(athlete_id, discipline)? {
                seeded += 1;
            }
        }
        info!(
            "event=athlete_enroll module=service status=ok athlete={} category={} created={} seeded_results={}",
            athlete_id, category_id, created, seeded
        );
        Ok(self.recompute.on_result_saved(athlete_id)?)
    }

    /// Removes the athlete from a category together with their standings
    /// there, then recomputes the category. Result rows are kept.
    pub fn withdraw_athlete(
        &self,
        athlete_id: AthleteId,
        category_id: CategoryId,
    ) -> Result<CategoryRecompute, RosterServiceError> {
        if !self.roster.withdraw(athlete_id, category_id)? {
            return Err(RosterServiceError::NotEnrolled {
                athlete_id,
                category_id,
            });
        }
        info!(
            "event=athlete_withdraw module=service status=ok athlete={athlete_id} category={category_id}"
        );
        Ok(self.recompute.recompute_category(category_id)?)
    }

    pub fn recompute_service(&self) -> &RecomputeService<S> {
        &self.recompute
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_discipline_codes;

    #[test]
    fn normalize_discipline_codes_dedupes_and_drops_unknown() {
        let codes = normalize_discipline_codes(&[" Snatch", "tgu", "bench_press", "SNATCH", "kb_squat"]);
        assert_eq!(codes, vec!["snatch", "tgu", "kb_squat"]);
    }

    #[test]
    fn normalize_discipline_codes_accepts_empty_input() {
        let codes: [&str; 0] = [];
        assert!(normalize_discipline_codes(&codes).is_empty());
    }
}
