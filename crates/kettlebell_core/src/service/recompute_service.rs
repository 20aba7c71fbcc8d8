//! Category recompute engine and standings read model.
//!
//! # Responsibility
//! - Rank every enabled discipline of a category.
//! - Aggregate discipline ranks into totals and final positions.
//! - Re-run both passes for each category touched by a write.
//!
//! # Invariants
//! - Athletes are ranked by category membership, not by result existence;
//!   an athlete without a result row is ranked with value 0.
//! - Positions and points are only published for athletes with a result row.
//! - A discipline position is written only when it differs from storage.
//! - Each category is written as one batch; a failing category never stops
//!   the remaining ones.

use crate::model::athlete::{Athlete, AthleteId, CategoryId};
use crate::model::discipline::Discipline;
use crate::model::result::{DisciplineResult, OverallResult};
use crate::repo::athlete_repo::RepoError;
use crate::repo::standings_repo::{PositionUpdate, StandingsBatch, StandingsRepository};
use crate::scoring::formula::round_to;
use crate::scoring::ranking::{competition_ranks, RankEntry, RankOrder};
use log::{debug, error, info};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Added to the total of athletes flagged for tie-break.
pub const TIEBREAK_ADJUSTMENT: f64 = -0.5;

/// Errors from recompute and standings operations.
#[derive(Debug)]
pub enum RecomputeError {
    CategoryNotFound(CategoryId),
    DisciplineNotEnabled {
        category_id: CategoryId,
        discipline: Discipline,
    },
    Repo(RepoError),
}

impl Display for RecomputeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::DisciplineNotEnabled {
                category_id,
                discipline,
            } => write!(
                f,
                "discipline `{discipline}` is not enabled for category {category_id}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RecomputeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RecomputeError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Summary of one category recompute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecompute {
    pub category_id: CategoryId,
    pub athlete_count: usize,
    /// Disciplines ranked, in category order.
    pub disciplines: Vec<Discipline>,
    pub positions_written: usize,
}

/// One category that could not be recomputed.
#[derive(Debug)]
pub struct CategoryFailure {
    pub category_id: CategoryId,
    pub error: RecomputeError,
}

/// Outcome of recomputing several categories.
#[derive(Debug, Default)]
pub struct RecomputeReport {
    pub recomputed: Vec<CategoryRecompute>,
    pub failed: Vec<CategoryFailure>,
}

impl RecomputeReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Overall standing row with athlete display fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingRow {
    pub athlete_id: AthleteId,
    pub first_name: String,
    pub surname: String,
    pub club: Option<String>,
    pub overall: OverallResult,
}

/// Per-discipline standing row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisciplineStandingRow {
    pub athlete_id: AthleteId,
    pub first_name: String,
    pub surname: String,
    pub has_result: bool,
    pub score: f64,
    pub comparable_value: f64,
    /// Display only.
    pub body_weight_percentage: Option<f64>,
    /// `None` until the athlete has a result row and a recompute ran.
    pub position: Option<u32>,
}

/// Ranking engine over a standings repository.
pub struct RecomputeService<S: StandingsRepository> {
    repo: S,
}

impl<S: StandingsRepository> RecomputeService<S> {
    pub fn new(repo: S) -> Self {
        Self { repo }
    }

    /// Recomputes all discipline positions and the overall standings of one
    /// category, then writes them as one batch.
    pub fn recompute_category(
        &self,
        category_id: CategoryId,
    ) -> Result<CategoryRecompute, RecomputeError> {
        let started_at = Instant::now();
        match self.run_category(category_id) {
            Ok(outcome) => {
                info!(
                    "event=category_recompute module=service status=ok category={} athletes={} disciplines={} positions_written={} duration_ms={}",
                    category_id,
                    outcome.athlete_count,
                    outcome.disciplines.len(),
                    outcome.positions_written,
                    started_at.elapsed().as_millis()
                );
                Ok(outcome)
            }
            Err(err) => {
                error!(
                    "event=category_recompute module=service status=error category={} duration_ms={} error={}",
                    category_id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Recomputes each category independently and collects the outcome.
    pub fn recompute_categories(&self, category_ids: &[CategoryId]) -> RecomputeReport {
        let mut report = RecomputeReport::default();
        for category_id in category_ids {
            match self.recompute_category(*category_id) {
                Ok(outcome) => report.recomputed.push(outcome),
                Err(error) => report.failed.push(CategoryFailure {
                    category_id: *category_id,
                    error,
                }),
            }
        }
        report
    }

    /// Change trigger: recomputes every category the athlete belongs to.
    ///
    /// Fails only when the memberships cannot be read; per-category failures
    /// are reported in `RecomputeReport::failed`.
    pub fn on_result_saved(&self, athlete_id: AthleteId) -> Result<RecomputeReport, RecomputeError> {
        let categories = self.repo.categories_for_athlete(athlete_id)?;
        if categories.is_empty() {
            debug!(
                "event=result_trigger module=service status=skipped athlete={athlete_id} reason=no_categories"
            );
            return Ok(RecomputeReport::default());
        }
        Ok(self.recompute_categories(&categories))
    }

    /// Overall standings ordered by final position, total, surname, first name.
    pub fn standings(&self, category_id: CategoryId) -> Result<Vec<StandingRow>, RecomputeError> {
        if self.repo.get_category(category_id)?.is_none() {
            return Err(RecomputeError::CategoryNotFound(category_id));
        }
        let athletes: HashMap<AthleteId, Athlete> = self
            .repo
            .athletes_in_category(category_id)?
            .into_iter()
            .map(|athlete| (athlete.uuid, athlete))
            .collect();

        let mut rows: Vec<StandingRow> = self
            .repo
            .list_overall(category_id)?
            .into_iter()
            .filter_map(|overall| {
                let athlete = athletes.get(&overall.athlete_id)?;
                Some(StandingRow {
                    athlete_id: athlete.uuid,
                    first_name: athlete.first_name.clone(),
                    surname: athlete.surname.clone(),
                    club: athlete.club.clone(),
                    overall,
                })
            })
            .collect();
        rows.sort_by(|left, right| {
            left.overall
                .final_position
                .cmp(&right.overall.final_position)
                .then_with(|| left.overall.total_points.total_cmp(&right.overall.total_points))
                .then_with(|| left.surname.cmp(&right.surname))
                .then_with(|| left.first_name.cmp(&right.first_name))
        });
        Ok(rows)
    }

    /// One discipline's scores and stored positions for every athlete of the
    /// category, ordered by position (unranked last), then name.
    pub fn discipline_standings(
        &self,
        category_id: CategoryId,
        discipline: Discipline,
    ) -> Result<Vec<DisciplineStandingRow>, RecomputeError> {
        let category = self
            .repo
            .get_category(category_id)?
            .ok_or(RecomputeError::CategoryNotFound(category_id))?;
        if !category.enabled_disciplines().contains(&discipline) {
            return Err(RecomputeError::DisciplineNotEnabled {
                category_id,
                discipline,
            });
        }

        let athletes = self.repo.athletes_in_category(category_id)?;
        let results = self.results_by_athlete(discipline, &athletes)?;
        let positions = self.repo.stored_positions(category_id, discipline)?;

        let mut rows: Vec<DisciplineStandingRow> = athletes
            .iter()
            .map(|athlete| {
                let result = results.get(&athlete.uuid);
                DisciplineStandingRow {
                    athlete_id: athlete.uuid,
                    first_name: athlete.first_name.clone(),
                    surname: athlete.surname.clone(),
                    has_result: result.is_some(),
                    score: result.map_or(0.0, DisciplineResult::score),
                    comparable_value: result
                        .map_or(0.0, |result| result.comparable_value(athlete.body_weight)),
                    body_weight_percentage: result
                        .and_then(|result| result.body_weight_percentage(athlete.body_weight)),
                    position: positions.get(&athlete.uuid).copied(),
                }
            })
            .collect();
        rows.sort_by(|left, right| {
            left.position
                .unwrap_or(u32::MAX)
                .cmp(&right.position.unwrap_or(u32::MAX))
                .then_with(|| left.surname.cmp(&right.surname))
                .then_with(|| left.first_name.cmp(&right.first_name))
        });
        Ok(rows)
    }

    fn run_category(&self, category_id: CategoryId) -> Result<CategoryRecompute, RecomputeError> {
        let category = self
            .repo
            .get_category(category_id)?
            .ok_or(RecomputeError::CategoryNotFound(category_id))?;

        let disciplines = category.enabled_disciplines();
        for code in &category.disciplines {
            if Discipline::from_code(code).is_none() {
                debug!(
                    "event=category_recompute module=service status=skipped category={category_id} discipline_code={code} reason=unknown_discipline"
                );
            }
        }

        let athletes = self.repo.athletes_in_category(category_id)?;
        let mut outcome = CategoryRecompute {
            category_id,
            athlete_count: athletes.len(),
            disciplines: disciplines.clone(),
            positions_written: 0,
        };
        if athletes.is_empty() || disciplines.is_empty() {
            debug!(
                "event=category_recompute module=service status=skipped category={} athletes={} disciplines={}",
                category_id,
                athletes.len(),
                disciplines.len()
            );
            outcome.disciplines.clear();
            return Ok(outcome);
        }

        let mut batch = StandingsBatch {
            category_id,
            ..StandingsBatch::default()
        };
        let mut points: HashMap<AthleteId, BTreeMap<Discipline, f64>> = HashMap::new();
        for discipline in &disciplines {
            self.rank_discipline(category_id, *discipline, &athletes, &mut batch, &mut points)?;
        }

        batch.overall = aggregate_overall(category_id, &athletes, points);
        outcome.positions_written = batch.positions.len();
        self.repo.apply_standings(&batch)?;
        Ok(outcome)
    }

    fn rank_discipline(
        &self,
        category_id: CategoryId,
        discipline: Discipline,
        athletes: &[Athlete],
        batch: &mut StandingsBatch,
        points: &mut HashMap<AthleteId, BTreeMap<Discipline, f64>>,
    ) -> Result<(), RecomputeError> {
        let results = self.results_by_athlete(discipline, athletes)?;
        let entries: Vec<RankEntry<'_, AthleteId>> = athletes
            .iter()
            .map(|athlete| RankEntry {
                key: athlete.uuid,
                value: results
                    .get(&athlete.uuid)
                    .map_or(0.0, |result| result.comparable_value(athlete.body_weight)),
                surname: athlete.surname.as_str(),
                first_name: athlete.first_name.as_str(),
            })
            .collect();

        let stored = self.repo.stored_positions(category_id, discipline)?;
        for ranked in competition_ranks(&entries, RankOrder::HigherIsBetter) {
            if !results.contains_key(&ranked.key) {
                continue;
            }
            points
                .entry(ranked.key)
                .or_default()
                .insert(discipline, f64::from(ranked.rank));
            if stored.get(&ranked.key) != Some(&ranked.rank) {
                batch.positions.push(PositionUpdate {
                    athlete_id: ranked.key,
                    discipline,
                    position: ranked.rank,
                });
            }
        }
        Ok(())
    }

    fn results_by_athlete(
        &self,
        discipline: Discipline,
        athletes: &[Athlete],
    ) -> Result<HashMap<AthleteId, DisciplineResult>, RecomputeError> {
        let ids: Vec<AthleteId> = athletes.iter().map(|athlete| athlete.uuid).collect();
        Ok(self
            .repo
            .results_for(discipline, &ids)?
            .into_iter()
            .map(|result| (result.athlete_id, result))
            .collect())
    }
}

/// Builds overall rows in final standing order.
fn aggregate_overall(
    category_id: CategoryId,
    athletes: &[Athlete],
    mut points: HashMap<AthleteId, BTreeMap<Discipline, f64>>,
) -> Vec<OverallResult> {
    let mut rows: HashMap<AthleteId, OverallResult> = HashMap::with_capacity(athletes.len());
    let mut entries = Vec::with_capacity(athletes.len());
    for athlete in athletes {
        let athlete_points = points.remove(&athlete.uuid).unwrap_or_default();
        let tiebreak_points = if athlete.tiebreak {
            TIEBREAK_ADJUSTMENT
        } else {
            0.0
        };
        let total_points = round_to(athlete_points.values().sum::<f64>() + tiebreak_points, 1);
        entries.push(RankEntry {
            key: athlete.uuid,
            value: total_points,
            surname: athlete.surname.as_str(),
            first_name: athlete.first_name.as_str(),
        });
        rows.insert(
            athlete.uuid,
            OverallResult {
                category_id,
                athlete_id: athlete.uuid,
                points: athlete_points,
                tiebreak_points,
                total_points,
                final_position: 1,
            },
        );
    }

    competition_ranks(&entries, RankOrder::LowerIsBetter)
        .into_iter()
        .filter_map(|ranked| {
            let mut row = rows.remove(&ranked.key)?;
            row.final_position = ranked.rank;
            Some(row)
        })
        .collect()
}
