//! Raw discipline results and computed standings records.
//!
//! # Responsibility
//! - Carry raw attempt fields in the shape their discipline requires.
//! - Carry the per-category overall record owned by the aggregation pass.
//!
//! # Invariants
//! - `DisciplineResult::attempts` shape always equals `discipline.shape()`.
//! - Stored attempt values are finite and non-negative.
//! - `OverallResult::points` holds only disciplines enabled for its category.

use crate::model::athlete::{AthleteId, CategoryId};
use crate::model::discipline::{Discipline, DisciplineShape};
use crate::scoring::formula;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failures for raw result rows.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValidationError {
    NilAthlete,
    ShapeMismatch {
        discipline: Discipline,
        expected: DisciplineShape,
        actual: DisciplineShape,
    },
    InvalidValue {
        field: &'static str,
        value: f64,
    },
    NegativeRepetitions(i64),
}

impl Display for ResultValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilAthlete => write!(f, "result must reference an athlete"),
            Self::ShapeMismatch {
                discipline,
                expected,
                actual,
            } => write!(
                f,
                "discipline `{discipline}` expects {expected:?} attempts, got {actual:?}"
            ),
            Self::InvalidValue { field, value } => {
                write!(f, "attempt field `{field}` must be finite and >= 0, got {value}")
            }
            Self::NegativeRepetitions(value) => {
                write!(f, "repetitions must be >= 0, got {value}")
            }
        }
    }
}

impl Error for ResultValidationError {}

/// Raw attempt fields. Unset values count as zero when scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RawAttempts {
    LoadReps {
        weight: Option<f64>,
        repetitions: Option<i64>,
    },
    SingleLimb {
        results: [Option<f64>; 3],
    },
    TwoLimb {
        left: [Option<f64>; 3],
        right: [Option<f64>; 3],
    },
}

impl RawAttempts {
    /// All-zero attempts for a shape, used when seeding enrollments.
    pub fn zeroed(shape: DisciplineShape) -> Self {
        match shape {
            DisciplineShape::LoadReps => Self::LoadReps {
                weight: Some(0.0),
                repetitions: Some(0),
            },
            DisciplineShape::SingleLimb => Self::SingleLimb {
                results: [Some(0.0); 3],
            },
            DisciplineShape::TwoLimb => Self::TwoLimb {
                left: [Some(0.0); 3],
                right: [Some(0.0); 3],
            },
        }
    }

    pub fn shape(&self) -> DisciplineShape {
        match self {
            Self::LoadReps { .. } => DisciplineShape::LoadReps,
            Self::SingleLimb { .. } => DisciplineShape::SingleLimb,
            Self::TwoLimb { .. } => DisciplineShape::TwoLimb,
        }
    }

    /// Athlete score for these attempts; always finite and >= 0.
    pub fn score(&self) -> f64 {
        match self {
            Self::LoadReps {
                weight,
                repetitions,
            } => formula::load_reps_score(*weight, *repetitions),
            Self::SingleLimb { results } => formula::best_single_attempt(results),
            Self::TwoLimb { left, right } => formula::best_two_limb_attempt(left, right),
        }
    }

    fn validate_values(&self) -> Result<(), ResultValidationError> {
        match self {
            Self::LoadReps {
                weight,
                repetitions,
            } => {
                check_value("weight", *weight)?;
                if let Some(reps) = repetitions {
                    if *reps < 0 {
                        return Err(ResultValidationError::NegativeRepetitions(*reps));
                    }
                }
                Ok(())
            }
            Self::SingleLimb { results } => {
                for (field, value) in ["result_1", "result_2", "result_3"].into_iter().zip(results) {
                    check_value(field, *value)?;
                }
                Ok(())
            }
            Self::TwoLimb { left, right } => {
                for (field, value) in ["left_1", "left_2", "left_3"].into_iter().zip(left) {
                    check_value(field, *value)?;
                }
                for (field, value) in ["right_1", "right_2", "right_3"].into_iter().zip(right) {
                    check_value(field, *value)?;
                }
                Ok(())
            }
        }
    }
}

fn check_value(field: &'static str, value: Option<f64>) -> Result<(), ResultValidationError> {
    match value {
        Some(value) if !value.is_finite() || value < 0.0 => {
            Err(ResultValidationError::InvalidValue { field, value })
        }
        _ => Ok(()),
    }
}

/// One athlete's raw result for one discipline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisciplineResult {
    pub athlete_id: AthleteId,
    pub discipline: Discipline,
    pub attempts: RawAttempts,
}

impl DisciplineResult {
    /// Builds a validated result row.
    pub fn new(
        athlete_id: AthleteId,
        discipline: Discipline,
        attempts: RawAttempts,
    ) -> Result<Self, ResultValidationError> {
        let result = Self {
            athlete_id,
            discipline,
            attempts,
        };
        result.validate()?;
        Ok(result)
    }

    pub fn zeroed(athlete_id: AthleteId, discipline: Discipline) -> Self {
        Self {
            athlete_id,
            discipline,
            attempts: RawAttempts::zeroed(discipline.shape()),
        }
    }

    pub fn validate(&self) -> Result<(), ResultValidationError> {
        if self.athlete_id.is_nil() {
            return Err(ResultValidationError::NilAthlete);
        }
        let expected = self.discipline.shape();
        let actual = self.attempts.shape();
        if expected != actual {
            return Err(ResultValidationError::ShapeMismatch {
                discipline: self.discipline,
                expected,
                actual,
            });
        }
        self.attempts.validate_values()
    }

    pub fn score(&self) -> f64 {
        self.attempts.score()
    }

    /// Value the ranking pass sorts on.
    pub fn comparable_value(&self, body_weight: Option<f64>) -> f64 {
        formula::comparable_value(self.discipline, self.score(), body_weight)
    }

    /// Display-only share of body weight, never used for ranking.
    pub fn body_weight_percentage(&self, body_weight: Option<f64>) -> Option<f64> {
        formula::body_weight_percentage(self.score(), body_weight)
    }
}

/// Aggregated standing of one athlete inside one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallResult {
    pub category_id: CategoryId,
    pub athlete_id: AthleteId,
    /// Discipline rank as points; absent when the discipline is disabled for
    /// the category or the athlete has no result row.
    pub points: BTreeMap<Discipline, f64>,
    pub tiebreak_points: f64,
    pub total_points: f64,
    pub final_position: u32,
}
