//! Athlete and category roster model.
//!
//! # Responsibility
//! - Define the competitor record read by the ranking engine.
//! - Define categories and the discipline codes they enable.
//!
//! # Invariants
//! - `uuid` is stable and never nil for persisted records.
//! - `body_weight`, when set, is finite and strictly positive.
//! - Category discipline codes keep their configured order.

use crate::model::discipline::Discipline;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type AthleteId = Uuid;
pub type CategoryId = Uuid;

/// Validation failures for roster records.
#[derive(Debug, Clone, PartialEq)]
pub enum AthleteValidationError {
    NilUuid,
    BlankFirstName,
    BlankSurname,
    InvalidBodyWeight(f64),
    BlankCategoryName,
}

impl Display for AthleteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid => write!(f, "uuid must not be nil"),
            Self::BlankFirstName => write!(f, "athlete first name must not be blank"),
            Self::BlankSurname => write!(f, "athlete surname must not be blank"),
            Self::InvalidBodyWeight(value) => {
                write!(f, "body weight must be a positive number, got {value}")
            }
            Self::BlankCategoryName => write!(f, "category name must not be blank"),
        }
    }
}

impl Error for AthleteValidationError {}

/// A competitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Athlete {
    pub uuid: AthleteId,
    pub first_name: String,
    pub surname: String,
    /// Kilograms. `None` until weigh-in; relative disciplines score 0 without it.
    pub body_weight: Option<f64>,
    /// Informational only, never used in ranking.
    pub club: Option<String>,
    /// Applies the fixed tie-break adjustment to the overall total.
    pub tiebreak: bool,
}

impl Athlete {
    /// Creates an athlete with a generated id and no weigh-in yet.
    pub fn new(first_name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            first_name: first_name.into(),
            surname: surname.into(),
            body_weight: None,
            club: None,
            tiebreak: false,
        }
    }

    /// Sets body weight, builder style.
    pub fn weighing(mut self, body_weight: f64) -> Self {
        self.body_weight = Some(body_weight);
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
    }

    /// Checks roster invariants before persistence.
    pub fn validate(&self) -> Result<(), AthleteValidationError> {
        if self.uuid.is_nil() {
            return Err(AthleteValidationError::NilUuid);
        }
        if self.first_name.trim().is_empty() {
            return Err(AthleteValidationError::BlankFirstName);
        }
        if self.surname.trim().is_empty() {
            return Err(AthleteValidationError::BlankSurname);
        }
        if let Some(weight) = self.body_weight {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(AthleteValidationError::InvalidBodyWeight(weight));
            }
        }
        Ok(())
    }
}

/// A competition bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub uuid: CategoryId,
    pub name: String,
    /// Discipline codes as stored, in configured order.
    ///
    /// Codes outside the fixed enumeration may appear in storage written by
    /// other collaborators; `enabled_disciplines` drops them.
    pub disciplines: Vec<String>,
}

impl Category {
    pub fn new(name: impl Into<String>, disciplines: &[Discipline]) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            disciplines: disciplines
                .iter()
                .map(|discipline| discipline.code().to_string())
                .collect(),
        }
    }

    /// Recognized disciplines in configured order, without duplicates.
    pub fn enabled_disciplines(&self) -> Vec<Discipline> {
        let mut enabled = Vec::with_capacity(self.disciplines.len());
        for code in &self.disciplines {
            if let Some(discipline) = Discipline::from_code(code) {
                if !enabled.contains(&discipline) {
                    enabled.push(discipline);
                }
            }
        }
        enabled
    }

    pub fn validate(&self) -> Result<(), AthleteValidationError> {
        if self.uuid.is_nil() {
            return Err(AthleteValidationError::NilUuid);
        }
        if self.name.trim().is_empty() {
            return Err(AthleteValidationError::BlankCategoryName);
        }
        Ok(())
    }
}
