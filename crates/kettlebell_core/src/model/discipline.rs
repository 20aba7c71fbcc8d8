//! Discipline enumeration and input shapes.
//!
//! # Invariants
//! - Codes are stable lowercase identifiers shared with storage and wire formats.
//! - Each discipline has exactly one canonical `DisciplineShape`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Raw input layout recorded for a discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisciplineShape {
    /// Kettlebell weight times completed repetitions.
    LoadReps,
    /// Three attempts, one value each.
    SingleLimb,
    /// Three attempts, a left and a right value each.
    TwoLimb,
}

/// One scored competition exercise.
///
/// Ordering follows declaration order and is used wherever disciplines are
/// listed without a category-specific order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Snatch,
    Tgu,
    PistolSquat,
    SeeSawPress,
    KbSquat,
    OneKettlebellPress,
    TwoKettlebellPress,
}

impl Discipline {
    pub const ALL: [Discipline; 7] = [
        Discipline::Snatch,
        Discipline::Tgu,
        Discipline::PistolSquat,
        Discipline::SeeSawPress,
        Discipline::KbSquat,
        Discipline::OneKettlebellPress,
        Discipline::TwoKettlebellPress,
    ];

    /// Stable storage code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Snatch => "snatch",
            Self::Tgu => "tgu",
            Self::PistolSquat => "pistol_squat",
            Self::SeeSawPress => "see_saw_press",
            Self::KbSquat => "kb_squat",
            Self::OneKettlebellPress => "one_kettlebell_press",
            Self::TwoKettlebellPress => "two_kettlebell_press",
        }
    }

    /// Parses a storage code. Surrounding whitespace and case are ignored.
    ///
    /// Returns `None` for codes outside the fixed enumeration; callers skip
    /// those rather than failing.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|discipline| discipline.code() == normalized)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Snatch => "Snatch",
            Self::Tgu => "Turkish Get-Up",
            Self::PistolSquat => "Pistol Squat",
            Self::SeeSawPress => "See-Saw Press",
            Self::KbSquat => "Kettlebell Squat",
            Self::OneKettlebellPress => "One Kettlebell Press",
            Self::TwoKettlebellPress => "Two Kettlebell Press",
        }
    }

    pub fn shape(self) -> DisciplineShape {
        match self {
            Self::Snatch => DisciplineShape::LoadReps,
            Self::Tgu
            | Self::PistolSquat
            | Self::KbSquat
            | Self::OneKettlebellPress
            | Self::TwoKettlebellPress => DisciplineShape::SingleLimb,
            Self::SeeSawPress => DisciplineShape::TwoLimb,
        }
    }

    /// Whether ranking divides the score by the athlete's body weight.
    pub fn is_body_weight_relative(self) -> bool {
        self.shape() != DisciplineShape::LoadReps
    }

    /// Column in `overall_results` holding this discipline's points.
    pub(crate) fn points_column(self) -> &'static str {
        match self {
            Self::Snatch => "snatch_points",
            Self::Tgu => "tgu_points",
            Self::PistolSquat => "pistol_squat_points",
            Self::SeeSawPress => "see_saw_press_points",
            Self::KbSquat => "kb_squat_points",
            Self::OneKettlebellPress => "one_kettlebell_press_points",
            Self::TwoKettlebellPress => "two_kettlebell_press_points",
        }
    }
}

impl Display for Discipline {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
