//! Score formulas for each discipline shape.
//!
//! # Invariants
//! - Every function returns a finite, non-negative value.
//! - Unset, negative and non-finite inputs count as zero.

use crate::model::discipline::Discipline;

/// Snatch score: kettlebell weight times repetitions.
pub fn load_reps_score(weight: Option<f64>, repetitions: Option<i64>) -> f64 {
    let weight = attempt_value(weight);
    let repetitions = repetitions.unwrap_or(0);
    if weight <= 0.0 || repetitions <= 0 {
        return 0.0;
    }
    weight * repetitions as f64
}

/// Best of three single-value attempts.
pub fn best_single_attempt(results: &[Option<f64>; 3]) -> f64 {
    results
        .iter()
        .map(|value| attempt_value(*value))
        .fold(0.0, f64::max)
}

/// One two-limb attempt. A one-sided lift does not count.
pub fn two_limb_attempt(left: Option<f64>, right: Option<f64>) -> f64 {
    let left = attempt_value(left);
    let right = attempt_value(right);
    if left > 0.0 && right > 0.0 {
        left + right
    } else {
        0.0
    }
}

/// Best of three two-limb attempts.
pub fn best_two_limb_attempt(left: &[Option<f64>; 3], right: &[Option<f64>; 3]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(left, right)| two_limb_attempt(*left, *right))
        .fold(0.0, f64::max)
}

/// Value the ranking pass sorts on.
///
/// Snatch ranks on the raw score; every other discipline on the score per
/// kilogram of body weight, or 0 when either side is not positive.
pub fn comparable_value(discipline: Discipline, score: f64, body_weight: Option<f64>) -> f64 {
    let score = attempt_value(Some(score));
    if !discipline.is_body_weight_relative() {
        return score;
    }
    match valid_body_weight(body_weight) {
        Some(weight) if score > 0.0 => score / weight,
        _ => 0.0,
    }
}

/// Score as a percentage of body weight, rounded to 2 decimals.
///
/// Returns `None` when body weight is unset or not positive.
pub fn body_weight_percentage(score: f64, body_weight: Option<f64>) -> Option<f64> {
    let weight = valid_body_weight(body_weight)?;
    let score = attempt_value(Some(score));
    Some(round_to(score / weight * 100.0, 2))
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

fn attempt_value(value: Option<f64>) -> f64 {
    match value {
        Some(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

fn valid_body_weight(body_weight: Option<f64>) -> Option<f64> {
    body_weight.filter(|weight| weight.is_finite() && *weight > 0.0)
}
