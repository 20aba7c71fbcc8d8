//! Competition ("1-1-3") ranking with shared ranks for ties.
//!
//! # Invariants
//! - Ranks are 1-based.
//! - Entries whose value is within `RANK_EPSILON` of the previous entry share
//!   its rank; the next distinct value takes its ordinal, so ranks skip.
//! - Name order only decides the sequence inside a tie, never the rank.

use std::cmp::Ordering;

/// Values closer than this to the previous entry count as a tie.
pub const RANK_EPSILON: f64 = 1e-6;

/// Which end of the value range wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOrder {
    /// Discipline scores: more is better.
    HigherIsBetter,
    /// Overall totals: fewer points is better.
    LowerIsBetter,
}

/// One competitor to rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RankEntry<'a, K> {
    pub key: K,
    pub value: f64,
    pub surname: &'a str,
    pub first_name: &'a str,
}

/// Ranked competitor in final sequence order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked<K> {
    pub key: K,
    pub value: f64,
    pub rank: u32,
}

/// Ranks entries and returns them in standing order.
///
/// The sort is deterministic: value by `order`, then surname, then first
/// name, then key.
pub fn competition_ranks<K>(entries: &[RankEntry<'_, K>], order: RankOrder) -> Vec<Ranked<K>>
where
    K: Ord + Copy,
{
    let mut sorted: Vec<&RankEntry<'_, K>> = entries.iter().collect();
    sorted.sort_by(|left, right| {
        compare_values(left.value, right.value, order)
            .then_with(|| left.surname.cmp(right.surname))
            .then_with(|| left.first_name.cmp(right.first_name))
            .then_with(|| left.key.cmp(&right.key))
    });

    let mut ranked = Vec::with_capacity(sorted.len());
    let mut current_rank = 0_u32;
    let mut previous: Option<f64> = None;
    for (index, entry) in sorted.into_iter().enumerate() {
        let ordinal = index as u32 + 1;
        let value = sortable(entry.value);
        match previous {
            Some(last) if (value - last).abs() <= RANK_EPSILON => {}
            _ => current_rank = ordinal,
        }
        previous = Some(value);
        ranked.push(Ranked {
            key: entry.key,
            value,
            rank: current_rank,
        });
    }
    ranked
}

fn compare_values(left: f64, right: f64, order: RankOrder) -> Ordering {
    let (left, right) = (sortable(left), sortable(right));
    match order {
        RankOrder::HigherIsBetter => right.total_cmp(&left),
        RankOrder::LowerIsBetter => left.total_cmp(&right),
    }
}

// NaN never reaches here from the formulas; map it to 0 so the sort stays total.
fn sortable(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::{competition_ranks, RankEntry, RankOrder};

    fn entry<'a>(key: u32, value: f64, surname: &'a str, first_name: &'a str) -> RankEntry<'a, u32> {
        RankEntry {
            key,
            value,
            surname,
            first_name,
        }
    }

    fn ranks_by_key(entries: &[RankEntry<'_, u32>], order: RankOrder) -> Vec<(u32, u32)> {
        let mut ranks: Vec<_> = competition_ranks(entries, order)
            .into_iter()
            .map(|ranked| (ranked.key, ranked.rank))
            .collect();
        ranks.sort();
        ranks
    }

    #[test]
    fn ties_share_rank_and_next_rank_skips() {
        let entries = [
            entry(1, 100.0, "Adams", "Ann"),
            entry(2, 100.0, "Brown", "Bob"),
            entry(3, 80.0, "Clark", "Cid"),
        ];
        assert_eq!(
            ranks_by_key(&entries, RankOrder::HigherIsBetter),
            vec![(1, 1), (2, 1), (3, 3)]
        );
    }

    #[test]
    fn values_within_epsilon_tie() {
        let entries = [
            entry(1, 0.5, "Adams", "Ann"),
            entry(2, 0.5 + 1e-9, "Brown", "Bob"),
            entry(3, 0.49, "Clark", "Cid"),
        ];
        assert_eq!(
            ranks_by_key(&entries, RankOrder::HigherIsBetter),
            vec![(1, 1), (2, 1), (3, 3)]
        );
    }

    #[test]
    fn tie_sequence_is_ordered_by_surname_then_first_name() {
        let entries = [
            entry(1, 10.0, "Zed", "Amy"),
            entry(2, 10.0, "Abel", "Zoe"),
            entry(3, 10.0, "Abel", "Adam"),
        ];
        let keys: Vec<u32> = competition_ranks(&entries, RankOrder::HigherIsBetter)
            .into_iter()
            .map(|ranked| ranked.key)
            .collect();
        assert_eq!(keys, vec![3, 2, 1]);
    }

    #[test]
    fn lower_is_better_for_totals() {
        let entries = [
            entry(1, 3.0, "Adams", "Ann"),
            entry(2, 1.0, "Brown", "Bob"),
            entry(3, 3.0, "Clark", "Cid"),
            entry(4, 2.5, "Dunn", "Dee"),
        ];
        assert_eq!(
            ranks_by_key(&entries, RankOrder::LowerIsBetter),
            vec![(1, 3), (2, 1), (3, 3), (4, 2)]
        );
    }

    #[test]
    fn all_zero_values_rank_first_together() {
        let entries = [
            entry(1, 0.0, "Adams", "Ann"),
            entry(2, 0.0, "Brown", "Bob"),
        ];
        assert_eq!(
            ranks_by_key(&entries, RankOrder::HigherIsBetter),
            vec![(1, 1), (2, 1)]
        );
    }

    #[test]
    fn empty_input_yields_no_ranks() {
        let entries: [RankEntry<'_, u32>; 0] = [];
        assert!(competition_ranks(&entries, RankOrder::HigherIsBetter).is_empty());
    }
}
