//! Start list generation for lifting stations.
//!
//! # Invariants
//! - Athletes are assigned in surname, first name order.
//! - Station numbers are 1-based and every requested station is returned,
//!   even when it stays empty.

use crate::model::athlete::Athlete;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How athletes are spread over stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StationDistribution {
    /// Contiguous blocks of `ceil(athletes / stations)`.
    #[default]
    Even,
    /// Athlete `i` goes to station `i % stations`.
    RoundRobin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartListError {
    NoStations,
}

impl Display for StartListError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoStations => write!(f, "station count must be greater than 0"),
        }
    }
}

impl Error for StartListError {}

/// One lifting platform and its athletes in start order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub number: usize,
    pub athletes: Vec<Athlete>,
}

pub fn build_start_list(
    athletes: &[Athlete],
    stations: usize,
    distribution: StationDistribution,
) -> Result<Vec<Station>, StartListError> {
    if stations == 0 {
        return Err(StartListError::NoStations);
    }

    let mut ordered: Vec<&Athlete> = athletes.iter().collect();
    ordered.sort_by(|left, right| {
        left.surname
            .cmp(&right.surname)
            .then_with(|| left.first_name.cmp(&right.first_name))
            .then_with(|| left.uuid.cmp(&right.uuid))
    });

    let mut list: Vec<Station> = (1..=stations)
        .map(|number| Station {
            number,
            athletes: Vec::new(),
        })
        .collect();

    match distribution {
        StationDistribution::Even => {
            let per_station = ordered.len().div_ceil(stations).max(1);
            for (station, chunk) in list.iter_mut().zip(ordered.chunks(per_station)) {
                station.athletes = chunk.iter().map(|athlete| (*athlete).clone()).collect();
            }
        }
        StationDistribution::RoundRobin => {
            for (index, athlete) in ordered.into_iter().enumerate() {
                list[index % stations].athletes.push(athlete.clone());
            }
        }
    }

    Ok(list)
}
