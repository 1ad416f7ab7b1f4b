// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::WeightConfig;
use crate::errors::ConfigError;
use crate::model::{Station, WeightSet};

/// Geographic station weighting that down-weights dense clusters.
///
/// `w_i = 1 / (1 + Σ_{j≠i} exp(-(d_ij / d0)²))` with great-circle distance `d_ij`
/// in kilometres and reference distance `d0`.
#[derive(Debug, Clone)]
pub struct StationWeightCalculator {
    reference_distance: f64,
}

impl StationWeightCalculator {
    pub fn new(config: &WeightConfig) -> Self {
        Self {
            reference_distance: config.reference_distance(),
        }
    }

    pub fn compute_weights(&self, stations: &[Station]) -> Result<WeightSet, ConfigError> {
        let mut sorted: Vec<&Station> = stations.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0].id == pair[1].id && pair[0] != pair[1]) {
            return Err(ConfigError::invalid(
                "stations",
                format!("station {} is listed twice with different coordinates", pair[0].id),
            ));
        }
        sorted.dedup_by(|a, b| a.id == b.id);

        let mut weights = WeightSet::new();
        for (i, station) in sorted.iter().enumerate() {
            let crowding: f64 = sorted
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, other)| {
                    let ratio = station.distance_km(other) / self.reference_distance;
                    (-ratio * ratio).exp()
                })
                .sum();
            weights.insert(station.id.clone(), 1.0 / (1.0 + crowding))?;
        }
        Ok(weights)
    }
}
