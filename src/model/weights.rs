// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::station::StationId;
use crate::errors::ConfigError;

/// Weight applied to stations that are not part of a weight set.
pub const DEFAULT_STATION_WEIGHT: f64 = 1.0;

/// Station → strictly positive weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightSet {
    weights: BTreeMap<StationId, f64>,
}

impl WeightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a weight; zero, negative and non-finite values are refused.
    pub fn insert(&mut self, station: StationId, weight: f64) -> Result<(), ConfigError> {
        if !(weight.is_finite() && weight > 0.0) {
            return Err(ConfigError::invalid(
                &format!("weights.{}", station),
                format!("station weight must be positive and finite, got {weight}"),
            ));
        }
        self.weights.insert(station, weight);
        Ok(())
    }

    /// Weight of `station`, falling back to [`DEFAULT_STATION_WEIGHT`].
    pub fn weight(&self, station: &StationId) -> f64 {
        self.weights.get(station).copied().unwrap_or(DEFAULT_STATION_WEIGHT)
    }

    pub fn contains(&self, station: &StationId) -> bool {
        self.weights.contains_key(station)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StationId, &f64)> {
        self.weights.iter()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
