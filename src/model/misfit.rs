// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::trace::Trace;
use super::weights::WeightSet;
use super::window::{ChannelKey, Window};
use crate::errors::DiscardReason;

/// Result of measuring one window.
#[derive(Debug, Clone, PartialEq)]
pub struct MisfitMeasurement {
    pub misfit: f64,
    /// Raw kernel measurement when the kernel has one (the cross-correlation time shift).
    pub measurement: Option<f64>,
    /// Same grid as the input traces, zero outside the window.
    pub adjoint_source: Trace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MisfitRecord {
    pub key: ChannelKey,
    pub iteration: String,
    pub window: Window,
    pub misfit: f64,
    pub measurement: Option<f64>,
    pub adjoint_source: Trace,
}

impl MisfitRecord {
    pub fn summary(&self, weight: f64) -> MisfitSummaryEntry {
        MisfitSummaryEntry {
            key: self.key.clone(),
            window: self.window,
            misfit: self.misfit,
            measurement: self.measurement,
            weight,
        }
    }
}

/// Persisted form of a misfit record, without the adjoint trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MisfitSummaryEntry {
    #[serde(flatten)]
    pub key: ChannelKey,
    pub window: Window,
    pub misfit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement: Option<f64>,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MisfitSummary {
    pub kernel: String,
    pub total_misfit: f64,
    pub entries: Vec<MisfitSummaryEntry>,
    pub processing: ProcessingSummary,
}

/// Counts of per-unit outcomes of one measurement pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    pub units: usize,
    pub measured: usize,
    pub windows: usize,
    pub without_windows: usize,
    pub discarded: BTreeMap<DiscardReason, usize>,
    /// Unit identifier → error message.
    pub failed: BTreeMap<String, String>,
}

impl ProcessingSummary {
    pub fn record_discard(&mut self, reason: DiscardReason) {
        *self.discarded.entry(reason).or_insert(0) += 1;
    }

    pub fn discarded_total(&self) -> usize {
        self.discarded.values().sum()
    }
}

/// Everything one measurement pass over an iteration produced.
#[derive(Debug, Clone)]
pub struct IterationMisfit {
    pub iteration: String,
    pub kernel: String,
    pub records: Vec<MisfitRecord>,
    pub total_misfit: f64,
    pub summary: ProcessingSummary,
}

/// `Σ weight(station) × misfit(record)`.
pub fn weighted_total(records: &[MisfitRecord], weights: &WeightSet) -> f64 {
    records
        .iter()
        .map(|record| weights.weight(&record.key.station) * record.misfit)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(station: &str, misfit: f64) -> MisfitRecord {
        MisfitRecord {
            key: ChannelKey::new(&"E1".into(), &station.into(), &"BHZ".into()),
            iteration: "it".to_string(),
            window: Window::new(0.0, 1.0).unwrap(),
            misfit,
            measurement: None,
            adjoint_source: Trace::new(1.0, 0.0, vec![0.0; 2]),
        }
    }

    #[test]
    fn test_weighted_total_uses_fallback_weight() {
        let mut weights = WeightSet::new();
        weights.insert("XX.A".into(), 0.5).unwrap();
        let total = weighted_total(&[record("XX.A", 2.0), record("XX.B", 3.0)], &weights);
        assert_eq!(total, 4.0);
    }

    #[test]
    fn test_discard_reasons_serialize_as_map_keys() {
        let mut summary = ProcessingSummary::default();
        summary.record_discard(DiscardReason::LowSignalToNoise);
        summary.record_discard(DiscardReason::LowSignalToNoise);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["discarded"]["low_signal_to_noise"], 2);
        assert_eq!(summary.discarded_total(), 2);
    }
}
