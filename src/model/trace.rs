// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Waveform time series and the keys the trace store files them under.

use serde::{Deserialize, Serialize};

use super::event::EventId;
use super::station::{ChannelId, StationId};

/// Relative tolerance used when comparing sample intervals of two traces.
const GRID_TOLERANCE: f64 = 1e-9;

/// Acquisition and processing metadata carried alongside the samples.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TraceMetadata {
    /// Whether an instrument response is attached (or already removed) for this trace.
    #[serde(default)]
    pub instrument_response: bool,
    #[serde(default)]
    pub unit: Option<String>,
    /// Processing steps applied so far, in order.
    #[serde(default)]
    pub processing: Vec<String>,
}

/// Uniformly sampled time series.
///
/// `start` is the time of the first sample in seconds relative to the event origin
/// time and `dt` the sample interval in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub dt: f64,
    #[serde(default)]
    pub start: f64,
    pub samples: Vec<f64>,
    #[serde(default)]
    pub metadata: TraceMetadata,
}

impl Trace {
    pub fn new(dt: f64, start: f64, samples: Vec<f64>) -> Self {
        Self {
            dt,
            start,
            samples,
            metadata: TraceMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: TraceMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sampling_rate(&self) -> f64 {
        1.0 / self.dt
    }

    /// Time of the last sample relative to the first one: `(n - 1) * dt`.
    pub fn duration(&self) -> f64 {
        if self.samples.len() < 2 {
            0.0
        } else {
            (self.samples.len() - 1) as f64 * self.dt
        }
    }

    /// A trace on the same grid with every sample set to zero.
    pub fn zeros_like(&self) -> Self {
        Self {
            dt: self.dt,
            start: self.start,
            samples: vec![0.0; self.samples.len()],
            metadata: TraceMetadata {
                instrument_response: self.metadata.instrument_response,
                unit: self.metadata.unit.clone(),
                processing: Vec::new(),
            },
        }
    }

    /// True when both traces share sample interval, start time and length.
    pub fn same_grid(&self, other: &Trace) -> bool {
        let dt_matches = (self.dt - other.dt).abs() <= GRID_TOLERANCE * self.dt.abs().max(other.dt.abs());
        let start_matches = (self.start - other.start).abs() <= 1e-6 * self.dt.abs();
        dt_matches && start_matches && self.samples.len() == other.samples.len()
    }

    pub fn is_finite(&self) -> bool {
        self.dt.is_finite() && self.dt > 0.0 && self.samples.iter().all(|s| s.is_finite())
    }
}

/// Which flavour of a trace is stored under a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "iteration")]
pub enum TraceKind {
    /// Observed data, independent of any iteration.
    Raw,
    Synthetic(String),
    AdjointSource(String),
}

impl TraceKind {
    pub fn label(&self) -> &'static str {
        match self {
            TraceKind::Raw => "raw",
            TraceKind::Synthetic(_) => "synthetic",
            TraceKind::AdjointSource(_) => "adjoint",
        }
    }

    pub fn iteration(&self) -> Option<&str> {
        match self {
            TraceKind::Raw => None,
            TraceKind::Synthetic(name) | TraceKind::AdjointSource(name) => Some(name),
        }
    }
}

/// Addresses one trace in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraceKey {
    pub event: EventId,
    pub station: StationId,
    pub channel: ChannelId,
    pub kind: TraceKind,
}

impl TraceKey {
    pub fn raw(event: &EventId, station: &StationId, channel: &ChannelId) -> Self {
        Self {
            event: event.clone(),
            station: station.clone(),
            channel: channel.clone(),
            kind: TraceKind::Raw,
        }
    }

    pub fn synthetic(event: &EventId, station: &StationId, channel: &ChannelId, iteration: &str) -> Self {
        Self {
            event: event.clone(),
            station: station.clone(),
            channel: channel.clone(),
            kind: TraceKind::Synthetic(iteration.to_string()),
        }
    }

    pub fn adjoint_source(event: &EventId, station: &StationId, channel: &ChannelId, iteration: &str) -> Self {
        Self {
            event: event.clone(),
            station: station.clone(),
            channel: channel.clone(),
            kind: TraceKind::AdjointSource(iteration.to_string()),
        }
    }
}

impl std::fmt::Display for TraceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}/{}", self.kind.label(), self.event, self.station, self.channel)?;
        if let Some(iteration) = self.kind.iteration() {
            write!(f, "@{}", iteration)?;
        }
        Ok(())
    }
}
