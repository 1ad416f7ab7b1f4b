// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Data-quality outcomes and errors of the per-trace measurement pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why the preprocessing pipeline dropped a trace.
///
/// Discarding is an expected outcome, so this is not an error type: it is
/// counted in the processing summary and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    MissingInstrumentResponse,
    EmptyTrace,
    NonFiniteSamples,
    SampleRateMismatch,
    LowSignalToNoise,
    MissingObservedTrace,
    MissingSyntheticTrace,
}

impl DiscardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::MissingInstrumentResponse => "missing_instrument_response",
            DiscardReason::EmptyTrace => "empty_trace",
            DiscardReason::NonFiniteSamples => "non_finite_samples",
            DiscardReason::SampleRateMismatch => "sample_rate_mismatch",
            DiscardReason::LowSignalToNoise => "low_signal_to_noise",
            DiscardReason::MissingObservedTrace => "missing_observed_trace",
            DiscardReason::MissingSyntheticTrace => "missing_synthetic_trace",
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A window list violates the ordering/containment invariant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WindowError {
    #[error("Window [{start}, {end}] is empty or reversed")]
    Degenerate { start: f64, end: f64 },

    #[error("Window [{start}, {end}] lies outside trace bounds [0, {duration}]")]
    OutOfBounds { start: f64, end: f64, duration: f64 },

    #[error("Window starting at {start} overlaps or precedes the window ending at {previous_end}")]
    Overlapping { previous_end: f64, start: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    /// Observed and synthetic traces are not on the same sample grid.
    #[error("Incompatible traces: {0}")]
    IncompatibleTraces(String),

    #[error(transparent)]
    InvalidWindows(#[from] WindowError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MisfitError {
    #[error("Incompatible traces: {0}")]
    IncompatibleTraces(String),

    #[error(transparent)]
    InvalidWindow(#[from] WindowError),

    /// The window covers fewer samples than the kernel needs.
    #[error("Window [{start}, {end}] covers too few samples for the {kernel} kernel")]
    WindowTooShort {
        kernel: &'static str,
        start: f64,
        end: f64,
    },
}
