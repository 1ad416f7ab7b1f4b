// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the per-trace measurement pipeline.
//!
//! This module contains message types for logging events related to:
//! * Start and completion of an iteration's measurement run
//! * Traces discarded by data-quality checks
//! * Units that failed with an error

use crate::errors::DiscardReason;
use crate::model::ChannelKey;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Measurement run starting.
///
/// # Log Level
/// `info!` - Important operational event
pub struct MeasurementStarted<'a> {
    pub iteration: &'a str,
    pub kernel: &'a str,
    pub units: usize,
    pub max_concurrency: usize,
}

impl Display for MeasurementStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Measuring {} trace(s) for iteration '{}' with the {} kernel (max concurrency: {})",
            self.units, self.iteration, self.kernel, self.max_concurrency
        )
    }
}

impl StructuredLog for MeasurementStarted<'_> {
    fn log(&self) {
        tracing::info!(
            iteration = self.iteration,
            kernel = self.kernel,
            units = self.units,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "measurement",
            span_name = name,
            iteration = self.iteration,
            kernel = self.kernel,
            units = self.units,
        )
    }
}

/// Measurement run finished.
///
/// # Log Level
/// `info!` - Important operational event
pub struct MeasurementCompleted<'a> {
    pub iteration: &'a str,
    pub measured: usize,
    pub windows: usize,
    pub discarded: usize,
    pub failed: usize,
    pub total_misfit: f64,
}

impl Display for MeasurementCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Iteration '{}' measured: {} trace(s), {} window(s), {} discarded, {} failed, total misfit {:.6e}",
            self.iteration, self.measured, self.windows, self.discarded, self.failed, self.total_misfit
        )
    }
}

impl StructuredLog for MeasurementCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            iteration = self.iteration,
            measured = self.measured,
            windows = self.windows,
            discarded = self.discarded,
            failed = self.failed,
            total_misfit = self.total_misfit,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "measurement_completed",
            span_name = name,
            iteration = self.iteration,
            total_misfit = self.total_misfit,
        )
    }
}

/// A trace failed a data-quality check and was left out.
///
/// # Log Level
/// `warn!` - Expected but noteworthy
///
/// # Example
/// ```
/// use fwi_orchestrator::errors::DiscardReason;
/// use fwi_orchestrator::model::ChannelKey;
/// use fwi_orchestrator::observability::messages::processing::TraceDiscarded;
///
/// let key = ChannelKey::new(&"E1".into(), &"XX.A".into(), &"BHZ".into());
/// let msg = TraceDiscarded {
///     key: &key,
///     reason: DiscardReason::LowSignalToNoise,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct TraceDiscarded<'a> {
    pub key: &'a ChannelKey,
    pub reason: DiscardReason,
}

impl Display for TraceDiscarded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Discarded {}: {}", self.key, self.reason)
    }
}

impl StructuredLog for TraceDiscarded<'_> {
    fn log(&self) {
        tracing::warn!(
            event = self.key.event.as_str(),
            station = self.key.station.as_str(),
            channel = self.key.channel.as_str(),
            reason = self.reason.as_str(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::WARN,
            "trace_discarded",
            span_name = name,
            key = %self.key,
            reason = self.reason.as_str(),
        )
    }
}

/// A unit could not be measured.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct UnitFailed<'a> {
    pub key: &'a ChannelKey,
    pub error: &'a str,
}

impl Display for UnitFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Measurement of {} failed: {}", self.key, self.error)
    }
}

impl StructuredLog for UnitFailed<'_> {
    fn log(&self) {
        tracing::error!(key = %self.key, error = self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(tracing::Level::ERROR, "unit_failed", span_name = name, key = %self.key)
    }
}
