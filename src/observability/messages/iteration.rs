// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for iteration lifecycle and derived artifacts.

use crate::observability::messages::StructuredLog;
use crate::traits::ArtifactKind;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A new iteration was persisted.
///
/// # Log Level
/// `info!` - Important operational event
pub struct IterationCreated<'a> {
    pub iteration: &'a str,
    pub event_count: usize,
    pub pair_count: usize,
}

impl Display for IterationCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Created iteration '{}' with {} event(s) and {} event-station pair(s)",
            self.iteration, self.event_count, self.pair_count
        )
    }
}

impl StructuredLog for IterationCreated<'_> {
    fn log(&self) {
        tracing::info!(
            iteration = self.iteration,
            event_count = self.event_count,
            pair_count = self.pair_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "iteration_created",
            span_name = name,
            iteration = self.iteration,
            event_count = self.event_count,
        )
    }
}

/// Station weights computed or taken over from an earlier iteration.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WeightsComputed<'a> {
    pub iteration: &'a str,
    pub station_count: usize,
    pub reused_from: Option<&'a str>,
}

impl Display for WeightsComputed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.reused_from {
            Some(source) => write!(
                f,
                "Iteration '{}' reuses {} station weight(s) from '{}'",
                self.iteration, self.station_count, source
            ),
            None => write!(
                f,
                "Computed {} station weight(s) for iteration '{}'",
                self.station_count, self.iteration
            ),
        }
    }
}

impl StructuredLog for WeightsComputed<'_> {
    fn log(&self) {
        tracing::info!(
            iteration = self.iteration,
            station_count = self.station_count,
            reused_from = self.reused_from.unwrap_or("none"),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("weights_computed", span_name = name, iteration = self.iteration)
    }
}

/// Windows of an earlier iteration are used instead of selecting new ones.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WindowsReused<'a> {
    pub iteration: &'a str,
    pub source: &'a str,
    pub channel_count: usize,
}

impl Display for WindowsReused<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Iteration '{}' reuses windows of {} channel(s) from '{}'",
            self.iteration, self.channel_count, self.source
        )
    }
}

impl StructuredLog for WindowsReused<'_> {
    fn log(&self) {
        tracing::info!(
            iteration = self.iteration,
            source = self.source,
            channel_count = self.channel_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("windows_reused", span_name = name, iteration = self.iteration, source = self.source)
    }
}

/// A derived artifact was written.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct ArtifactSaved<'a> {
    pub iteration: &'a str,
    pub kind: ArtifactKind,
}

impl Display for ArtifactSaved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Saved {} artifact for iteration '{}'", self.kind, self.iteration)
    }
}

impl StructuredLog for ArtifactSaved<'_> {
    fn log(&self) {
        tracing::debug!(iteration = self.iteration, kind = self.kind.as_str(), "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("artifact_saved", span_name = name, iteration = self.iteration, kind = self.kind.as_str())
    }
}

/// Weighted adjoint sources written to the trace store.
///
/// # Log Level
/// `info!` - Important operational event
pub struct AdjointSourcesWritten<'a> {
    pub iteration: &'a str,
    pub trace_count: usize,
    /// Stale traces of channels that no longer produced a measurement.
    pub removed_count: usize,
}

impl Display for AdjointSourcesWritten<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Wrote {} adjoint source trace(s) for iteration '{}', removed {} stale",
            self.trace_count, self.iteration, self.removed_count
        )
    }
}

impl StructuredLog for AdjointSourcesWritten<'_> {
    fn log(&self) {
        tracing::info!(
            iteration = self.iteration,
            trace_count = self.trace_count,
            removed_count = self.removed_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("adjoint_sources_written", span_name = name, iteration = self.iteration)
    }
}
