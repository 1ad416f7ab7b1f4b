// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Domain data model: catalog entries, traces, windows, weights, iterations
//! and misfit records.

mod event;
mod iteration;
mod misfit;
mod station;
mod trace;
mod weights;
mod window;

pub use event::{Event, EventId, MomentTensor};
pub use iteration::{EventSelection, Iteration};
pub use misfit::{
    weighted_total, IterationMisfit, MisfitMeasurement, MisfitRecord, MisfitSummary,
    MisfitSummaryEntry, ProcessingSummary,
};
pub use station::{great_circle_distance_km, ChannelId, Station, StationId, EARTH_RADIUS_KM};
pub use trace::{Trace, TraceKey, TraceKind, TraceMetadata};
pub use weights::{WeightSet, DEFAULT_STATION_WEIGHT};
pub use window::{validate_windows, ChannelKey, Window, WindowSet};
