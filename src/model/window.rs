// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Measurement windows and per-iteration window sets.
//!
//! Window times are seconds relative to the first sample of the trace they were
//! selected on. A window covers sample `i` when `start <= i * dt <= end`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use super::event::EventId;
use super::station::{ChannelId, StationId};
use crate::errors::WindowError;

/// Slack for floating point comparisons against sample times, in samples.
const SAMPLE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start: f64,
    pub end: f64,
}

impl Window {
    pub fn new(start: f64, end: f64) -> Result<Self, WindowError> {
        if !(start.is_finite() && end.is_finite()) || start >= end {
            return Err(WindowError::Degenerate { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window spanning the inclusive sample range `first..=last` of a trace sampled at `dt`.
    pub fn from_samples(first: usize, last: usize, dt: f64) -> Result<Self, WindowError> {
        Self::new(first as f64 * dt, last as f64 * dt)
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Inclusive sample index range covered by the window, if any sample falls inside
    /// a trace of `len` samples.
    pub fn sample_range(&self, dt: f64, len: usize) -> Option<RangeInclusive<usize>> {
        if len == 0 {
            return None;
        }
        let first = (self.start / dt - SAMPLE_EPSILON).ceil().max(0.0) as usize;
        let last = ((self.end / dt + SAMPLE_EPSILON).floor() as usize).min(len - 1);
        (first <= last).then_some(first..=last)
    }

    pub fn contains_sample(&self, index: usize, dt: f64) -> bool {
        let t = index as f64 * dt;
        let slack = SAMPLE_EPSILON * dt;
        t >= self.start - slack && t <= self.end + slack
    }
}

/// Check the window-list invariant: every window satisfies
/// `0 <= start < end <= duration`, and windows are sorted and pairwise disjoint.
pub fn validate_windows(windows: &[Window], duration: f64) -> Result<(), WindowError> {
    let slack = 1e-9 * duration.abs().max(1.0);
    let mut previous_end: Option<f64> = None;

    for window in windows {
        if !(window.start < window.end) {
            return Err(WindowError::Degenerate {
                start: window.start,
                end: window.end,
            });
        }
        if window.start < -slack || window.end > duration + slack {
            return Err(WindowError::OutOfBounds {
                start: window.start,
                end: window.end,
                duration,
            });
        }
        if let Some(end) = previous_end {
            if window.start <= end {
                return Err(WindowError::Overlapping {
                    previous_end: end,
                    start: window.start,
                });
            }
        }
        previous_end = Some(window.end);
    }
    Ok(())
}

/// Identifies one (event, station, channel) measurement unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelKey {
    pub event: EventId,
    pub station: StationId,
    pub channel: ChannelId,
}

impl ChannelKey {
    pub fn new(event: &EventId, station: &StationId, channel: &ChannelId) -> Self {
        Self {
            event: event.clone(),
            station: station.clone(),
            channel: channel.clone(),
        }
    }
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.event, self.station, self.channel)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WindowEntry {
    #[serde(flatten)]
    key: ChannelKey,
    windows: Vec<Window>,
}

/// Windows selected for every channel of an iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<WindowEntry>", into = "Vec<WindowEntry>")]
pub struct WindowSet {
    entries: BTreeMap<ChannelKey, Vec<Window>>,
}

impl WindowSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the windows of one channel after checking the list invariant.
    pub fn insert(&mut self, key: ChannelKey, windows: Vec<Window>, duration: f64) -> Result<(), WindowError> {
        validate_windows(&windows, duration)?;
        self.entries.insert(key, windows);
        Ok(())
    }

    pub fn get(&self, key: &ChannelKey) -> Option<&[Window]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelKey, &Vec<Window>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn window_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

impl From<Vec<WindowEntry>> for WindowSet {
    fn from(entries: Vec<WindowEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.key, e.windows)).collect(),
        }
    }
}

impl From<WindowSet> for Vec<WindowEntry> {
    fn from(set: WindowSet) -> Self {
        set.entries
            .into_iter()
            .map(|(key, windows)| WindowEntry { key, windows })
            .collect()
    }
}
