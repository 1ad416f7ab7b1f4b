// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::event::EventId;
use super::station::StationId;

/// Requested membership of an iteration: event → stations.
pub type EventSelection = BTreeMap<EventId, BTreeSet<StationId>>;

/// A named, immutable set of (event, station) pairs.
///
/// Instances are only produced by the iteration manager (or deserialized from
/// the store); no method mutates an existing iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Iteration {
    name: String,
    created_at: DateTime<Utc>,
    members: EventSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    window_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weight_source: Option<String>,
}

impl Iteration {
    pub(crate) fn new(
        name: String,
        members: EventSelection,
        window_source: Option<String>,
        weight_source: Option<String>,
    ) -> Self {
        Self {
            name,
            created_at: Utc::now(),
            members,
            window_source,
            weight_source,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Event ids in lexicographic order.
    pub fn event_ids(&self) -> impl Iterator<Item = &EventId> {
        self.members.keys()
    }

    /// Stations selected for `event`, in lexicographic order.
    pub fn stations_for(&self, event: &EventId) -> impl Iterator<Item = &StationId> {
        self.members.get(event).into_iter().flatten()
    }

    /// Union of stations over every event.
    pub fn all_stations(&self) -> BTreeSet<&StationId> {
        self.members.values().flatten().collect()
    }

    pub fn contains(&self, event: &EventId, station: &StationId) -> bool {
        self.members.get(event).map_or(false, |s| s.contains(station))
    }

    pub fn pair_count(&self) -> usize {
        self.members.values().map(BTreeSet::len).sum()
    }

    /// Iteration whose window set is reused instead of selecting new windows.
    pub fn window_source(&self) -> Option<&str> {
        self.window_source.as_deref()
    }

    /// Iteration whose weight set is reused instead of computing new weights.
    pub fn weight_source(&self) -> Option<&str> {
        self.weight_source.as_deref()
    }
}
