// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The iteration manager: the single entry point that ties the project store,
//! the measurement pipeline and the simulation job tracker together.
//!
//! An iteration is created once and never mutated. Everything derived from it
//! (weights, windows, misfits, adjoint sources) is written to the store under
//! the iteration's name.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::time::Instant;

use super::registry::IterationRegistry;
use crate::backends::store::{load_artifact, save_artifact};
use crate::config::{validate_config, InversionConfig, MeasurementRuntime, RuntimeBuilder};
use crate::engine::{MeasurementContext, UnitOutcome, WorkUnit};
use crate::errors::{IterationError, StoreError, TrackerError};
use crate::jobs::{JobHandle, JobState, JobStatus, JobTracker, OutputLocation, SimulationType};
use crate::model::{
    weighted_total, ChannelKey, Event, EventId, EventSelection, Iteration, IterationMisfit, MisfitRecord,
    MisfitSummary, ProcessingSummary, Station, Trace, TraceKey, WeightSet, WindowSet,
};
use crate::observability::messages::iteration::{
    AdjointSourcesWritten, ArtifactSaved, IterationCreated, WeightsComputed, WindowsReused,
};
use crate::observability::messages::processing::{
    MeasurementCompleted, MeasurementStarted, TraceDiscarded, UnitFailed,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{ArtifactKind, ComputeService, TraceStore};

pub struct IterationManager {
    store: Arc<dyn TraceStore>,
    runtime: MeasurementRuntime,
    tracker: JobTracker,
    registry: IterationRegistry,
    window_source: Option<String>,
    weight_source: Option<String>,
}

impl IterationManager {
    /// Validate `config`, build the measurement runtime and load the iterations
    /// already persisted in `store`.
    pub fn new(
        store: Arc<dyn TraceStore>,
        compute: Arc<dyn ComputeService>,
        config: InversionConfig,
    ) -> Result<Self, IterationError> {
        validate_config(&config).map_err(IterationError::InvalidConfig)?;
        let runtime = RuntimeBuilder::from_config(&config)?;
        let tracker = JobTracker::new(compute, runtime.tracker_settings);
        let registry = IterationRegistry::load(store.as_ref())?;

        Ok(Self {
            store,
            runtime,
            tracker,
            registry,
            window_source: config.windows.reuse_from,
            weight_source: config.weights.reuse_from,
        })
    }

    pub fn store(&self) -> &Arc<dyn TraceStore> {
        &self.store
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Create and persist a new iteration.
    ///
    /// Events whose station set is empty are left out. The iteration is written
    /// to the store before it becomes visible through this manager; if the write
    /// fails nothing is registered.
    pub fn create_iteration(&self, name: &str, selection: EventSelection) -> Result<Arc<Iteration>, IterationError> {
        validate_name(name)?;
        let _creating = self.registry.creation()?;

        if self.registry.contains(name)?
            || self
                .store
                .artifact_iterations(ArtifactKind::Iteration)?
                .iter()
                .any(|existing| existing == name)
        {
            return Err(IterationError::DuplicateIteration(name.to_string()));
        }

        let members: EventSelection = selection
            .into_iter()
            .filter(|(_, stations)| !stations.is_empty())
            .collect();
        if members.is_empty() {
            return Err(IterationError::EmptyEventSet(name.to_string()));
        }
        self.check_catalog(&members)?;

        for source in [&self.window_source, &self.weight_source].into_iter().flatten() {
            if !self.registry.contains(source)? {
                return Err(IterationError::UnknownIteration(source.clone()));
            }
        }

        let iteration = Iteration::new(
            name.to_string(),
            members,
            self.window_source.clone(),
            self.weight_source.clone(),
        );
        save_artifact(self.store.as_ref(), name, ArtifactKind::Iteration, &iteration)?;

        let iteration = Arc::new(iteration);
        self.registry.insert(iteration.clone())?;
        IterationCreated {
            iteration: name,
            event_count: iteration.event_ids().count(),
            pair_count: iteration.pair_count(),
        }
        .log();
        Ok(iteration)
    }

    /// Create an iteration over every station that has raw data for each event.
    pub fn create_iteration_for_events(&self, name: &str, events: &[EventId]) -> Result<Arc<Iteration>, IterationError> {
        let mut selection = EventSelection::new();
        for event in events {
            self.lookup_event(event)?;
            let stations: BTreeSet<_> = self.store.stations_with_data(event)?.into_iter().collect();
            selection.insert(event.clone(), stations);
        }
        self.create_iteration(name, selection)
    }

    pub fn iteration(&self, name: &str) -> Result<Arc<Iteration>, IterationError> {
        self.registry
            .get(name)?
            .ok_or_else(|| IterationError::UnknownIteration(name.to_string()))
    }

    pub fn list_iterations(&self) -> Result<Vec<String>, IterationError> {
        self.registry.names()
    }

    /// Events of an iteration, sorted by id.
    pub fn get_events(&self, name: &str) -> Result<Vec<Event>, IterationError> {
        let iteration = self.iteration(name)?;
        iteration.event_ids().map(|id| self.lookup_event(id)).collect()
    }

    /// Stations selected for `event` in an iteration, sorted by id.
    pub fn get_stations(&self, name: &str, event: &EventId) -> Result<Vec<Station>, IterationError> {
        let iteration = self.iteration(name)?;
        if !iteration.event_ids().any(|id| id == event) {
            return Err(IterationError::UnknownEvent(event.clone()));
        }
        iteration
            .stations_for(event)
            .map(|id| {
                self.store.station(id).map_err(|e| match e {
                    StoreError::NotFound(_) => IterationError::UnknownStation(id.clone()),
                    other => other.into(),
                })
            })
            .collect()
    }

    /// Compute the station weights of an iteration, or take them over from the
    /// iteration named by `weights.reuse_from`, and persist them.
    pub fn compute_weights(&self, name: &str) -> Result<WeightSet, IterationError> {
        let iteration = self.iteration(name)?;

        let weights: WeightSet = match iteration.weight_source() {
            Some(source) => self.load_required(source, ArtifactKind::Weights)?,
            None => {
                let stations = iteration
                    .all_stations()
                    .into_iter()
                    .map(|id| self.store.station(id))
                    .collect::<Result<Vec<_>, _>>()?;
                self.runtime.weights.compute_weights(&stations)?
            }
        };

        self.save(name, ArtifactKind::Weights, &weights)?;
        WeightsComputed {
            iteration: name,
            station_count: weights.len(),
            reused_from: iteration.weight_source(),
        }
        .log();
        Ok(weights)
    }

    /// Persisted weights of an iteration, computing them first if needed.
    pub fn weights(&self, name: &str) -> Result<WeightSet, IterationError> {
        match load_artifact(self.store.as_ref(), name, ArtifactKind::Weights) {
            Ok(weights) => Ok(weights),
            Err(StoreError::NotFound(_)) => self.compute_weights(name),
            Err(e) => Err(e.into()),
        }
    }

    /// Measure every (event, station, channel) of an iteration.
    ///
    /// Discarded traces and failed units are logged and counted; they never
    /// abort the pass. The window set and misfit summary are persisted and the
    /// weighted adjoint source of every measured channel is written to the store.
    pub async fn measure(&self, name: &str) -> Result<IterationMisfit, IterationError> {
        let iteration = self.iteration(name)?;
        let weights = self.weights(name)?;
        let reused = self.reused_windows(&iteration)?;
        let units = self.work_units(&iteration, reused.as_ref())?;

        let kernel = self.runtime.kernel.name();
        MeasurementStarted {
            iteration: name,
            kernel,
            units: units.len(),
            max_concurrency: self.runtime.executor.max_concurrency(),
        }
        .log();

        let context = Arc::new(MeasurementContext {
            iteration: name.to_string(),
            store: self.store.clone(),
            kernel: self.runtime.kernel.clone(),
            preprocessor: self.runtime.preprocessor.clone(),
            selector: self.runtime.selector.clone(),
        });
        let results = self.runtime.executor.run(context, units).await?;

        let mut summary = ProcessingSummary {
            units: results.len(),
            ..ProcessingSummary::default()
        };
        let mut windows = WindowSet::new();
        let mut records: Vec<MisfitRecord> = Vec::new();
        let mut unmeasured: Vec<ChannelKey> = Vec::new();

        for result in results {
            if !matches!(result.outcome, UnitOutcome::Measured { .. }) {
                unmeasured.push(result.key.clone());
            }
            match result.outcome {
                UnitOutcome::Measured {
                    windows: measured,
                    duration,
                    records: unit_records,
                } => {
                    let count = measured.len();
                    if let Err(e) = windows.insert(result.key.clone(), measured, duration) {
                        let error = e.to_string();
                        UnitFailed {
                            key: &result.key,
                            error: &error,
                        }
                        .log();
                        summary.failed.insert(result.key.to_string(), error);
                        unmeasured.push(result.key.clone());
                        continue;
                    }
                    summary.measured += 1;
                    summary.windows += count;
                    records.extend(unit_records);
                }
                UnitOutcome::NoWindows => summary.without_windows += 1,
                UnitOutcome::Discarded(reason) => {
                    TraceDiscarded {
                        key: &result.key,
                        reason,
                    }
                    .log();
                    summary.record_discard(reason);
                }
                UnitOutcome::Failed(error) => {
                    UnitFailed {
                        key: &result.key,
                        error: &error,
                    }
                    .log();
                    summary.failed.insert(result.key.to_string(), error);
                }
            }
        }

        let total_misfit = weighted_total(&records, &weights);

        let removed = self.remove_adjoint_sources(name, &unmeasured)?;
        let written = self.write_adjoint_sources(name, &records, &weights)?;
        AdjointSourcesWritten {
            iteration: name,
            trace_count: written,
            removed_count: removed,
        }
        .log();

        self.save(name, ArtifactKind::Windows, &windows)?;
        let misfits = MisfitSummary {
            kernel: kernel.to_string(),
            total_misfit,
            entries: records
                .iter()
                .map(|record| record.summary(weights.weight(&record.key.station)))
                .collect(),
            processing: summary.clone(),
        };
        self.save(name, ArtifactKind::Misfits, &misfits)?;

        MeasurementCompleted {
            iteration: name,
            measured: summary.measured,
            windows: summary.windows,
            discarded: summary.discarded_total(),
            failed: summary.failed.len(),
            total_misfit,
        }
        .log();

        Ok(IterationMisfit {
            iteration: name.to_string(),
            kernel: kernel.to_string(),
            records,
            total_misfit,
            summary,
        })
    }

    /// Submit one simulation per event of an iteration.
    ///
    /// Adjoint simulations need an adjoint source for every event; if one is
    /// missing nothing is submitted.
    pub async fn submit_simulations(
        &self,
        name: &str,
        simulation: SimulationType,
    ) -> Result<BTreeMap<EventId, JobHandle>, IterationError> {
        let iteration = self.iteration(name)?;
        let events: Vec<EventId> = iteration.event_ids().cloned().collect();

        if simulation == SimulationType::Adjoint {
            for event in &events {
                if !self.has_adjoint_sources(&iteration, event)? {
                    return Err(IterationError::MissingAdjointSources {
                        iteration: name.to_string(),
                        event: event.clone(),
                    });
                }
            }
        }

        Ok(self
            .tracker
            .submit(&events, name, simulation, self.runtime.resources)
            .await?)
    }

    /// Poll every job until all are terminal or the tracker's wait timeout
    /// elapses. Jobs still open at the deadline report their last observed
    /// status, which may be [`JobStatus::Unknown`]. Jobs abandoned before or
    /// during the wait are left out of the result.
    pub async fn await_simulations(
        &self,
        handles: &BTreeMap<EventId, JobHandle>,
    ) -> Result<BTreeMap<EventId, JobStatus>, IterationError> {
        let settings = *self.tracker.settings();
        let deadline = Instant::now() + settings.wait_timeout;
        let mut statuses: BTreeMap<EventId, JobStatus> =
            handles.keys().map(|event| (event.clone(), JobStatus::Unknown)).collect();

        loop {
            for (event, handle) in handles {
                if statuses.get(event).map_or(true, JobStatus::is_terminal) {
                    continue;
                }
                match self.tracker.poll_status(handle).await {
                    Ok(status) => {
                        statuses.insert(event.clone(), status);
                    }
                    Err(TrackerError::JobAbandoned(_)) => {
                        statuses.remove(event);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            if statuses.values().all(JobStatus::is_terminal) || Instant::now() >= deadline {
                return Ok(statuses);
            }
            tokio::time::sleep_until((Instant::now() + settings.poll_interval).min(deadline)).await;
        }
    }

    /// Output locations of the jobs that succeeded. Other jobs and abandoned
    /// jobs are skipped.
    pub async fn collect_outputs(
        &self,
        handles: &BTreeMap<EventId, JobHandle>,
    ) -> Result<BTreeMap<EventId, OutputLocation>, IterationError> {
        let mut outputs = BTreeMap::new();
        for (event, handle) in handles {
            if self.tracker.state(handle).await? != JobState::Succeeded {
                continue;
            }
            match self.tracker.retrieve(handle).await {
                Ok(location) => {
                    outputs.insert(event.clone(), location);
                }
                Err(TrackerError::JobAbandoned(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(outputs)
    }

    fn lookup_event(&self, id: &EventId) -> Result<Event, IterationError> {
        self.store.event(id).map_err(|e| match e {
            StoreError::NotFound(_) => IterationError::UnknownEvent(id.clone()),
            other => other.into(),
        })
    }

    fn check_catalog(&self, members: &EventSelection) -> Result<(), IterationError> {
        let events: BTreeSet<EventId> = self.store.events()?.into_iter().map(|e| e.id).collect();
        let stations: BTreeSet<_> = self.store.stations()?.into_iter().map(|s| s.id).collect();

        for (event, selected) in members {
            if !events.contains(event) {
                return Err(IterationError::UnknownEvent(event.clone()));
            }
            if let Some(station) = selected.iter().find(|s| !stations.contains(*s)) {
                return Err(IterationError::UnknownStation(station.clone()));
            }
        }
        Ok(())
    }

    fn load_required<T: serde::de::DeserializeOwned>(
        &self,
        iteration: &str,
        kind: ArtifactKind,
    ) -> Result<T, IterationError> {
        load_artifact(self.store.as_ref(), iteration, kind).map_err(|e| match e {
            StoreError::NotFound(_) => IterationError::MissingArtifact {
                iteration: iteration.to_string(),
                kind: kind.as_str(),
            },
            other => other.into(),
        })
    }

    fn save<T: serde::Serialize>(&self, iteration: &str, kind: ArtifactKind, payload: &T) -> Result<(), IterationError> {
        save_artifact(self.store.as_ref(), iteration, kind, payload)?;
        ArtifactSaved { iteration, kind }.log();
        Ok(())
    }

    fn reused_windows(&self, iteration: &Iteration) -> Result<Option<WindowSet>, IterationError> {
        let Some(source) = iteration.window_source() else {
            return Ok(None);
        };
        let windows: WindowSet = self.load_required(source, ArtifactKind::Windows)?;
        WindowsReused {
            iteration: iteration.name(),
            source,
            channel_count: windows.len(),
        }
        .log();
        Ok(Some(windows))
    }

    fn work_units(&self, iteration: &Iteration, reused: Option<&WindowSet>) -> Result<Vec<WorkUnit>, IterationError> {
        let mut units = Vec::new();
        for event_id in iteration.event_ids() {
            let event = self.lookup_event(event_id)?;
            for station_id in iteration.stations_for(event_id) {
                let station = self.store.station(station_id)?;
                for channel in self.store.channels(event_id, station_id)? {
                    let key = ChannelKey::new(event_id, station_id, &channel);
                    // A channel absent from the reused set has no windows.
                    let reused_windows = reused.map(|set| set.get(&key).map(|w| w.to_vec()).unwrap_or_default());
                    units.push(WorkUnit {
                        key,
                        event: event.clone(),
                        station: station.clone(),
                        reused_windows,
                    });
                }
            }
        }
        Ok(units)
    }

    /// Sum the weighted adjoint sources of every window per channel and write
    /// one trace per channel. Returns the number of traces written.
    fn write_adjoint_sources(
        &self,
        iteration: &str,
        records: &[MisfitRecord],
        weights: &WeightSet,
    ) -> Result<usize, IterationError> {
        let mut combined: BTreeMap<&ChannelKey, Trace> = BTreeMap::new();
        for record in records {
            let weight = weights.weight(&record.key.station);
            match combined.get_mut(&record.key) {
                Some(trace) => {
                    for (sum, value) in trace.samples.iter_mut().zip(&record.adjoint_source.samples) {
                        *sum += weight * value;
                    }
                }
                None => {
                    let mut trace = record.adjoint_source.clone();
                    trace.samples.iter_mut().for_each(|value| *value *= weight);
                    combined.insert(&record.key, trace);
                }
            }
        }

        for (key, trace) in &combined {
            let trace_key = TraceKey::adjoint_source(&key.event, &key.station, &key.channel, iteration);
            self.store.write_trace(&trace_key, trace)?;
        }
        Ok(combined.len())
    }

    /// Delete adjoint sources left by an earlier pass for channels that produced
    /// no measurement this time. Returns the number of traces removed.
    fn remove_adjoint_sources(&self, iteration: &str, keys: &[ChannelKey]) -> Result<usize, IterationError> {
        let mut removed = 0;
        for key in keys {
            let trace_key = TraceKey::adjoint_source(&key.event, &key.station, &key.channel, iteration);
            if self.store.remove_trace(&trace_key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn has_adjoint_sources(&self, iteration: &Iteration, event: &EventId) -> Result<bool, IterationError> {
        for station in iteration.stations_for(event) {
            for channel in self.store.channels(event, station)? {
                let key = TraceKey::adjoint_source(event, station, &channel, iteration.name());
                if self.store.has_trace(&key)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

/// Iteration names become storage keys.
fn validate_name(name: &str) -> Result<(), IterationError> {
    let invalid = name.is_empty()
        || name.trim() != name
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(IterationError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_names_must_be_storage_keys() {
        for name in ["", " it", "it ", ".", "..", "a/b", "a\\b"] {
            assert!(matches!(validate_name(name), Err(IterationError::InvalidName(_))), "{name:?}");
        }
        assert!(validate_name("it0001").is_ok());
        assert!(validate_name("it.0001-tf").is_ok());
    }
}
