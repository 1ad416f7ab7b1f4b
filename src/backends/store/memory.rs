// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::StoreError;
use crate::model::{ChannelId, Event, EventId, Station, StationId, Trace, TraceKey, TraceKind};
use crate::traits::{ArtifactKind, TraceStore};

#[derive(Default)]
struct MemoryState {
    events: BTreeMap<EventId, Event>,
    stations: BTreeMap<StationId, Station>,
    traces: BTreeMap<TraceKey, Arc<Trace>>,
    artifacts: BTreeMap<(String, ArtifactKind), serde_json::Value>,
}

/// Trace store held entirely in memory. Values are replaced whole under a write
/// lock, so readers never see partial updates.
#[derive(Default)]
pub struct MemoryTraceStore {
    state: RwLock<MemoryState>,
}

impl MemoryTraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, StoreError> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, StoreError> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }
}

fn add_once<K: Ord + Clone + std::fmt::Display, V: PartialEq>(
    entries: &mut BTreeMap<K, V>,
    key: &K,
    value: V,
) -> Result<(), StoreError> {
    match entries.get(key) {
        Some(existing) if *existing == value => Ok(()),
        Some(_) => Err(StoreError::Conflict(key.to_string())),
        None => {
            entries.insert(key.clone(), value);
            Ok(())
        }
    }
}

impl TraceStore for MemoryTraceStore {
    fn add_event(&self, event: Event) -> Result<(), StoreError> {
        let id = event.id.clone();
        add_once(&mut self.write()?.events, &id, event)
    }

    fn add_station(&self, station: Station) -> Result<(), StoreError> {
        let id = station.id.clone();
        add_once(&mut self.write()?.stations, &id, station)
    }

    fn events(&self) -> Result<Vec<Event>, StoreError> {
        Ok(self.read()?.events.values().cloned().collect())
    }

    fn stations(&self) -> Result<Vec<Station>, StoreError> {
        Ok(self.read()?.stations.values().cloned().collect())
    }

    fn event(&self, id: &EventId) -> Result<Event, StoreError> {
        self.read()?
            .events
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("event {}", id)))
    }

    fn station(&self, id: &StationId) -> Result<Station, StoreError> {
        self.read()?
            .stations
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("station {}", id)))
    }

    fn read_trace(&self, key: &TraceKey) -> Result<Arc<Trace>, StoreError> {
        self.read()?
            .traces
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn write_trace(&self, key: &TraceKey, trace: &Trace) -> Result<(), StoreError> {
        self.write()?.traces.insert(key.clone(), Arc::new(trace.clone()));
        Ok(())
    }

    fn has_trace(&self, key: &TraceKey) -> Result<bool, StoreError> {
        Ok(self.read()?.traces.contains_key(key))
    }

    fn remove_trace(&self, key: &TraceKey) -> Result<bool, StoreError> {
        Ok(self.write()?.traces.remove(key).is_some())
    }

    fn channels(&self, event: &EventId, station: &StationId) -> Result<Vec<ChannelId>, StoreError> {
        let channels: BTreeSet<ChannelId> = self
            .read()?
            .traces
            .keys()
            .filter(|key| key.kind == TraceKind::Raw && &key.event == event && &key.station == station)
            .map(|key| key.channel.clone())
            .collect();
        Ok(channels.into_iter().collect())
    }

    fn stations_with_data(&self, event: &EventId) -> Result<Vec<StationId>, StoreError> {
        let stations: BTreeSet<StationId> = self
            .read()?
            .traces
            .keys()
            .filter(|key| key.kind == TraceKind::Raw && &key.event == event)
            .map(|key| key.station.clone())
            .collect();
        Ok(stations.into_iter().collect())
    }

    fn read_artifact(&self, iteration: &str, kind: ArtifactKind) -> Result<serde_json::Value, StoreError> {
        self.read()?
            .artifacts
            .get(&(iteration.to_string(), kind))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", iteration, kind)))
    }

    fn write_artifact(&self, iteration: &str, kind: ArtifactKind, value: &serde_json::Value) -> Result<(), StoreError> {
        self.write()?
            .artifacts
            .insert((iteration.to_string(), kind), value.clone());
        Ok(())
    }

    fn artifact_iterations(&self, kind: ArtifactKind) -> Result<Vec<String>, StoreError> {
        Ok(self
            .read()?
            .artifacts
            .keys()
            .filter(|(_, k)| *k == kind)
            .map(|(iteration, _)| iteration.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(id: &str, magnitude: f64) -> Event {
        Event {
            id: id.into(),
            origin_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            latitude: 10.0,
            longitude: 20.0,
            depth_km: 15.0,
            magnitude,
            moment_tensor: Default::default(),
        }
    }

    #[test]
    fn test_catalog_is_append_only() {
        let store = MemoryTraceStore::new();
        store.add_event(event("E1", 6.0)).unwrap();
        store.add_event(event("E1", 6.0)).unwrap();
        assert!(matches!(
            store.add_event(event("E1", 6.5)),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.events().unwrap().len(), 1);
        assert_eq!(store.event(&"E1".into()).unwrap().magnitude, 6.0);
        assert!(store.event(&"E2".into()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_channels_only_list_raw_traces() {
        let store = MemoryTraceStore::new();
        let trace = Trace::new(1.0, 0.0, vec![0.0; 4]);
        let (e, s) = (EventId::new("E1"), StationId::new("XX.A"));
        store.write_trace(&TraceKey::raw(&e, &s, &"BHZ".into()), &trace).unwrap();
        store.write_trace(&TraceKey::raw(&e, &s, &"BHN".into()), &trace).unwrap();
        store
            .write_trace(&TraceKey::synthetic(&e, &s, &"BHE".into(), "it0"), &trace)
            .unwrap();

        let channels: Vec<_> = store.channels(&e, &s).unwrap().into_iter().map(|c| c.0).collect();
        assert_eq!(channels, vec!["BHN", "BHZ"]);
        assert_eq!(store.stations_with_data(&e).unwrap(), vec![s]);
        assert!(store.stations_with_data(&"E2".into()).unwrap().is_empty());
    }

    #[test]
    fn test_remove_trace_reports_whether_it_existed() {
        let store = MemoryTraceStore::new();
        let key = TraceKey::raw(&"E1".into(), &"XX.A".into(), &"BHZ".into());
        store.write_trace(&key, &Trace::new(1.0, 0.0, vec![0.0; 4])).unwrap();

        assert!(store.remove_trace(&key).unwrap());
        assert!(!store.has_trace(&key).unwrap());
        assert!(!store.remove_trace(&key).unwrap());
        assert!(store.channels(&"E1".into(), &"XX.A".into()).unwrap().is_empty());
    }

    #[test]
    fn test_artifacts_are_keyed_by_iteration_and_kind() {
        let store = MemoryTraceStore::new();
        store
            .write_artifact("it1", ArtifactKind::Weights, &serde_json::json!({"a": 1}))
            .unwrap();
        store
            .write_artifact("it0", ArtifactKind::Weights, &serde_json::json!({"a": 0}))
            .unwrap();
        store
            .write_artifact("it2", ArtifactKind::Windows, &serde_json::json!([]))
            .unwrap();

        assert_eq!(store.artifact_iterations(ArtifactKind::Weights).unwrap(), vec!["it0", "it1"]);
        assert_eq!(store.read_artifact("it1", ArtifactKind::Weights).unwrap()["a"], 1);
        assert!(store.read_artifact("it2", ArtifactKind::Weights).unwrap_err().is_not_found());
    }
}
