// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Trace store on a project directory.
//!
//! Layout below the project root:
//!
//! ```text
//! catalog/events/<event>.json
//! catalog/stations/<station>.json
//! traces/raw/<event>/<station>/<channel>.json
//! traces/synthetic/<iteration>/<event>/<station>/<channel>.json
//! traces/adjoint/<iteration>/<event>/<station>/<channel>.json
//! artifacts/<iteration>/<kind>.json
//! ```
//!
//! Every file is written to a temporary file in its destination directory and
//! renamed into place, so a concurrent reader sees the old or the new content.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::errors::StoreError;
use crate::model::{ChannelId, Event, EventId, Station, StationId, Trace, TraceKey};
use crate::traits::{ArtifactKind, TraceStore};

const EXTENSION: &str = "json";

pub struct FilesystemTraceStore {
    root: PathBuf,
}

/// Reject identifiers that would escape or alias a directory level.
fn component(value: &str) -> Result<&str, StoreError> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0'])
        || value.trim() != value;
    if invalid {
        Err(StoreError::InvalidKey(value.to_string()))
    } else {
        Ok(value)
    }
}

fn file_name(value: &str) -> Result<String, StoreError> {
    Ok(format!("{}.{}", component(value)?, EXTENSION))
}

impl FilesystemTraceStore {
    /// Open (creating if needed) a project directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn events_dir(&self) -> PathBuf {
        self.root.join("catalog").join("events")
    }

    fn stations_dir(&self) -> PathBuf {
        self.root.join("catalog").join("stations")
    }

    fn raw_dir(&self, event: &EventId) -> Result<PathBuf, StoreError> {
        Ok(self.root.join("traces").join("raw").join(component(event.as_str())?))
    }

    fn trace_path(&self, key: &TraceKey) -> Result<PathBuf, StoreError> {
        let mut path = self.root.join("traces").join(key.kind.label());
        if let Some(iteration) = key.kind.iteration() {
            path.push(component(iteration)?);
        }
        path.push(component(key.event.as_str())?);
        path.push(component(key.station.as_str())?);
        path.push(file_name(key.channel.as_str())?);
        Ok(path)
    }

    fn artifact_path(&self, iteration: &str, kind: ArtifactKind) -> Result<PathBuf, StoreError> {
        Ok(self
            .root
            .join("artifacts")
            .join(component(iteration)?)
            .join(file_name(kind.as_str())?))
    }

    fn read_json<T: DeserializeOwned>(path: &Path, what: impl FnOnce() -> String) -> Result<T, StoreError> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(what())),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn temp_file_for(path: &Path) -> Result<NamedTempFile, StoreError> {
        let parent = path
            .parent()
            .ok_or_else(|| StoreError::InvalidKey(path.display().to_string()))?;
        fs::create_dir_all(parent)?;
        Ok(NamedTempFile::new_in(parent)?)
    }

    fn fill<T: Serialize + ?Sized>(file: &mut NamedTempFile, value: &T) -> Result<(), StoreError> {
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            serde_json::to_writer(&mut writer, value)?;
            writer.flush()?;
        }
        file.as_file().sync_all()?;
        Ok(())
    }

    /// Write-to-temp then rename over any previous content.
    fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
        let mut file = Self::temp_file_for(path)?;
        Self::fill(&mut file, value)?;
        file.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Append-only write: identical content is accepted, different content conflicts.
    fn write_once<T: Serialize + DeserializeOwned + PartialEq>(path: &Path, id: &str, value: &T) -> Result<(), StoreError> {
        let mut file = Self::temp_file_for(path)?;
        Self::fill(&mut file, value)?;
        match file.persist_noclobber(path) {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                let existing: T = Self::read_json(path, || id.to_string())?;
                if existing == *value {
                    Ok(())
                } else {
                    Err(StoreError::Conflict(id.to_string()))
                }
            }
            Err(e) => Err(StoreError::Io(e.error)),
        }
    }

    fn read_catalog<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StoreError> {
        let mut entries = Vec::new();
        for path in Self::json_files(dir)? {
            entries.push(Self::read_json(&path, || path.display().to_string())?);
        }
        Ok(entries)
    }

    /// `*.json` files directly inside `dir`, sorted; a missing directory is empty.
    fn json_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let listing = match fs::read_dir(dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        for entry in listing {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Names of subdirectories of `dir`, sorted; a missing directory is empty.
    fn subdirectories(dir: &Path) -> Result<Vec<String>, StoreError> {
        let listing = match fs::read_dir(dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in listing {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn stem(path: &Path) -> Option<String> {
        path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
    }
}

impl TraceStore for FilesystemTraceStore {
    fn add_event(&self, event: Event) -> Result<(), StoreError> {
        let path = self.events_dir().join(file_name(event.id.as_str())?);
        Self::write_once(&path, event.id.as_str(), &event)
    }

    fn add_station(&self, station: Station) -> Result<(), StoreError> {
        let path = self.stations_dir().join(file_name(station.id.as_str())?);
        Self::write_once(&path, station.id.as_str(), &station)
    }

    fn events(&self) -> Result<Vec<Event>, StoreError> {
        let mut events: Vec<Event> = Self::read_catalog(&self.events_dir())?;
        events.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(events)
    }

    fn stations(&self) -> Result<Vec<Station>, StoreError> {
        let mut stations: Vec<Station> = Self::read_catalog(&self.stations_dir())?;
        stations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stations)
    }

    fn event(&self, id: &EventId) -> Result<Event, StoreError> {
        let path = self.events_dir().join(file_name(id.as_str())?);
        Self::read_json(&path, || format!("event {}", id))
    }

    fn station(&self, id: &StationId) -> Result<Station, StoreError> {
        let path = self.stations_dir().join(file_name(id.as_str())?);
        Self::read_json(&path, || format!("station {}", id))
    }

    fn read_trace(&self, key: &TraceKey) -> Result<Arc<Trace>, StoreError> {
        let path = self.trace_path(key)?;
        Self::read_json(&path, || key.to_string()).map(Arc::new)
    }

    fn write_trace(&self, key: &TraceKey, trace: &Trace) -> Result<(), StoreError> {
        Self::write_json(&self.trace_path(key)?, trace)
    }

    fn has_trace(&self, key: &TraceKey) -> Result<bool, StoreError> {
        Ok(self.trace_path(key)?.is_file())
    }

    fn remove_trace(&self, key: &TraceKey) -> Result<bool, StoreError> {
        match fs::remove_file(self.trace_path(key)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn channels(&self, event: &EventId, station: &StationId) -> Result<Vec<ChannelId>, StoreError> {
        let dir = self.raw_dir(event)?.join(component(station.as_str())?);
        Ok(Self::json_files(&dir)?
            .iter()
            .filter_map(|path| Self::stem(path))
            .map(ChannelId::new)
            .collect())
    }

    fn stations_with_data(&self, event: &EventId) -> Result<Vec<StationId>, StoreError> {
        let dir = self.raw_dir(event)?;
        let mut stations = Vec::new();
        for name in Self::subdirectories(&dir)? {
            if !Self::json_files(&dir.join(&name))?.is_empty() {
                stations.push(StationId::new(name));
            }
        }
        Ok(stations)
    }

    fn read_artifact(&self, iteration: &str, kind: ArtifactKind) -> Result<serde_json::Value, StoreError> {
        let path = self.artifact_path(iteration, kind)?;
        Self::read_json(&path, || format!("{}/{}", iteration, kind))
    }

    fn write_artifact(&self, iteration: &str, kind: ArtifactKind, value: &serde_json::Value) -> Result<(), StoreError> {
        Self::write_json(&self.artifact_path(iteration, kind)?, value)
    }

    fn artifact_iterations(&self, kind: ArtifactKind) -> Result<Vec<String>, StoreError> {
        let dir = self.root.join("artifacts");
        let wanted = format!("{}.{}", kind.as_str(), EXTENSION);
        Ok(Self::subdirectories(&dir)?
            .into_iter()
            .filter(|iteration| dir.join(iteration).join(&wanted).is_file())
            .collect())
    }
}
