// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Versioned envelope around every persisted iteration artifact.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::consts::ARTIFACT_FORMAT_VERSION;
use crate::errors::StoreError;
use crate::traits::{ArtifactKind, TraceStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEnvelope {
    pub format_version: u32,
    pub iteration: String,
    pub kind: ArtifactKind,
    pub payload: serde_json::Value,
}

impl ArtifactEnvelope {
    /// Check the envelope matches what the caller asked for.
    fn verify(&self, iteration: &str, kind: ArtifactKind) -> Result<(), StoreError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(StoreError::IncompatibleArtifact(format!(
                "{}/{} has format version {}, expected {}",
                iteration, kind, self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        if self.kind != kind || self.iteration != iteration {
            return Err(StoreError::IncompatibleArtifact(format!(
                "{}/{} contains {}/{}",
                iteration, kind, self.iteration, self.kind
            )));
        }
        Ok(())
    }
}

pub fn save_artifact<S, T>(store: &S, iteration: &str, kind: ArtifactKind, payload: &T) -> Result<(), StoreError>
where
    S: TraceStore + ?Sized,
    T: Serialize,
{
    let envelope = ArtifactEnvelope {
        format_version: ARTIFACT_FORMAT_VERSION,
        iteration: iteration.to_string(),
        kind,
        payload: serde_json::to_value(payload)?,
    };
    store.write_artifact(iteration, kind, &serde_json::to_value(&envelope)?)
}

pub fn load_artifact<S, T>(store: &S, iteration: &str, kind: ArtifactKind) -> Result<T, StoreError>
where
    S: TraceStore + ?Sized,
    T: DeserializeOwned,
{
    let raw = store.read_artifact(iteration, kind)?;
    let envelope: ArtifactEnvelope = serde_json::from_value(raw)
        .map_err(|e| StoreError::IncompatibleArtifact(format!("{}/{}: {}", iteration, kind, e)))?;
    envelope.verify(iteration, kind)?;
    Ok(serde_json::from_value(envelope.payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::store::MemoryTraceStore;
    use crate::model::{StationId, WeightSet};

    #[test]
    fn test_payload_survives_envelope() {
        let store = MemoryTraceStore::new();
        let mut weights = WeightSet::new();
        weights.insert(StationId::new("XX.A"), 0.5).unwrap();

        save_artifact(&store, "it0", ArtifactKind::Weights, &weights).unwrap();
        let raw = store.read_artifact("it0", ArtifactKind::Weights).unwrap();
        assert_eq!(raw["format_version"], ARTIFACT_FORMAT_VERSION);
        assert_eq!(raw["kind"], "weights");

        let loaded: WeightSet = load_artifact(&store, "it0", ArtifactKind::Weights).unwrap();
        assert_eq!(loaded.weight(&StationId::new("XX.A")), 0.5);
    }

    #[test]
    fn test_version_mismatch_is_incompatible() {
        let store = MemoryTraceStore::new();
        let envelope = serde_json::json!({
            "format_version": ARTIFACT_FORMAT_VERSION + 1,
            "iteration": "it0",
            "kind": "weights",
            "payload": {}
        });
        store.write_artifact("it0", ArtifactKind::Weights, &envelope).unwrap();

        let result: Result<serde_json::Value, _> = load_artifact(&store, "it0", ArtifactKind::Weights);
        assert!(matches!(result, Err(StoreError::IncompatibleArtifact(_))));
    }

    #[test]
    fn test_unenveloped_or_mislabelled_content_is_incompatible() {
        let store = MemoryTraceStore::new();
        store
            .write_artifact("it0", ArtifactKind::Windows, &serde_json::json!([1, 2, 3]))
            .unwrap();
        let result: Result<serde_json::Value, _> = load_artifact(&store, "it0", ArtifactKind::Windows);
        assert!(matches!(result, Err(StoreError::IncompatibleArtifact(_))));

        save_artifact(&store, "it1", ArtifactKind::Misfits, &Vec::<u8>::new()).unwrap();
        let moved = store.read_artifact("it1", ArtifactKind::Misfits).unwrap();
        store.write_artifact("it1", ArtifactKind::Weights, &moved).unwrap();
        let result: Result<serde_json::Value, _> = load_artifact(&store, "it1", ArtifactKind::Weights);
        assert!(matches!(result, Err(StoreError::IncompatibleArtifact(_))));
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let store = MemoryTraceStore::new();
        let result: Result<WeightSet, _> = load_artifact(&store, "it9", ArtifactKind::Weights);
        assert!(result.unwrap_err().is_not_found());
    }
}
