// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype wrapper for event identifiers providing type safety.
///
/// Ordering is lexicographic on the underlying string, which is the ordering
/// every deterministic listing in the crate relies on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Moment tensor components in spherical coordinates (N·m).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MomentTensor {
    pub mrr: f64,
    pub mtt: f64,
    pub mpp: f64,
    pub mrt: f64,
    pub mrp: f64,
    pub mtp: f64,
}

impl MomentTensor {
    /// Scalar moment `M0 = sqrt(Σ Mij² / 2)` over the full symmetric tensor.
    pub fn scalar_moment(&self) -> f64 {
        let diagonal = self.mrr.powi(2) + self.mtt.powi(2) + self.mpp.powi(2);
        let off_diagonal = 2.0 * (self.mrt.powi(2) + self.mrp.powi(2) + self.mtp.powi(2));
        ((diagonal + off_diagonal) / 2.0).sqrt()
    }
}

/// A seismic source. Immutable once added to a project catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub origin_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: f64,
    pub magnitude: f64,
    #[serde(default)]
    pub moment_tensor: MomentTensor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ids_order_lexicographically() {
        let mut ids = vec![EventId::new("b"), EventId::new("a10"), EventId::new("a2")];
        ids.sort();
        assert_eq!(ids, vec![EventId::new("a10"), EventId::new("a2"), EventId::new("b")]);
    }

    #[test]
    fn test_scalar_moment_of_pure_double_couple() {
        let tensor = MomentTensor {
            mrt: 1.0e18,
            ..Default::default()
        };
        assert!((tensor.scalar_moment() - 1.0e18).abs() < 1.0);
    }
}
