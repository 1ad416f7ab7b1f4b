// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounded map-then-reduce over (event, station, channel) measurement units.
//!
//! Each unit reads its observed and synthetic traces, preprocesses both, aligns
//! them on a common grid, selects (or reuses) windows and measures every window.
//! Units share nothing mutable: the store, kernel and processing stages are
//! read-only behind `Arc`. At most `max_concurrency` units run at once; the CPU
//! work of a unit runs on the blocking pool. Results come back sorted by key so
//! the reduction does not depend on completion order.

use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::errors::{DiscardReason, ExecutionError};
use crate::model::{ChannelKey, Event, MisfitRecord, Station, Trace, TraceKey, Window, validate_windows};
use crate::processing::{MisfitEngine, Preprocessor, WindowSelector};
use crate::traits::{MisfitKernel, TraceStore};

/// Largest start-time difference, in samples, tolerated between processed
/// observed and synthetic traces.
const START_TOLERANCE_SAMPLES: f64 = 0.5;

/// Read-only state shared by every unit of one measurement run.
pub struct MeasurementContext {
    pub iteration: String,
    pub store: Arc<dyn TraceStore>,
    pub kernel: Arc<dyn MisfitKernel>,
    pub preprocessor: Preprocessor,
    pub selector: WindowSelector,
}

/// One (event, station, channel) triple to measure.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub key: ChannelKey,
    pub event: Event,
    pub station: Station,
    /// Windows taken over from an earlier iteration instead of selecting new ones.
    pub reused_windows: Option<Vec<Window>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    /// At least one window was measured. `duration` is the measured trace duration
    /// the windows were checked against.
    Measured {
        windows: Vec<Window>,
        duration: f64,
        records: Vec<MisfitRecord>,
    },
    /// Both traces were usable but no window qualified.
    NoWindows,
    Discarded(DiscardReason),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitResult {
    pub key: ChannelKey,
    pub outcome: UnitOutcome,
}

/// Runs measurement units on a bounded pool of tokio tasks.
pub struct MeasurementExecutor {
    max_concurrency: usize,
}

impl MeasurementExecutor {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Measure every unit. Per-unit problems are reported in the results; only a
    /// broken worker pool is an error.
    pub async fn run(
        &self,
        context: Arc<MeasurementContext>,
        units: Vec<WorkUnit>,
    ) -> Result<Vec<UnitResult>, ExecutionError> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = Vec::with_capacity(units.len());

        for unit in units {
            let semaphore = semaphore.clone();
            let context = context.clone();
            let name = unit.key.to_string();

            let task = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| ExecutionError::PermitUnavailable {
                        unit: unit.key.to_string(),
                        reason: e.to_string(),
                    })?;

                let key = unit.key.clone();
                tokio::task::spawn_blocking(move || UnitResult {
                    key: unit.key.clone(),
                    outcome: measure_unit(&context, &unit),
                })
                .await
                .map_err(|e| ExecutionError::TaskJoin {
                    unit: key.to_string(),
                    reason: e.to_string(),
                })
            });
            tasks.push((name, task));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (name, task) in tasks {
            let result = task.await.map_err(|e| ExecutionError::TaskJoin {
                unit: name,
                reason: e.to_string(),
            })??;
            results.push(result);
        }
        results.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(results)
    }
}

fn read(store: &dyn TraceStore, key: &TraceKey, missing: DiscardReason) -> Result<Arc<Trace>, UnitOutcome> {
    store.read_trace(key).map_err(|e| {
        if e.is_not_found() {
            UnitOutcome::Discarded(missing)
        } else {
            UnitOutcome::Failed(e.to_string())
        }
    })
}

/// Bring both processed traces onto one grid: same start, same length.
fn align(mut observed: Trace, mut synthetic: Trace) -> Result<(Trace, Trace), String> {
    let offset = (observed.start - synthetic.start).abs();
    if offset > START_TOLERANCE_SAMPLES * observed.dt {
        return Err(format!(
            "observed starts at {} s but synthetic at {} s",
            observed.start, synthetic.start
        ));
    }
    let len = observed.len().min(synthetic.len());
    observed.samples.truncate(len);
    synthetic.samples.truncate(len);
    synthetic.start = observed.start;
    Ok((observed, synthetic))
}

fn measure_unit(context: &MeasurementContext, unit: &WorkUnit) -> UnitOutcome {
    match try_measure_unit(context, unit) {
        Ok(outcome) | Err(outcome) => outcome,
    }
}

fn try_measure_unit(context: &MeasurementContext, unit: &WorkUnit) -> Result<UnitOutcome, UnitOutcome> {
    let key = &unit.key;
    let raw_key = TraceKey::raw(&key.event, &key.station, &key.channel);
    let synthetic_key = TraceKey::synthetic(&key.event, &key.station, &key.channel, &context.iteration);

    let raw = read(context.store.as_ref(), &raw_key, DiscardReason::MissingObservedTrace)?;
    let synthetic = read(context.store.as_ref(), &synthetic_key, DiscardReason::MissingSyntheticTrace)?;

    let observed = context
        .preprocessor
        .evaluate(&raw, &unit.event, &unit.station)
        .map_err(UnitOutcome::Discarded)?;
    let synthetic = context
        .preprocessor
        .process_synthetic(&synthetic)
        .map_err(UnitOutcome::Discarded)?;
    let (observed, synthetic) = align(observed, synthetic).map_err(UnitOutcome::Failed)?;

    let duration = synthetic.duration();
    let windows = match &unit.reused_windows {
        Some(windows) => {
            validate_windows(windows, duration).map_err(|e| UnitOutcome::Failed(e.to_string()))?;
            windows.clone()
        }
        None => context
            .selector
            .select_windows(&observed, &synthetic)
            .map_err(|e| UnitOutcome::Failed(e.to_string()))?,
    };
    if windows.is_empty() {
        return Ok(UnitOutcome::NoWindows);
    }

    let mut records = Vec::with_capacity(windows.len());
    for window in &windows {
        let measurement = MisfitEngine::measure(context.kernel.as_ref(), &observed, &synthetic, window)
            .map_err(|e| UnitOutcome::Failed(e.to_string()))?;
        records.push(MisfitRecord {
            key: key.clone(),
            iteration: context.iteration.clone(),
            window: *window,
            misfit: measurement.misfit,
            measurement: measurement.measurement,
            adjoint_source: measurement.adjoint_source,
        });
    }

    Ok(UnitOutcome::Measured {
        windows,
        duration,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::kernels::test_support::wavelet;
    use crate::backends::kernels::WaveformL2Kernel;
    use crate::backends::store::MemoryTraceStore;
    use crate::config::{MisfitConfig, PreprocessingConfig, WindowConfig};
    use crate::model::TraceMetadata;
    use chrono::Utc;

    fn event() -> Event {
        Event {
            id: "E1".into(),
            origin_time: Utc::now(),
            latitude: 0.0,
            longitude: 0.0,
            depth_km: 10.0,
            magnitude: 6.0,
            moment_tensor: Default::default(),
        }
    }

    fn context(store: Arc<MemoryTraceStore>) -> Arc<MeasurementContext> {
        let preprocessing = PreprocessingConfig {
            bandpass: Some(false),
            ..PreprocessingConfig::default()
        };
        Arc::new(MeasurementContext {
            iteration: "it0".to_string(),
            store,
            kernel: Arc::new(WaveformL2Kernel::new()),
            preprocessor: Preprocessor::new(&preprocessing, &MisfitConfig::default()),
            selector: WindowSelector::new(&WindowConfig::default(), 40.0),
        })
    }

    fn unit(station: &str, channel: &str) -> WorkUnit {
        WorkUnit {
            key: ChannelKey::new(&"E1".into(), &station.into(), &channel.into()),
            event: event(),
            station: Station::new(station, 0.0, 1.0),
            reused_windows: None,
        }
    }

    fn write_pair(store: &MemoryTraceStore, station: &str, channel: &str, observed: Trace, synthetic: Trace) {
        let (e, s, c) = ("E1".into(), station.into(), channel.into());
        let observed = observed.with_metadata(TraceMetadata {
            instrument_response: true,
            ..TraceMetadata::default()
        });
        store.write_trace(&TraceKey::raw(&e, &s, &c), &observed).unwrap();
        store.write_trace(&TraceKey::synthetic(&e, &s, &c, "it0"), &synthetic).unwrap();
    }

    #[tokio::test]
    async fn test_units_are_measured_and_sorted() {
        let store = Arc::new(MemoryTraceStore::new());
        for station in ["XX.C", "XX.A", "XX.B"] {
            write_pair(
                &store,
                station,
                "BHZ",
                wavelet(1000, 1.0, 500.0, 20.0, 8.0),
                wavelet(1000, 1.0, 501.0, 20.0, 8.0),
            );
        }
        let units = vec![unit("XX.C", "BHZ"), unit("XX.A", "BHZ"), unit("XX.B", "BHZ")];

        let results = MeasurementExecutor::new(2).run(context(store), units).await.unwrap();
        let stations: Vec<_> = results.iter().map(|r| r.key.station.as_str()).collect();
        assert_eq!(stations, vec!["XX.A", "XX.B", "XX.C"]);
        for result in &results {
            match &result.outcome {
                UnitOutcome::Measured { windows, records, .. } => {
                    assert_eq!(windows.len(), records.len());
                    assert!(records.iter().all(|r| r.misfit > 0.0));
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_missing_traces_are_discarded_not_failed() {
        let store = Arc::new(MemoryTraceStore::new());
        let e = "E1".into();
        store
            .write_trace(
                &TraceKey::synthetic(&e, &"XX.A".into(), &"BHZ".into(), "it0"),
                &wavelet(100, 1.0, 50.0, 20.0, 8.0),
            )
            .unwrap();
        store
            .write_trace(
                &TraceKey::raw(&e, &"XX.B".into(), &"BHZ".into()),
                &wavelet(100, 1.0, 50.0, 20.0, 8.0),
            )
            .unwrap();

        let results = MeasurementExecutor::new(4)
            .run(context(store), vec![unit("XX.A", "BHZ"), unit("XX.B", "BHZ")])
            .await
            .unwrap();
        assert_eq!(results[0].outcome, UnitOutcome::Discarded(DiscardReason::MissingObservedTrace));
        assert_eq!(results[1].outcome, UnitOutcome::Discarded(DiscardReason::MissingSyntheticTrace));
    }

    #[tokio::test]
    async fn test_misaligned_start_fails_only_that_unit() {
        let store = Arc::new(MemoryTraceStore::new());
        let mut late = wavelet(1000, 1.0, 500.0, 20.0, 8.0);
        late.start = 30.0;
        write_pair(&store, "XX.A", "BHZ", wavelet(1000, 1.0, 500.0, 20.0, 8.0), late);
        write_pair(
            &store,
            "XX.B",
            "BHZ",
            wavelet(1000, 1.0, 500.0, 20.0, 8.0),
            wavelet(1000, 1.0, 500.0, 20.0, 8.0),
        );

        let results = MeasurementExecutor::new(1)
            .run(context(store), vec![unit("XX.A", "BHZ"), unit("XX.B", "BHZ")])
            .await
            .unwrap();
        assert!(matches!(results[0].outcome, UnitOutcome::Failed(_)));
        assert!(matches!(results[1].outcome, UnitOutcome::Measured { .. }));
    }

    #[tokio::test]
    async fn test_reused_windows_skip_selection() {
        let store = Arc::new(MemoryTraceStore::new());
        write_pair(
            &store,
            "XX.A",
            "BHZ",
            wavelet(1000, 1.0, 500.0, 20.0, 8.0),
            wavelet(1000, 1.0, 503.0, 20.0, 8.0),
        );
        let mut reused = unit("XX.A", "BHZ");
        reused.reused_windows = Some(vec![Window::new(100.0, 200.0).unwrap(), Window::new(450.0, 550.0).unwrap()]);

        let results = MeasurementExecutor::new(1).run(context(store), vec![reused]).await.unwrap();
        match &results[0].outcome {
            UnitOutcome::Measured { windows, records, .. } => {
                assert_eq!(windows[0], Window::new(100.0, 200.0).unwrap());
                assert_eq!(records.len(), 2);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_align_truncates_to_common_length() {
        let observed = Trace::new(1.0, 0.0, vec![1.0; 10]);
        let synthetic = Trace::new(1.0, 0.2, vec![2.0; 8]);
        let (o, s) = align(observed, synthetic).unwrap();
        assert!(o.same_grid(&s));
        assert_eq!(o.len(), 8);
    }
}
