// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Automatic measurement window selection on one observed/synthetic pair.
//!
//! Candidates are runs of strong synthetic envelope. A candidate survives when
//! the observation is in phase with the synthetic inside it and stands out from
//! the noise before it. Survivors are merged, short ones dropped, and the result
//! is sample-aligned, sorted and disjoint.

use std::ops::RangeInclusive;
use tracing::debug;

use crate::config::WindowConfig;
use crate::errors::SelectionError;
use crate::model::{validate_windows, Trace, Window};
use crate::signal::filter::rms;
use crate::signal::{cross_correlation_lag, envelope};

#[derive(Debug, Clone)]
pub struct WindowSelector {
    envelope_threshold: f64,
    margin: f64,
    max_lag_fraction: f64,
    min_cc: f64,
    min_snr: f64,
    merge_gap: f64,
    min_length: f64,
    dominant_period: f64,
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Rejection {
    NoCorrelation,
    LagTooLarge,
    LowCorrelation,
    NoNoise,
    LowSignalToNoise,
}

impl WindowSelector {
    /// `dominant_period` bounds the lag search and scales the lag tolerance.
    pub fn new(config: &WindowConfig, dominant_period: f64) -> Self {
        Self {
            envelope_threshold: config.envelope_threshold(),
            margin: config.margin(),
            max_lag_fraction: config.max_lag_fraction(),
            min_cc: config.min_cc(),
            min_snr: config.min_snr(),
            merge_gap: config.merge_gap(),
            min_length: config.min_length(),
            dominant_period,
        }
    }

    pub fn select_windows(&self, observed: &Trace, synthetic: &Trace) -> Result<Vec<Window>, SelectionError> {
        if !observed.same_grid(synthetic) {
            return Err(SelectionError::IncompatibleTraces(format!(
                "observed (dt {}, start {}, {} samples) vs synthetic (dt {}, start {}, {} samples)",
                observed.dt,
                observed.start,
                observed.len(),
                synthetic.dt,
                synthetic.start,
                synthetic.len()
            )));
        }
        if synthetic.is_empty() {
            return Ok(Vec::new());
        }

        let dt = synthetic.dt;
        let accepted: Vec<RangeInclusive<usize>> = self
            .candidates(synthetic)
            .into_iter()
            .filter(|range| match self.check(observed, synthetic, range) {
                Ok(()) => true,
                Err(rejection) => {
                    debug!(start = range.start(), end = range.end(), ?rejection, "Window candidate rejected");
                    false
                }
            })
            .collect();

        let windows = self
            .merge(accepted, dt)
            .into_iter()
            .filter(|range| range.end() > range.start())
            .filter(|range| (range.end() - range.start()) as f64 * dt >= self.min_length)
            .map(|range| Window::from_samples(*range.start(), *range.end(), dt))
            .collect::<Result<Vec<_>, _>>()?;

        validate_windows(&windows, synthetic.duration())?;
        Ok(windows)
    }

    /// Runs of synthetic envelope above the threshold, padded by the margin.
    fn candidates(&self, synthetic: &Trace) -> Vec<RangeInclusive<usize>> {
        let env = envelope(&synthetic.samples);
        let peak = env.iter().copied().fold(0.0, f64::max);
        if peak <= 0.0 {
            return Vec::new();
        }
        let level = self.envelope_threshold * peak;
        let pad = (self.margin / synthetic.dt).round() as usize;
        let last = env.len() - 1;

        let mut runs = Vec::new();
        let mut run_start: Option<usize> = None;
        for (i, value) in env.iter().enumerate() {
            match (run_start, *value >= level) {
                (None, true) => run_start = Some(i),
                (Some(start), false) => {
                    runs.push(start.saturating_sub(pad)..=(i - 1 + pad).min(last));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            runs.push(start.saturating_sub(pad)..=last);
        }
        runs
    }

    fn check(&self, observed: &Trace, synthetic: &Trace, range: &RangeInclusive<usize>) -> Result<(), Rejection> {
        let dt = synthetic.dt;
        let obs = &observed.samples[range.clone()];
        let syn = &synthetic.samples[range.clone()];

        let max_lag = (self.dominant_period / dt).ceil() as usize;
        let peak = cross_correlation_lag(obs, syn, max_lag).ok_or(Rejection::NoCorrelation)?;
        if (peak.lag_samples * dt).abs() > self.max_lag_fraction * self.dominant_period {
            return Err(Rejection::LagTooLarge);
        }
        if peak.coefficient < self.min_cc {
            return Err(Rejection::LowCorrelation);
        }

        // Leading noise window of the same length, clipped at the trace start.
        let length = range.end() - range.start() + 1;
        let noise = &observed.samples[range.start().saturating_sub(length)..*range.start()];
        if noise.is_empty() {
            return Err(Rejection::NoNoise);
        }
        let noise_level = rms(noise);
        if noise_level == 0.0 {
            return Ok(());
        }
        if rms(obs) / noise_level < self.min_snr {
            return Err(Rejection::LowSignalToNoise);
        }
        Ok(())
    }

    /// Merge overlapping ranges and ranges separated by at most `merge_gap` seconds.
    fn merge(&self, mut ranges: Vec<RangeInclusive<usize>>, dt: f64) -> Vec<RangeInclusive<usize>> {
        ranges.sort_by_key(|range| *range.start());
        let mut merged: Vec<RangeInclusive<usize>> = Vec::with_capacity(ranges.len());

        for range in ranges {
            if let Some(current) = merged.last_mut() {
                let joins = *range.start() <= current.end() + 1
                    || (range.start() - current.end()) as f64 * dt <= self.merge_gap;
                if joins {
                    let end = (*current.end()).max(*range.end());
                    *current = *current.start()..=end;
                    continue;
                }
            }
            merged.push(range);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::kernels::test_support::wavelet;

    fn selector() -> WindowSelector {
        WindowSelector::new(&WindowConfig::default(), 40.0)
    }

    fn noisy(mut trace: Trace, amplitude: f64) -> Trace {
        for (i, s) in trace.samples.iter_mut().enumerate() {
            *s += amplitude * (((i * 7919) % 17) as f64 - 8.0) / 8.0;
        }
        trace
    }

    #[test]
    fn test_aligned_arrival_is_windowed() {
        let synthetic = wavelet(1000, 1.0, 500.0, 20.0, 8.0);
        let observed = noisy(wavelet(1000, 1.0, 502.0, 20.0, 8.0), 0.001);

        let windows = selector().select_windows(&observed, &synthetic).unwrap();
        assert_eq!(windows.len(), 1);
        assert!(windows[0].start <= 500.0 && windows[0].end >= 500.0);
        assert!(validate_windows(&windows, synthetic.duration()).is_ok());
        // Sample aligned.
        assert_eq!(windows[0].start.fract(), 0.0);
        assert_eq!(windows[0].end.fract(), 0.0);
    }

    #[test]
    fn test_two_separated_arrivals_give_sorted_disjoint_windows() {
        let first = wavelet(1500, 1.0, 400.0, 20.0, 8.0);
        let second = wavelet(1500, 1.0, 1100.0, 20.0, 8.0);
        let mut synthetic = first.clone();
        for (s, t) in synthetic.samples.iter_mut().zip(&second.samples) {
            *s += t;
        }
        let observed = noisy(synthetic.clone(), 0.001);

        let windows = selector().select_windows(&observed, &synthetic).unwrap();
        assert_eq!(windows.len(), 2);
        assert!(windows[0].end < windows[1].start);
        assert!(windows[0].start <= 400.0 && 400.0 <= windows[0].end);
        assert!(windows[1].start <= 1100.0 && 1100.0 <= windows[1].end);
    }

    #[test]
    fn test_poorly_correlated_observation_is_rejected() {
        let synthetic = wavelet(1000, 1.0, 500.0, 20.0, 8.0);
        let mut observed = synthetic.clone();
        observed.samples.iter_mut().for_each(|s| *s = -*s);
        let observed = noisy(observed, 0.001);

        let config = WindowConfig {
            min_cc: Some(0.9),
            ..WindowConfig::default()
        };
        let windows = WindowSelector::new(&config, 40.0)
            .select_windows(&observed, &synthetic)
            .unwrap();
        assert!(windows.is_empty());
    }

    #[test]
    fn test_noise_dominated_observation_is_rejected() {
        let synthetic = wavelet(1000, 1.0, 500.0, 20.0, 8.0);
        let observed = noisy(wavelet(1000, 1.0, 500.0, 20.0, 8.0), 0.8);

        let config = WindowConfig {
            min_cc: Some(0.0),
            ..WindowConfig::default()
        };
        let windows = WindowSelector::new(&config, 40.0)
            .select_windows(&observed, &synthetic)
            .unwrap();
        assert!(windows.is_empty());
    }

    #[test]
    fn test_arrival_at_trace_start_has_no_noise_and_is_rejected() {
        let synthetic = wavelet(600, 1.0, 20.0, 20.0, 8.0);
        let observed = noisy(synthetic.clone(), 0.001);
        assert!(selector().select_windows(&observed, &synthetic).unwrap().is_empty());
    }

    #[test]
    fn test_silent_synthetic_yields_no_windows() {
        let synthetic = Trace::new(1.0, 0.0, vec![0.0; 100]);
        let observed = noisy(synthetic.clone(), 0.1);
        assert!(selector().select_windows(&observed, &synthetic).unwrap().is_empty());
    }

    #[test]
    fn test_different_grids_are_incompatible() {
        let synthetic = Trace::new(1.0, 0.0, vec![0.0; 100]);
        let observed = Trace::new(0.5, 0.0, vec![0.0; 100]);
        assert!(matches!(
            selector().select_windows(&observed, &synthetic),
            Err(SelectionError::IncompatibleTraces(_))
        ));
    }

    /// A candidate that collapses to one sample gives no window rather than an error.
    #[test]
    fn test_single_sample_candidate_is_dropped() {
        let synthetic = wavelet(1000, 1.0, 500.0, 20.0, 8.0);
        let observed = noisy(synthetic.clone(), 0.001);
        let config = WindowConfig {
            envelope_threshold: Some(1.0),
            margin: Some(0.0),
            min_length: Some(0.0),
            min_cc: Some(-1.0),
            min_snr: Some(0.0),
            ..WindowConfig::default()
        };

        let windows = WindowSelector::new(&config, 40.0)
            .select_windows(&observed, &synthetic)
            .unwrap();
        assert!(windows.iter().all(|w| w.length() > 0.0));
    }

    #[test]
    fn test_close_candidates_are_merged() {
        let s = selector();
        let merged = s.merge(vec![30..=40, 10..=20, 23..=25, 100..=120], 1.0);
        assert_eq!(merged, vec![10..=40, 100..=120]);
    }
}
