// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Trace preprocessing: quality gates, resampling, detrend, taper, band-pass and
//! a signal-to-noise check against the predicted first arrival.

use crate::config::{MisfitConfig, PreprocessingConfig};
use crate::errors::DiscardReason;
use crate::model::{great_circle_distance_km, Event, Station, Trace};
use crate::signal::filter::{bandpass_zero_phase, demean, detrend_linear, resample_linear, rms, taper_cosine};

/// Sample intervals closer than this (relative) are treated as identical.
const SAME_RATE: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct Preprocessor {
    target_dt: f64,
    sample_rate_tolerance: f64,
    taper_fraction: f64,
    band: Option<(f64, f64)>,
    min_snr: f64,
    max_velocity: f64,
    noise_margin: f64,
}

impl Preprocessor {
    pub fn new(preprocessing: &PreprocessingConfig, misfit: &MisfitConfig) -> Self {
        Self {
            target_dt: 1.0 / preprocessing.sampling_rate(),
            sample_rate_tolerance: preprocessing.sample_rate_tolerance(),
            taper_fraction: preprocessing.taper_fraction(),
            band: preprocessing
                .bandpass()
                .then(|| (misfit.min_period(), misfit.max_period())),
            min_snr: preprocessing.min_snr(),
            max_velocity: preprocessing.max_velocity(),
            noise_margin: preprocessing.noise_margin(),
        }
    }

    pub fn target_dt(&self) -> f64 {
        self.target_dt
    }

    /// Processed trace, or `None` when the trace is discarded.
    pub fn process(&self, raw: &Trace, event: &Event, station: &Station) -> Option<Trace> {
        self.evaluate(raw, event, station).ok()
    }

    /// Like [`process`](Self::process) but reports why a trace was discarded.
    pub fn evaluate(&self, raw: &Trace, event: &Event, station: &Station) -> Result<Trace, DiscardReason> {
        if !raw.metadata.instrument_response {
            return Err(DiscardReason::MissingInstrumentResponse);
        }
        Self::check_samples(raw)?;

        let relative = (raw.dt - self.target_dt).abs() / self.target_dt;
        if relative > self.sample_rate_tolerance {
            return Err(DiscardReason::SampleRateMismatch);
        }

        let trace = self.condition(raw);
        self.check_snr(&trace, event, station)?;
        Ok(trace)
    }

    /// Resample, detrend, taper and filter a synthetic. Synthetics carry no
    /// instrument response and are resampled from any rate.
    pub fn process_synthetic(&self, synthetic: &Trace) -> Result<Trace, DiscardReason> {
        Self::check_samples(synthetic)?;
        Ok(self.condition(synthetic))
    }

    fn check_samples(trace: &Trace) -> Result<(), DiscardReason> {
        if trace.is_empty() {
            return Err(DiscardReason::EmptyTrace);
        }
        if !trace.is_finite() {
            return Err(DiscardReason::NonFiniteSamples);
        }
        Ok(())
    }

    fn condition(&self, input: &Trace) -> Trace {
        let mut trace = input.clone();
        let mut steps = Vec::new();

        if (trace.dt - self.target_dt).abs() > SAME_RATE * self.target_dt {
            trace.samples = resample_linear(&trace.samples, trace.dt, self.target_dt);
            trace.dt = self.target_dt;
            steps.push("resample");
        } else {
            trace.dt = self.target_dt;
        }

        demean(&mut trace.samples);
        detrend_linear(&mut trace.samples);
        taper_cosine(&mut trace.samples, self.taper_fraction);
        steps.extend(["demean", "detrend", "taper"]);

        if let Some((min_period, max_period)) = self.band {
            bandpass_zero_phase(&mut trace.samples, trace.dt, min_period, max_period);
            steps.push("bandpass");
        }

        trace
            .metadata
            .processing
            .extend(steps.into_iter().map(str::to_string));
        trace
    }

    /// Noise is everything before the predicted first arrival minus the margin.
    fn check_snr(&self, trace: &Trace, event: &Event, station: &Station) -> Result<(), DiscardReason> {
        let distance = great_circle_distance_km(event.latitude, event.longitude, station.latitude, station.longitude);
        let noise_end = distance / self.max_velocity - self.noise_margin - trace.start;
        if noise_end <= 0.0 {
            return Ok(());
        }
        let noise_samples = ((noise_end / trace.dt).floor() as usize).min(trace.len());
        if noise_samples == 0 {
            return Ok(());
        }

        let noise = rms(&trace.samples[..noise_samples]);
        let signal = rms(&trace.samples[noise_samples..]);
        if noise == 0.0 {
            return if signal > 0.0 {
                Ok(())
            } else {
                Err(DiscardReason::LowSignalToNoise)
            };
        }
        if signal / noise < self.min_snr {
            return Err(DiscardReason::LowSignalToNoise);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    /// Station roughly `km` kilometres east of the event.
    fn station_at(km: f64) -> Station {
        Station::new("XX.A", 0.0, km / 111.195)
    }

    fn instrumented(trace: Trace) -> Trace {
        trace.with_metadata(TraceMetadata {
            instrument_response: true,
            ..TraceMetadata::default()
        })
    }

    fn preprocessor(bandpass: bool) -> Preprocessor {
        let preprocessing = PreprocessingConfig {
            bandpass: Some(bandpass),
            ..PreprocessingConfig::default()
        };
        Preprocessor::new(&preprocessing, &MisfitConfig::default())
    }

    /// Quiet noise up to `arrival`, then a 20 s sinusoid of amplitude `amplitude`.
    fn arrival_trace(n: usize, arrival: usize, amplitude: f64) -> Trace {
        let samples = (0..n)
            .map(|i| {
                let noise = 0.01 * ((i * 7919 % 13) as f64 - 6.0) / 6.0;
                let signal = if i >= arrival {
                    amplitude * (2.0 * std::f64::consts::PI * i as f64 / 20.0).sin()
                } else {
                    0.0
                };
                noise + signal
            })
            .collect();
        instrumented(Trace::new(1.0, 0.0, samples))
    }

    #[test]
    fn test_missing_instrument_response_is_discarded() {
        let trace = Trace::new(1.0, 0.0, vec![1.0; 100]);
        assert_eq!(
            preprocessor(false).evaluate(&trace, &event(), &station_at(100.0)),
            Err(DiscardReason::MissingInstrumentResponse)
        );
        assert!(preprocessor(false).process(&trace, &event(), &station_at(100.0)).is_none());
    }

    #[test]
    fn test_empty_and_non_finite_traces_are_discarded() {
        let p = preprocessor(false);
        let empty = instrumented(Trace::new(1.0, 0.0, vec![]));
        let nan = instrumented(Trace::new(1.0, 0.0, vec![0.0, f64::NAN, 1.0]));
        assert_eq!(p.evaluate(&empty, &event(), &station_at(0.0)), Err(DiscardReason::EmptyTrace));
        assert_eq!(p.evaluate(&nan, &event(), &station_at(0.0)), Err(DiscardReason::NonFiniteSamples));
    }

    #[test]
    fn test_sample_rate_outside_tolerance_is_discarded() {
        let trace = instrumented(Trace::new(0.5, 0.0, vec![0.0; 100]));
        assert_eq!(
            preprocessor(false).evaluate(&trace, &event(), &station_at(0.0)),
            Err(DiscardReason::SampleRateMismatch)
        );
    }

    #[test]
    fn test_rate_within_tolerance_is_resampled_onto_target_grid() {
        let samples: Vec<f64> = (0..200).map(|i| (i as f64 * 0.1).sin()).collect();
        let trace = instrumented(Trace::new(1.005, 0.0, samples));
        let processed = preprocessor(false).evaluate(&trace, &event(), &station_at(0.0)).unwrap();

        assert_eq!(processed.dt, 1.0);
        assert_eq!(processed.len(), 200);
        assert_eq!(processed.metadata.processing[0], "resample");
    }

    #[test]
    fn test_output_is_demeaned_and_tapered() {
        let trace = instrumented(Trace::new(1.0, 0.0, (0..300).map(|i| 5.0 + i as f64).collect()));
        let processed = preprocessor(false).evaluate(&trace, &event(), &station_at(0.0)).unwrap();

        assert!(processed.samples[0].abs() < 1e-9);
        assert!(processed.samples[299].abs() < 1e-9);
        assert!(processed.samples.iter().all(|s| s.abs() < 1e-6));
        assert_eq!(processed.metadata.processing, vec!["demean", "detrend", "taper"]);
    }

    #[test]
    fn test_low_snr_discarded_and_strong_arrival_kept() {
        // 1600 km at 8 km/s: first arrival at 200 s, noise window ends at 180 s.
        let station = station_at(1600.0);
        let p = preprocessor(false);

        let strong = arrival_trace(600, 200, 1.0);
        assert!(p.evaluate(&strong, &event(), &station).is_ok());

        let weak = arrival_trace(600, 200, 0.001);
        assert_eq!(p.evaluate(&weak, &event(), &station), Err(DiscardReason::LowSignalToNoise));
    }

    #[test]
    fn test_snr_check_skipped_without_noise_samples() {
        let weak = arrival_trace(600, 0, 0.0001);
        assert!(preprocessor(false).evaluate(&weak, &event(), &station_at(10.0)).is_ok());
    }

    #[test]
    fn test_synthetic_is_resampled_from_any_rate() {
        let synthetic = Trace::new(0.25, 0.0, (0..400).map(|i| (i as f64 * 0.05).sin()).collect());
        let processed = preprocessor(true).process_synthetic(&synthetic).unwrap();
        assert_eq!(processed.dt, 1.0);
        assert_eq!(processed.len(), 100);
        assert!(processed.metadata.processing.contains(&"bandpass".to_string()));
    }
}
