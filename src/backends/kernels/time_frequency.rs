// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Time-frequency phase misfit.
//!
//! Both windowed signals are decomposed with a Gaussian short-time Fourier
//! transform. Per cell `(t, f)` inside the measurement band the phase difference
//! `Δφ = arg(S · conj(O))` is weighted by the observed amplitude normalized to its
//! maximum, `W = |O| / max|O|`; cells with `W` below the amplitude threshold are
//! ignored. The misfit is `½ Σ W Δφ² Δt Δf`.
//!
//! The adjoint source is the gradient of the misfit with respect to the synthetic
//! samples, mapped back to the time domain through the transpose of the STFT and
//! divided by `dt` so it matches the waveform kernel's scaling.

use num_complex::Complex64;
use std::ops::RangeInclusive;

use super::window_samples;
use crate::errors::MisfitError;
use crate::model::{Trace, Window};
use crate::signal::{next_power_of_two, Stft};
use crate::traits::MisfitKernel;

pub struct TimeFrequencyKernel {
    min_period: f64,
    max_period: f64,
    amplitude_threshold: f64,
}

struct PhaseMeasurement {
    misfit: f64,
    adjoint: Vec<f64>,
}

impl TimeFrequencyKernel {
    pub fn new(min_period: f64, max_period: f64, amplitude_threshold: f64) -> Self {
        Self {
            min_period,
            max_period,
            amplitude_threshold,
        }
    }

    fn masked(trace: &Trace, range: &RangeInclusive<usize>) -> Vec<f64> {
        trace
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| if range.contains(&i) { *s } else { 0.0 })
            .collect()
    }

    fn evaluate(&self, observed: &Trace, synthetic: &Trace, window: &Window) -> Result<PhaseMeasurement, MisfitError> {
        let range = window_samples(self.name(), synthetic, window, 4)?;
        let n = synthetic.len();
        let dt = synthetic.dt;
        let obs = Self::masked(observed, &range);
        let syn = Self::masked(synthetic, &range);

        // Two dominant periods per frame, but never longer than the trace.
        let frame_len = ((2.0 * self.max_period / dt).ceil() as usize).min(next_power_of_two(n));
        let stft = Stft::new(frame_len);
        let frame_len = stft.frame_len();
        let df = 1.0 / (frame_len as f64 * dt);
        let (f_low, f_high) = (1.0 / self.max_period, 1.0 / self.min_period);
        let bins: Vec<usize> = (1..frame_len / 2)
            .filter(|&k| {
                let f = k as f64 * df;
                f >= f_low * (1.0 - 1e-9) && f <= f_high * (1.0 + 1e-9)
            })
            .collect();

        let mut adjoint = vec![0.0; n];
        let obs_spec = stft.analyze(&obs);
        let syn_spec = stft.analyze(&syn);
        let max_amplitude = obs_spec
            .iter()
            .flat_map(|frame| bins.iter().map(move |&k| frame[k].norm()))
            .fold(0.0, f64::max);
        if bins.is_empty() || max_amplitude <= 0.0 {
            return Ok(PhaseMeasurement { misfit: 0.0, adjoint });
        }

        let cell_area = stft.hop() as f64 * dt * df;
        let mut misfit = 0.0;
        let starts = stft.frame_starts(n);

        for ((start, o_frame), s_frame) in starts.iter().zip(&obs_spec).zip(&syn_spec) {
            let mut gradient = vec![Complex64::new(0.0, 0.0); frame_len];
            let mut touched = false;

            for &k in &bins {
                let (o, s) = (o_frame[k], s_frame[k]);
                let weight = o.norm() / max_amplitude;
                if weight < self.amplitude_threshold || s.norm_sqr() == 0.0 {
                    continue;
                }
                let phase = (s * o.conj()).arg();
                misfit += 0.5 * weight * phase * phase * cell_area;
                // d arg(S_k) / d s[m] = Im(h(m) e^{-2πikm/L} / S_k)
                gradient[k] = Complex64::new(weight * phase, 0.0) / s;
                touched = true;
            }
            if !touched {
                continue;
            }

            stft.forward(&mut gradient);
            for (m, g) in gradient.iter().enumerate() {
                let Ok(index) = usize::try_from(start + m as isize) else {
                    continue;
                };
                if range.contains(&index) {
                    adjoint[index] += cell_area * stft.window()[m] * g.im / dt;
                }
            }
        }

        Ok(PhaseMeasurement { misfit, adjoint })
    }
}

impl MisfitKernel for TimeFrequencyKernel {
    fn name(&self) -> &'static str {
        "time_frequency"
    }

    fn compute_misfit(&self, observed: &Trace, synthetic: &Trace, window: &Window) -> Result<f64, MisfitError> {
        self.evaluate(observed, synthetic, window).map(|m| m.misfit)
    }

    fn compute_adjoint_source(
        &self,
        observed: &Trace,
        synthetic: &Trace,
        window: &Window,
    ) -> Result<Vec<f64>, MisfitError> {
        self.evaluate(observed, synthetic, window).map(|m| m.adjoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::kernels::test_support::wavelet;

    fn kernel() -> TimeFrequencyKernel {
        TimeFrequencyKernel::new(10.0, 40.0, 0.1)
    }

    #[test]
    fn test_identical_traces_have_zero_misfit() {
        let trace = wavelet(512, 1.0, 256.0, 20.0, 12.0);
        let window = Window::new(180.0, 330.0).unwrap();
        assert_eq!(kernel().compute_misfit(&trace, &trace, &window).unwrap(), 0.0);
        let adjoint = kernel().compute_adjoint_source(&trace, &trace, &window).unwrap();
        assert!(adjoint.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_phase_shift_is_penalized_and_grows_with_shift() {
        let synthetic = wavelet(512, 1.0, 256.0, 20.0, 12.0);
        let small = wavelet(512, 1.0, 257.0, 20.0, 12.0);
        let large = wavelet(512, 1.0, 259.0, 20.0, 12.0);
        let window = Window::new(180.0, 330.0).unwrap();

        let m_small = kernel().compute_misfit(&small, &synthetic, &window).unwrap();
        let m_large = kernel().compute_misfit(&large, &synthetic, &window).unwrap();
        assert!(m_small > 0.0);
        assert!(m_large > m_small);
    }

    #[test]
    fn test_adjoint_is_zero_outside_window() {
        let synthetic = wavelet(512, 1.0, 256.0, 20.0, 12.0);
        let observed = wavelet(512, 1.0, 258.0, 20.0, 12.0);
        let window = Window::new(200.0, 310.0).unwrap();

        let adjoint = kernel().compute_adjoint_source(&observed, &synthetic, &window).unwrap();
        assert!(adjoint[..200].iter().all(|v| *v == 0.0));
        assert!(adjoint[311..].iter().all(|v| *v == 0.0));
        assert!(adjoint[200..=310].iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_adjoint_matches_finite_difference_gradient() {
        let synthetic = wavelet(256, 1.0, 128.0, 20.0, 12.0);
        let observed = wavelet(256, 1.0, 129.5, 20.0, 12.0);
        let window = Window::new(60.0, 200.0).unwrap();
        let k = kernel();
        let adjoint = k.compute_adjoint_source(&observed, &synthetic, &window).unwrap();

        let epsilon = 1e-6;
        for index in [110usize, 120, 128, 135, 150] {
            let mut plus = synthetic.clone();
            plus.samples[index] += epsilon;
            let mut minus = synthetic.clone();
            minus.samples[index] -= epsilon;
            let numeric = (k.compute_misfit(&observed, &plus, &window).unwrap()
                - k.compute_misfit(&observed, &minus, &window).unwrap())
                / (2.0 * epsilon);
            let analytic = adjoint[index] * synthetic.dt;
            let scale = numeric.abs().max(analytic.abs()).max(1e-12);
            assert!(
                (numeric - analytic).abs() / scale < 1e-3,
                "sample {index}: numeric {numeric}, analytic {analytic}"
            );
        }
    }

    #[test]
    fn test_deterministic() {
        let synthetic = wavelet(300, 1.0, 150.0, 20.0, 10.0);
        let observed = wavelet(300, 1.0, 152.0, 20.0, 10.0);
        let window = Window::new(100.0, 200.0).unwrap();
        let first = kernel().compute_adjoint_source(&observed, &synthetic, &window).unwrap();
        let second = kernel().compute_adjoint_source(&observed, &synthetic, &window).unwrap();
        assert_eq!(first, second);
    }
}
