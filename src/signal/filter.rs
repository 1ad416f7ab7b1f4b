// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Time-domain conditioning: detrending, tapering, resampling and zero-phase
//! Butterworth band-pass filtering.

use std::f64::consts::PI;

pub fn demean(samples: &mut [f64]) {
    if samples.is_empty() {
        return;
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    samples.iter_mut().for_each(|s| *s -= mean);
}

/// Remove the least-squares straight line through the samples.
pub fn detrend_linear(samples: &mut [f64]) {
    let n = samples.len();
    if n < 2 {
        demean(samples);
        return;
    }
    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = samples.iter().sum::<f64>() / nf;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, y) in samples.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }
    let slope = sxy / sxx;

    for (i, y) in samples.iter_mut().enumerate() {
        *y -= y_mean + slope * (i as f64 - x_mean);
    }
}

/// Tukey (cosine) taper over `fraction` of the trace at each end.
pub fn taper_cosine(samples: &mut [f64], fraction: f64) {
    let n = samples.len();
    let width = ((n as f64) * fraction.clamp(0.0, 0.5)).floor() as usize;
    if width == 0 {
        return;
    }
    for i in 0..width {
        let factor = 0.5 * (1.0 - (PI * i as f64 / width as f64).cos());
        samples[i] *= factor;
        samples[n - 1 - i] *= factor;
    }
}

/// Linear interpolation of `samples` (interval `dt_in`) onto a grid with interval
/// `dt_out` starting at the same first sample and not extending past the last.
pub fn resample_linear(samples: &[f64], dt_in: f64, dt_out: f64) -> Vec<f64> {
    if samples.len() < 2 {
        return samples.to_vec();
    }
    let duration = (samples.len() - 1) as f64 * dt_in;
    let n_out = (duration / dt_out + 1e-9).floor() as usize + 1;

    (0..n_out)
        .map(|i| {
            let position = i as f64 * dt_out / dt_in;
            let left = (position.floor() as usize).min(samples.len() - 2);
            let frac = position - left as f64;
            samples[left] * (1.0 - frac) + samples[left + 1] * frac
        })
        .collect()
}

/// Second-order IIR section (RBJ audio-EQ cookbook), direct form I.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    fn lowpass(corner_hz: f64, sampling_rate: f64) -> Self {
        let (cos_w, alpha) = Self::prewarp(corner_hz, sampling_rate);
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - cos_w) / 2.0 / a0,
            b1: (1.0 - cos_w) / a0,
            b2: (1.0 - cos_w) / 2.0 / a0,
            a1: -2.0 * cos_w / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    fn highpass(corner_hz: f64, sampling_rate: f64) -> Self {
        let (cos_w, alpha) = Self::prewarp(corner_hz, sampling_rate);
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 + cos_w) / 2.0 / a0,
            b1: -(1.0 + cos_w) / a0,
            b2: (1.0 + cos_w) / 2.0 / a0,
            a1: -2.0 * cos_w / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Butterworth sections use Q = 1/sqrt(2).
    fn prewarp(corner_hz: f64, sampling_rate: f64) -> (f64, f64) {
        let w0 = 2.0 * PI * corner_hz / sampling_rate;
        (w0.cos(), w0.sin() / std::f64::consts::SQRT_2)
    }

    fn apply(&self, samples: &mut [f64]) {
        let (mut x1, mut x2, mut y1, mut y2) = (0.0, 0.0, 0.0, 0.0);
        for s in samples.iter_mut() {
            let x0 = *s;
            let y0 = self.b0 * x0 + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
            x2 = x1;
            x1 = x0;
            y2 = y1;
            y1 = y0;
            *s = y0;
        }
    }

    /// Forward then backward pass: zero phase, squared magnitude response.
    fn apply_zero_phase(&self, samples: &mut [f64]) {
        self.apply(samples);
        samples.reverse();
        self.apply(samples);
        samples.reverse();
    }
}

/// Zero-phase band-pass keeping periods between `min_period` and `max_period` seconds.
///
/// The low-pass corner is skipped when it would sit at or above Nyquist.
pub fn bandpass_zero_phase(samples: &mut [f64], dt: f64, min_period: f64, max_period: f64) {
    let sampling_rate = 1.0 / dt;
    let nyquist = sampling_rate / 2.0;

    Biquad::highpass(1.0 / max_period, sampling_rate).apply_zero_phase(samples);

    let high_corner = 1.0 / min_period;
    if high_corner < nyquist {
        Biquad::lowpass(high_corner, sampling_rate).apply_zero_phase(samples);
    }
}

/// Central-difference time derivative, one-sided at both ends.
pub fn derivative(samples: &[f64], dt: f64) -> Vec<f64> {
    let n = samples.len();
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| match i {
            0 => (samples[1] - samples[0]) / dt,
            i if i == n - 1 => (samples[n - 1] - samples[n - 2]) / dt,
            i => (samples[i + 1] - samples[i - 1]) / (2.0 * dt),
        })
        .collect()
}

pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64).sqrt()
}
