// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! FFT-based helpers: analytic-signal envelope and a Gaussian short-time Fourier
//! transform.

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

pub fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Magnitude of the analytic signal (Hilbert envelope).
pub fn envelope(samples: &[f64]) -> Vec<f64> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut buffer: Vec<Complex64> = samples.iter().map(|&s| Complex64::new(s, 0.0)).collect();
    forward.process(&mut buffer);

    // Keep DC (and Nyquist for even n), double positive frequencies, drop negative ones.
    let half = n / 2;
    for (k, value) in buffer.iter_mut().enumerate() {
        let gain = if k == 0 || (n % 2 == 0 && k == half) {
            1.0
        } else if k < (n + 1) / 2 {
            2.0
        } else {
            0.0
        };
        *value *= gain;
    }

    inverse.process(&mut buffer);
    buffer.iter().map(|c| c.norm() / n as f64).collect()
}

/// `h(m) = exp(-((m - len/2) / sigma)² / 2)` for `m` in `0..len`.
pub fn gaussian_window(len: usize, sigma: f64) -> Vec<f64> {
    let center = len as f64 / 2.0;
    (0..len)
        .map(|m| (-((m as f64 - center) / sigma).powi(2) / 2.0).exp())
        .collect()
}

/// Gaussian-windowed short-time Fourier transform with a fixed frame length and hop.
///
/// Frame `j` covers samples `start(j) .. start(j) + frame_len`, where
/// `start(j) = j * hop - frame_len / 2`; samples outside the signal read as zero.
pub struct Stft {
    frame_len: usize,
    hop: usize,
    window: Vec<f64>,
    fft: Arc<dyn Fft<f64>>,
}

impl Stft {
    /// Frame length rounded up to a power of two; hop is a quarter frame and the
    /// window width `frame_len / 6`.
    pub fn new(frame_len: usize) -> Self {
        let frame_len = next_power_of_two(frame_len.max(4));
        let window = gaussian_window(frame_len, frame_len as f64 / 6.0);
        let fft = FftPlanner::<f64>::new().plan_fft_forward(frame_len);
        Self {
            frame_len,
            hop: (frame_len / 4).max(1),
            window,
            fft,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn window(&self) -> &[f64] {
        &self.window
    }

    /// First-sample offsets of the frames needed for a signal of `n` samples.
    pub fn frame_starts(&self, n: usize) -> Vec<isize> {
        let half = (self.frame_len / 2) as isize;
        let mut starts = Vec::new();
        let mut start = -half;
        while start + half < n as isize + self.hop as isize {
            starts.push(start);
            start += self.hop as isize;
        }
        starts
    }

    /// Spectrum of every frame, indexed `[frame][bin]`.
    pub fn analyze(&self, samples: &[f64]) -> Vec<Vec<Complex64>> {
        self.frame_starts(samples.len())
            .into_iter()
            .map(|start| {
                let mut frame: Vec<Complex64> = (0..self.frame_len)
                    .map(|m| {
                        let index = start + m as isize;
                        let value = usize::try_from(index)
                            .ok()
                            .and_then(|i| samples.get(i))
                            .copied()
                            .unwrap_or(0.0);
                        Complex64::new(value * self.window[m], 0.0)
                    })
                    .collect();
                self.fft.process(&mut frame);
                frame
            })
            .collect()
    }

    /// In-place forward FFT of a buffer of `frame_len` values.
    pub fn forward(&self, buffer: &mut [Complex64]) {
        self.fft.process(buffer);
    }
}
