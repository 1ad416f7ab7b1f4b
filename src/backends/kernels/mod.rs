// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Misfit kernel implementations and the factory that builds them from
//! configuration.

use std::ops::RangeInclusive;

use crate::errors::MisfitError;
use crate::model::{Trace, Window};

pub mod cross_correlation;
pub mod factory;
pub mod l2;
pub mod time_frequency;

pub use cross_correlation::CrossCorrelationKernel;
pub use factory::KernelFactory;
pub use l2::WaveformL2Kernel;
pub use time_frequency::TimeFrequencyKernel;

/// Sample range of `window` on `trace`, requiring at least `min_samples` samples.
pub(crate) fn window_samples(
    kernel: &'static str,
    trace: &Trace,
    window: &Window,
    min_samples: usize,
) -> Result<RangeInclusive<usize>, MisfitError> {
    window
        .sample_range(trace.dt, trace.len())
        .filter(|range| range.end() - range.start() + 1 >= min_samples)
        .ok_or(MisfitError::WindowTooShort {
            kernel,
            start: window.start,
            end: window.end,
        })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::model::Trace;
    use std::f64::consts::PI;

    /// Gaussian-modulated cosine centred on `center` seconds.
    pub fn wavelet(n: usize, dt: f64, center: f64, period: f64, width: f64) -> Trace {
        let samples = (0..n)
            .map(|i| {
                let t = i as f64 * dt - center;
                (-(t / width).powi(2) / 2.0).exp() * (2.0 * PI * t / period).cos()
            })
            .collect();
        Trace::new(dt, 0.0, samples)
    }
}
