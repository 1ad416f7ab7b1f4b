// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::window_samples;
use crate::errors::MisfitError;
use crate::model::{Trace, Window};
use crate::traits::MisfitKernel;

/// Waveform difference: `½ Σ (s − o)² dt` over the window, adjoint source `s − o`.
pub struct WaveformL2Kernel;

impl WaveformL2Kernel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WaveformL2Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl MisfitKernel for WaveformL2Kernel {
    fn name(&self) -> &'static str {
        "l2"
    }

    fn compute_misfit(&self, observed: &Trace, synthetic: &Trace, window: &Window) -> Result<f64, MisfitError> {
        let range = window_samples(self.name(), synthetic, window, 1)?;
        let sum: f64 = range
            .map(|i| {
                let residual = synthetic.samples[i] - observed.samples[i];
                residual * residual
            })
            .sum();
        Ok(0.5 * sum * synthetic.dt)
    }

    fn compute_adjoint_source(
        &self,
        observed: &Trace,
        synthetic: &Trace,
        window: &Window,
    ) -> Result<Vec<f64>, MisfitError> {
        let range = window_samples(self.name(), synthetic, window, 1)?;
        let mut adjoint = vec![0.0; synthetic.len()];
        for i in range {
            adjoint[i] = synthetic.samples[i] - observed.samples[i];
        }
        Ok(adjoint)
    }
}
