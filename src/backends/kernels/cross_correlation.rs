// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Cross-correlation traveltime kernel.
//!
//! The measurement is the time shift `τ` that best aligns the synthetic with the
//! observation inside the window, with `o(t) ≈ s(t − τ)`, so a positive `τ`
//! means the observation arrives late. It yields one scalar per window and
//! therefore carries far less information than the waveform difference.
//!
//! The misfit is `½ τ²` and the adjoint source `τ ṡ(t) / Σ ṡ² dt` over the
//! window samples.

use super::window_samples;
use crate::errors::MisfitError;
use crate::model::{Trace, Window};
use crate::signal::{cross_correlation_lag, filter::derivative};
use crate::traits::{KernelOutput, MisfitKernel};

pub struct CrossCorrelationKernel {
    /// Lags are searched up to this many seconds in either direction.
    max_shift: f64,
}

impl CrossCorrelationKernel {
    pub fn new(max_shift: f64) -> Self {
        Self { max_shift }
    }

    /// Time shift in seconds; zero when either windowed signal has no energy.
    pub fn time_shift(&self, observed: &Trace, synthetic: &Trace, window: &Window) -> Result<f64, MisfitError> {
        let range = window_samples(self.name(), synthetic, window, 3)?;
        let obs = &observed.samples[range.clone()];
        let syn = &synthetic.samples[range];
        let max_lag = (self.max_shift / synthetic.dt).floor().max(1.0) as usize;

        Ok(cross_correlation_lag(obs, syn, max_lag)
            .map(|peak| peak.lag_samples * synthetic.dt)
            .unwrap_or(0.0))
    }

    fn adjoint_for_shift(&self, tau: f64, synthetic: &Trace, window: &Window) -> Result<Vec<f64>, MisfitError> {
        let range = window_samples(self.name(), synthetic, window, 3)?;
        let velocity = derivative(&synthetic.samples, synthetic.dt);

        let mut adjoint = vec![0.0; synthetic.len()];
        let norm: f64 = range.clone().map(|i| velocity[i] * velocity[i]).sum::<f64>() * synthetic.dt;
        if norm <= 0.0 || tau == 0.0 {
            return Ok(adjoint);
        }
        for i in range {
            adjoint[i] = tau * velocity[i] / norm;
        }
        Ok(adjoint)
    }
}

impl MisfitKernel for CrossCorrelationKernel {
    fn name(&self) -> &'static str {
        "cross_correlation"
    }

    fn compute_misfit(&self, observed: &Trace, synthetic: &Trace, window: &Window) -> Result<f64, MisfitError> {
        let tau = self.time_shift(observed, synthetic, window)?;
        Ok(0.5 * tau * tau)
    }

    fn compute_adjoint_source(
        &self,
        observed: &Trace,
        synthetic: &Trace,
        window: &Window,
    ) -> Result<Vec<f64>, MisfitError> {
        let tau = self.time_shift(observed, synthetic, window)?;
        self.adjoint_for_shift(tau, synthetic, window)
    }

    fn measurement(&self, observed: &Trace, synthetic: &Trace, window: &Window) -> Result<Option<f64>, MisfitError> {
        self.time_shift(observed, synthetic, window).map(Some)
    }

    fn measure_window(&self, observed: &Trace, synthetic: &Trace, window: &Window) -> Result<KernelOutput, MisfitError> {
        let tau = self.time_shift(observed, synthetic, window)?;
        Ok(KernelOutput {
            misfit: 0.5 * tau * tau,
            adjoint: self.adjoint_for_shift(tau, synthetic, window)?,
            measurement: Some(tau),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::kernels::test_support::wavelet;

    fn kernel() -> CrossCorrelationKernel {
        CrossCorrelationKernel::new(20.0)
    }

    #[test]
    fn test_delayed_observation_gives_positive_shift() {
        let synthetic = wavelet(600, 0.5, 150.0, 20.0, 8.0);
        let observed = wavelet(600, 0.5, 153.0, 20.0, 8.0);
        let window = Window::new(110.0, 190.0).unwrap();

        let tau = kernel().time_shift(&observed, &synthetic, &window).unwrap();
        assert!((tau - 3.0).abs() < 0.1, "tau {tau}");

        let misfit = kernel().compute_misfit(&observed, &synthetic, &window).unwrap();
        assert!((misfit - 0.5 * tau * tau).abs() < 1e-12);
        assert_eq!(
            kernel().measurement(&observed, &synthetic, &window).unwrap(),
            Some(tau)
        );
    }

    #[test]
    fn test_identical_traces_have_zero_misfit_and_adjoint() {
        let trace = wavelet(400, 1.0, 200.0, 20.0, 8.0);
        let window = Window::new(150.0, 250.0).unwrap();
        assert_eq!(kernel().compute_misfit(&trace, &trace, &window).unwrap(), 0.0);
        let adjoint = kernel().compute_adjoint_source(&trace, &trace, &window).unwrap();
        assert!(adjoint.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_adjoint_is_confined_to_window() {
        let synthetic = wavelet(400, 1.0, 200.0, 20.0, 8.0);
        let observed = wavelet(400, 1.0, 197.0, 20.0, 8.0);
        let window = Window::new(160.0, 240.0).unwrap();

        let adjoint = kernel().compute_adjoint_source(&observed, &synthetic, &window).unwrap();
        assert!(adjoint[..160].iter().all(|v| *v == 0.0));
        assert!(adjoint[241..].iter().all(|v| *v == 0.0));
        assert!(adjoint[160..=240].iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_single_pass_matches_separate_calls() {
        let synthetic = wavelet(400, 1.0, 200.0, 20.0, 8.0);
        let observed = wavelet(400, 1.0, 203.5, 20.0, 8.0);
        let window = Window::new(150.0, 250.0).unwrap();
        let k = kernel();

        let output = k.measure_window(&observed, &synthetic, &window).unwrap();
        assert_eq!(output.misfit, k.compute_misfit(&observed, &synthetic, &window).unwrap());
        assert_eq!(output.adjoint, k.compute_adjoint_source(&observed, &synthetic, &window).unwrap());
        assert_eq!(output.measurement, k.measurement(&observed, &synthetic, &window).unwrap());
    }

    #[test]
    fn test_silent_synthetic_measures_no_shift() {
        let observed = wavelet(100, 1.0, 50.0, 20.0, 8.0);
        let synthetic = Trace::new(1.0, 0.0, vec![0.0; 100]);
        let window = Window::new(20.0, 80.0).unwrap();
        assert_eq!(kernel().time_shift(&observed, &synthetic, &window).unwrap(), 0.0);
    }
}
