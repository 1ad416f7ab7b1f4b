// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::MisfitError;
use crate::model::{validate_windows, MisfitMeasurement, Trace, Window};
use crate::traits::{KernelOutput, MisfitKernel};

/// Runs a misfit kernel on one window after checking its preconditions.
pub struct MisfitEngine;

impl MisfitEngine {
    /// Measure `window` with `kernel`. Both traces must share a sample grid and the
    /// window must lie inside them. The returned adjoint source is on the
    /// synthetic's grid and exactly zero outside the window.
    pub fn measure(
        kernel: &dyn MisfitKernel,
        observed: &Trace,
        synthetic: &Trace,
        window: &Window,
    ) -> Result<MisfitMeasurement, MisfitError> {
        if !observed.same_grid(synthetic) {
            return Err(MisfitError::IncompatibleTraces(format!(
                "observed (dt {}, start {}, {} samples) vs synthetic (dt {}, start {}, {} samples)",
                observed.dt,
                observed.start,
                observed.len(),
                synthetic.dt,
                synthetic.start,
                synthetic.len()
            )));
        }
        validate_windows(std::slice::from_ref(window), synthetic.duration())?;

        let KernelOutput {
            misfit,
            adjoint: mut samples,
            measurement,
        } = kernel.measure_window(observed, synthetic, window)?;
        if samples.len() != synthetic.len() {
            return Err(MisfitError::IncompatibleTraces(format!(
                "{} kernel returned {} adjoint samples for a {} sample trace",
                kernel.name(),
                samples.len(),
                synthetic.len()
            )));
        }
        for (i, value) in samples.iter_mut().enumerate() {
            if !window.contains_sample(i, synthetic.dt) {
                *value = 0.0;
            }
        }

        let mut adjoint_source = synthetic.zeros_like();
        adjoint_source.samples = samples;
        adjoint_source.metadata.processing.push(format!("adjoint:{}", kernel.name()));

        Ok(MisfitMeasurement {
            misfit,
            measurement,
            adjoint_source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::kernels::test_support::wavelet;
    use crate::backends::kernels::{CrossCorrelationKernel, WaveformL2Kernel};
    use crate::errors::WindowError;

    #[test]
    fn test_l2_adjoint_is_residual_inside_and_zero_outside() {
        let synthetic = wavelet(200, 0.5, 50.0, 10.0, 5.0);
        let observed = wavelet(200, 0.5, 51.0, 10.0, 5.0);
        let window = Window::new(40.0, 60.0).unwrap();

        let result = MisfitEngine::measure(&WaveformL2Kernel::new(), &observed, &synthetic, &window).unwrap();
        let adjoint = &result.adjoint_source;
        assert!(adjoint.same_grid(&synthetic));
        for i in 0..200 {
            if (80..=120).contains(&i) {
                assert_eq!(adjoint.samples[i], synthetic.samples[i] - observed.samples[i]);
            } else {
                assert_eq!(adjoint.samples[i], 0.0);
            }
        }
        assert!(result.misfit > 0.0);
        assert_eq!(result.measurement, None);
    }

    #[test]
    fn test_cross_correlation_reports_time_shift() {
        let synthetic = wavelet(400, 1.0, 200.0, 20.0, 8.0);
        let observed = wavelet(400, 1.0, 202.0, 20.0, 8.0);
        let window = Window::new(160.0, 240.0).unwrap();

        let result = MisfitEngine::measure(&CrossCorrelationKernel::new(40.0), &observed, &synthetic, &window).unwrap();
        let tau = result.measurement.unwrap();
        assert!((tau - 2.0).abs() < 0.1);
        assert!((result.misfit - 0.5 * tau * tau).abs() < 1e-12);
    }

    /// Answers only through the single-pass entry point.
    struct SinglePassKernel;

    impl MisfitKernel for SinglePassKernel {
        fn name(&self) -> &'static str {
            "single_pass"
        }

        fn compute_misfit(&self, _: &Trace, _: &Trace, _: &Window) -> Result<f64, MisfitError> {
            Err(MisfitError::IncompatibleTraces("misfit computed separately".to_string()))
        }

        fn compute_adjoint_source(&self, _: &Trace, _: &Trace, _: &Window) -> Result<Vec<f64>, MisfitError> {
            Err(MisfitError::IncompatibleTraces("adjoint computed separately".to_string()))
        }

        fn measure_window(&self, _: &Trace, synthetic: &Trace, _: &Window) -> Result<KernelOutput, MisfitError> {
            Ok(KernelOutput {
                misfit: 1.5,
                adjoint: vec![1.0; synthetic.len()],
                measurement: Some(0.25),
            })
        }
    }

    #[test]
    fn test_engine_measures_each_window_in_one_kernel_call() {
        let trace = wavelet(100, 1.0, 50.0, 20.0, 8.0);
        let window = Window::new(40.0, 60.0).unwrap();

        let result = MisfitEngine::measure(&SinglePassKernel, &trace, &trace, &window).unwrap();
        assert_eq!(result.misfit, 1.5);
        assert_eq!(result.measurement, Some(0.25));
        assert_eq!(result.adjoint_source.samples.iter().filter(|s| **s == 1.0).count(), 21);
    }

    #[test]
    fn test_window_outside_trace_is_refused() {
        let trace = wavelet(100, 1.0, 50.0, 20.0, 8.0);
        let window = Window::new(50.0, 150.0).unwrap();
        assert!(matches!(
            MisfitEngine::measure(&WaveformL2Kernel::new(), &trace, &trace, &window),
            Err(MisfitError::InvalidWindow(WindowError::OutOfBounds { .. }))
        ));
    }

    #[test]
    fn test_mismatched_grids_are_refused() {
        let synthetic = wavelet(100, 1.0, 50.0, 20.0, 8.0);
        let observed = wavelet(99, 1.0, 50.0, 20.0, 8.0);
        let window = Window::new(10.0, 60.0).unwrap();
        assert!(matches!(
            MisfitEngine::measure(&WaveformL2Kernel::new(), &observed, &synthetic, &window),
            Err(MisfitError::IncompatibleTraces(_))
        ));
    }
}
