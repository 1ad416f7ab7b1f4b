// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::MisfitError;
use crate::model::{Trace, Window};

/// A misfit functional between an observed and a synthetic trace over one window.
///
/// Callers guarantee both traces share a sample grid and that the window lies
/// inside them; [`crate::processing::MisfitEngine`] checks this before dispatching.
/// Implementations must be deterministic and must return an adjoint source with
/// the input's length that is exactly zero outside the window.
pub trait MisfitKernel: Send + Sync {
    fn name(&self) -> &'static str;

    fn compute_misfit(&self, observed: &Trace, synthetic: &Trace, window: &Window) -> Result<f64, MisfitError>;

    fn compute_adjoint_source(
        &self,
        observed: &Trace,
        synthetic: &Trace,
        window: &Window,
    ) -> Result<Vec<f64>, MisfitError>;

    /// Raw kernel measurement, for kernels that have one.
    fn measurement(&self, _observed: &Trace, _synthetic: &Trace, _window: &Window) -> Result<Option<f64>, MisfitError> {
        Ok(None)
    }

    /// Misfit, adjoint source and measurement of one window in a single call.
    /// Kernels that derive all three from one intermediate quantity override this
    /// to compute it once.
    fn measure_window(&self, observed: &Trace, synthetic: &Trace, window: &Window) -> Result<KernelOutput, MisfitError> {
        Ok(KernelOutput {
            misfit: self.compute_misfit(observed, synthetic, window)?,
            adjoint: self.compute_adjoint_source(observed, synthetic, window)?,
            measurement: self.measurement(observed, synthetic, window)?,
        })
    }
}

/// Everything a kernel produces for one window.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelOutput {
    pub misfit: f64,
    pub adjoint: Vec<f64>,
    pub measurement: Option<f64>,
}
