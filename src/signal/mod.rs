// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Numerical building blocks shared by preprocessing, window selection and the
//! misfit kernels.

pub mod correlation;
pub mod filter;
pub mod spectral;

pub use correlation::{cross_correlation_lag, CorrelationPeak};
pub use spectral::{envelope, next_power_of_two, Stft};
