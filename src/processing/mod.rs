// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-trace processing stages: preprocessing, window selection, misfit
//! measurement and station weighting.

pub mod misfit;
pub mod preprocess;
pub mod weights;
pub mod windows;

pub use misfit::MisfitEngine;
pub use preprocess::Preprocessor;
pub use weights::StationWeightCalculator;
pub use windows::WindowSelector;
