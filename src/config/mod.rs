// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod runtime;
mod validation;

#[cfg(test)]
mod integration_tests;
pub mod consts;

pub use loader::{
    load_and_validate_config, load_config, ExecutorOptions, InversionConfig, JobConfig, MisfitConfig,
    PreprocessingConfig, WeightConfig, WindowConfig,
};
pub use runtime::{MeasurementRuntime, RuntimeBuilder};
pub use validation::validate_config;
