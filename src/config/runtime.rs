// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::backends::kernels::KernelFactory;
use crate::config::InversionConfig;
use crate::engine::MeasurementExecutor;
use crate::errors::ConfigError;
use crate::jobs::{JobResources, TrackerSettings};
use crate::processing::{Preprocessor, StationWeightCalculator, WindowSelector};
use crate::traits::MisfitKernel;

/// Processing stages and executor built from one validated configuration.
pub struct MeasurementRuntime {
    pub kernel: Arc<dyn MisfitKernel>,
    pub executor: MeasurementExecutor,
    pub preprocessor: Preprocessor,
    pub selector: WindowSelector,
    pub weights: StationWeightCalculator,
    pub tracker_settings: TrackerSettings,
    pub resources: JobResources,
}

/// Builds the measurement runtime from configuration.
///
/// # Examples
///
/// ```
/// use fwi_orchestrator::config::{InversionConfig, RuntimeBuilder};
///
/// let runtime = RuntimeBuilder::from_config(&InversionConfig::default())?;
/// assert_eq!(runtime.kernel.name(), "l2");
/// assert_eq!(runtime.executor.max_concurrency(), 4);
/// # Ok::<(), fwi_orchestrator::errors::ConfigError>(())
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// The window selector's dominant period is the long end of the misfit band.
    pub fn from_config(cfg: &InversionConfig) -> Result<MeasurementRuntime, ConfigError> {
        Ok(MeasurementRuntime {
            kernel: KernelFactory::create(&cfg.misfit)?,
            executor: MeasurementExecutor::new(cfg.executor.max_concurrency()),
            preprocessor: Preprocessor::new(&cfg.preprocessing, &cfg.misfit),
            selector: WindowSelector::new(&cfg.windows, cfg.misfit.max_period()),
            weights: StationWeightCalculator::new(&cfg.weights),
            tracker_settings: cfg.jobs.tracker_settings(),
            resources: cfg.jobs.resources(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MisfitConfig;

    #[test]
    fn test_unknown_kernel_fails_to_build() {
        let cfg = InversionConfig {
            misfit: MisfitConfig {
                kernel: Some("envelope".to_string()),
                ..MisfitConfig::default()
            },
            ..InversionConfig::default()
        };
        assert!(RuntimeBuilder::from_config(&cfg).is_err());
    }

    #[test]
    fn test_job_settings_follow_configuration() {
        let cfg = InversionConfig::from_key_values([("jobs.ranks", "64"), ("jobs.poll_interval_ms", "250")]).unwrap();
        let runtime = RuntimeBuilder::from_config(&cfg).unwrap();
        assert_eq!(runtime.resources.ranks, 64);
        assert_eq!(runtime.tracker_settings.poll_interval.as_millis(), 250);
    }
}
