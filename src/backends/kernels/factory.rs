// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::{CrossCorrelationKernel, TimeFrequencyKernel, WaveformL2Kernel};
use crate::config::MisfitConfig;
use crate::errors::ConfigError;
use crate::traits::MisfitKernel;

/// Factory for misfit kernels selected by name in the configuration.
pub struct KernelFactory;

impl KernelFactory {
    /// Create the kernel named by `config.kernel`.
    ///
    /// - "l2" -> WaveformL2Kernel
    /// - "cross_correlation" -> CrossCorrelationKernel, lags up to `max_period`
    /// - "time_frequency" -> TimeFrequencyKernel over `[min_period, max_period]`
    pub fn create(config: &MisfitConfig) -> Result<Arc<dyn MisfitKernel>, ConfigError> {
        match config.kernel() {
            "l2" => Ok(Arc::new(WaveformL2Kernel::new())),
            "cross_correlation" => Ok(Arc::new(CrossCorrelationKernel::new(config.max_period()))),
            "time_frequency" => Ok(Arc::new(TimeFrequencyKernel::new(
                config.min_period(),
                config.max_period(),
                config.amplitude_threshold(),
            ))),
            other => Err(ConfigError::invalid(
                "misfit.kernel",
                format!("unknown misfit kernel '{}'", other),
            )),
        }
    }

    pub fn list_available_implementations() -> Vec<&'static str> {
        vec!["l2", "cross_correlation", "time_frequency"]
    }

    pub fn is_implementation_available(name: &str) -> bool {
        Self::list_available_implementations().contains(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kernel: &str) -> MisfitConfig {
        MisfitConfig {
            kernel: Some(kernel.to_string()),
            ..MisfitConfig::default()
        }
    }

    #[test]
    fn test_every_listed_kernel_can_be_created() {
        for name in KernelFactory::list_available_implementations() {
            let kernel = KernelFactory::create(&config(name)).unwrap();
            assert_eq!(kernel.name(), name);
        }
    }

    #[test]
    fn test_default_kernel_is_l2() {
        let kernel = KernelFactory::create(&MisfitConfig::default()).unwrap();
        assert_eq!(kernel.name(), "l2");
    }

    #[test]
    fn test_unknown_kernel() {
        assert!(KernelFactory::create(&config("envelope")).is_err());
        assert!(!KernelFactory::is_implementation_available("envelope"));
        assert!(KernelFactory::is_implementation_available("time_frequency"));
    }
}
