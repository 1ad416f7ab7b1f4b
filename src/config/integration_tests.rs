// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use crate::config::{load_and_validate_config, load_config, InversionConfig, RuntimeBuilder};
    use crate::errors::ConfigError;

    /// The shipped YAML configuration loads, validates and builds a runtime.
    #[test]
    fn test_inversion_yaml_loading() {
        let config = load_and_validate_config("configs/inversion.yaml").unwrap();

        assert_eq!(config.misfit.kernel(), "cross_correlation");
        assert_eq!(config.misfit.min_period(), 15.0);
        assert_eq!(config.misfit.max_period(), 50.0);
        assert_eq!(config.preprocessing.min_snr(), 2.5);
        assert_eq!(config.windows.min_cc(), 0.8);
        assert_eq!(config.weights.reference_distance(), 500.0);
        assert_eq!(config.jobs.resources().ranks, 96);
        assert_eq!(config.jobs.backoff().max_attempts, 6);
        assert_eq!(config.executor.max_concurrency(), 8);

        let runtime = RuntimeBuilder::from_config(&config).unwrap();
        assert_eq!(runtime.kernel.name(), "cross_correlation");
        assert_eq!(runtime.executor.max_concurrency(), 8);
    }

    /// TOML is chosen by extension; unset sections fall back to defaults.
    #[test]
    fn test_toml_stage_config_reuses_earlier_iteration() {
        let config = load_and_validate_config("configs/inversion-tf.toml").unwrap();

        assert_eq!(config.misfit.kernel(), "time_frequency");
        assert_eq!(config.misfit.amplitude_threshold(), 0.05);
        assert_eq!(config.windows.reuse_from.as_deref(), Some("it0000"));
        assert_eq!(config.weights.reuse_from.as_deref(), Some("it0000"));
        assert_eq!(config.preprocessing, InversionConfig::default().preprocessing);
    }

    /// Every violation is reported, not just the first.
    #[test]
    fn test_invalid_config_reports_all_violations() {
        assert!(load_config("configs/invalid-band.yaml").is_ok());

        match load_and_validate_config("configs/invalid-band.yaml") {
            Err(ConfigError::Validation(errors)) => {
                let fields: Vec<String> = errors
                    .iter()
                    .filter_map(|e| match e {
                        ConfigError::Invalid { field, .. } => Some(field.clone()),
                        _ => None,
                    })
                    .collect();
                for expected in ["misfit.kernel", "misfit.max_period", "windows.min_cc", "executor.max_concurrency"] {
                    assert!(fields.iter().any(|f| f == expected), "missing {expected} in {fields:?}");
                }
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        assert!(matches!(
            load_config("configs/does-not-exist.yaml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
