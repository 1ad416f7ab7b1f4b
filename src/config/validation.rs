// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! Validation collects every violation instead of stopping at the first one, so
//! a user fixing a configuration sees all problems in one pass. Checks run per
//! section in a fixed order, which keeps error lists stable for tests.
//!
//! ```rust
//! use fwi_orchestrator::config::{validate_config, InversionConfig};
//!
//! let mut config = InversionConfig::default();
//! config.misfit.min_period = Some(50.0);
//! config.misfit.max_period = Some(20.0);
//!
//! let errors = validate_config(&config).unwrap_err();
//! assert_eq!(errors.len(), 1);
//! ```

use crate::backends::kernels::KernelFactory;
use crate::config::InversionConfig;
use crate::errors::ConfigError;
use crate::observability::messages::config::ConfigValidationFailed;
use crate::observability::messages::StructuredLog;

fn check(errors: &mut Vec<ConfigError>, ok: bool, field: &str, reason: impl FnOnce() -> String) {
    if !ok {
        errors.push(ConfigError::invalid(field, reason()));
    }
}

fn positive(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    check(errors, value.is_finite() && value > 0.0, field, || {
        format!("must be positive and finite, got {value}")
    });
}

fn non_negative(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    check(errors, value.is_finite() && value >= 0.0, field, || {
        format!("must be non-negative and finite, got {value}")
    });
}

fn in_range(errors: &mut Vec<ConfigError>, field: &str, value: f64, low: f64, high: f64) {
    check(errors, value >= low && value <= high, field, || {
        format!("must lie in [{low}, {high}], got {value}")
    });
}

fn iteration_reference(errors: &mut Vec<ConfigError>, field: &str, value: Option<&str>) {
    if let Some(name) = value {
        check(errors, !name.trim().is_empty(), field, || "must name an iteration".to_string());
    }
}

/// Validate an inversion configuration.
///
/// # Returns
/// * `Ok(())` if every constraint holds
/// * `Err(Vec<ConfigError>)` with one entry per violated constraint
pub fn validate_config(config: &InversionConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let misfit = &config.misfit;
    check(
        &mut errors,
        KernelFactory::is_implementation_available(misfit.kernel()),
        "misfit.kernel",
        || {
            format!(
                "unknown kernel '{}' (available: {})",
                misfit.kernel(),
                KernelFactory::list_available_implementations().join(", ")
            )
        },
    );
    positive(&mut errors, "misfit.min_period", misfit.min_period());
    positive(&mut errors, "misfit.max_period", misfit.max_period());
    check(
        &mut errors,
        misfit.max_period() > misfit.min_period(),
        "misfit.max_period",
        || {
            format!(
                "must exceed misfit.min_period ({} <= {})",
                misfit.max_period(),
                misfit.min_period()
            )
        },
    );
    in_range(&mut errors, "misfit.amplitude_threshold", misfit.amplitude_threshold(), 0.0, 1.0);

    let pre = &config.preprocessing;
    positive(&mut errors, "preprocessing.sampling_rate", pre.sampling_rate());
    in_range(
        &mut errors,
        "preprocessing.sample_rate_tolerance",
        pre.sample_rate_tolerance(),
        0.0,
        0.5,
    );
    in_range(&mut errors, "preprocessing.taper_fraction", pre.taper_fraction(), 0.0, 0.5);
    non_negative(&mut errors, "preprocessing.min_snr", pre.min_snr());
    positive(&mut errors, "preprocessing.max_velocity", pre.max_velocity());
    non_negative(&mut errors, "preprocessing.noise_margin", pre.noise_margin());
    if pre.bandpass() && pre.sampling_rate() > 0.0 && misfit.max_period() > 0.0 {
        let nyquist = pre.sampling_rate() / 2.0;
        check(
            &mut errors,
            1.0 / misfit.max_period() < nyquist,
            "misfit.max_period",
            || format!("band-pass corner 1/{} Hz is above Nyquist ({} Hz)", misfit.max_period(), nyquist),
        );
    }

    let windows = &config.windows;
    check(
        &mut errors,
        windows.envelope_threshold() > 0.0 && windows.envelope_threshold() < 1.0,
        "windows.envelope_threshold",
        || format!("must lie in (0, 1), got {}", windows.envelope_threshold()),
    );
    non_negative(&mut errors, "windows.margin", windows.margin());
    check(
        &mut errors,
        windows.max_lag_fraction() > 0.0 && windows.max_lag_fraction() <= 1.0,
        "windows.max_lag_fraction",
        || format!("must lie in (0, 1], got {}", windows.max_lag_fraction()),
    );
    in_range(&mut errors, "windows.min_cc", windows.min_cc(), -1.0, 1.0);
    non_negative(&mut errors, "windows.min_snr", windows.min_snr());
    non_negative(&mut errors, "windows.merge_gap", windows.merge_gap());
    non_negative(&mut errors, "windows.min_length", windows.min_length());
    iteration_reference(&mut errors, "windows.reuse_from", windows.reuse_from.as_deref());

    positive(
        &mut errors,
        "weights.reference_distance",
        config.weights.reference_distance(),
    );
    iteration_reference(&mut errors, "weights.reuse_from", config.weights.reuse_from.as_deref());

    let jobs = &config.jobs;
    let resources = jobs.resources();
    let backoff = jobs.backoff();
    let tracker = jobs.tracker_settings();
    check(&mut errors, resources.ranks >= 1, "jobs.ranks", || "must be at least 1".to_string());
    check(&mut errors, !resources.wall_time.is_zero(), "jobs.wall_time_seconds", || {
        "must be positive".to_string()
    });
    check(&mut errors, !tracker.poll_interval.is_zero(), "jobs.poll_interval_ms", || {
        "must be positive".to_string()
    });
    check(&mut errors, !tracker.wait_timeout.is_zero(), "jobs.wait_timeout_seconds", || {
        "must be positive".to_string()
    });
    check(
        &mut errors,
        backoff.initial_delay <= backoff.max_delay,
        "jobs.retry_initial_delay_ms",
        || "must not exceed jobs.retry_max_delay_ms".to_string(),
    );
    check(
        &mut errors,
        backoff.multiplier.is_finite() && backoff.multiplier >= 1.0,
        "jobs.retry_multiplier",
        || format!("must be at least 1.0, got {}", backoff.multiplier),
    );
    check(&mut errors, backoff.max_attempts >= 1, "jobs.retry_max_attempts", || {
        "must be at least 1".to_string()
    });
    check(&mut errors, !backoff.timeout.is_zero(), "jobs.retry_timeout_seconds", || {
        "must be positive".to_string()
    });

    check(
        &mut errors,
        config.executor.max_concurrency() >= 1,
        "executor.max_concurrency",
        || "must be at least 1".to_string(),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        ConfigValidationFailed {
            error_count: errors.len(),
        }
        .log();
        Err(errors)
    }
}
