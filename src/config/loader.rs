// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::*;
use crate::errors::ConfigError;
use crate::jobs::{BackoffPolicy, JobResources, TrackerSettings};
use crate::observability::messages::config::ConfigLoaded;
use crate::observability::messages::StructuredLog;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Complete configuration of an inversion project.
///
/// Every section is optional; unset fields fall back to the defaults in
/// [`crate::config::consts`].
///
/// # Example
/// ```yaml
/// misfit:
///   kernel: cross_correlation
///   min_period: 15.0
///   max_period: 50.0
/// preprocessing:
///   sampling_rate: 1.0
///   min_snr: 2.5
/// windows:
///   min_cc: 0.8
///   reuse_from: it0000
/// jobs:
///   ranks: 96
///   wall_time_seconds: 7200
/// executor:
///   max_concurrency: 8
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InversionConfig {
    #[serde(default)]
    pub misfit: MisfitConfig,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub windows: WindowConfig,
    #[serde(default)]
    pub weights: WeightConfig,
    #[serde(default)]
    pub jobs: JobConfig,
    #[serde(default)]
    pub executor: ExecutorOptions,
}

/// Misfit kernel selection and measurement band.
///
/// # Fields
/// * `kernel` - Kernel name as known to the kernel factory (`l2`, `cross_correlation`, `time_frequency`)
/// * `min_period` / `max_period` - Measurement band in seconds
/// * `amplitude_threshold` - Time-frequency cells below this normalized amplitude are ignored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MisfitConfig {
    pub kernel: Option<String>,
    pub min_period: Option<f64>,
    pub max_period: Option<f64>,
    pub amplitude_threshold: Option<f64>,
}

impl MisfitConfig {
    pub fn kernel(&self) -> &str {
        self.kernel.as_deref().unwrap_or(DEFAULT_KERNEL)
    }

    pub fn min_period(&self) -> f64 {
        self.min_period.unwrap_or(DEFAULT_MIN_PERIOD_S)
    }

    pub fn max_period(&self) -> f64 {
        self.max_period.unwrap_or(DEFAULT_MAX_PERIOD_S)
    }

    pub fn amplitude_threshold(&self) -> f64 {
        self.amplitude_threshold.unwrap_or(DEFAULT_TF_AMPLITUDE_THRESHOLD)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreprocessingConfig {
    /// Target sampling rate, Hz.
    pub sampling_rate: Option<f64>,
    /// Relative tolerance on the observed sampling rate.
    pub sample_rate_tolerance: Option<f64>,
    pub taper_fraction: Option<f64>,
    /// Apply the zero-phase band-pass over the misfit band.
    pub bandpass: Option<bool>,
    pub min_snr: Option<f64>,
    /// km/s
    pub max_velocity: Option<f64>,
    /// seconds
    pub noise_margin: Option<f64>,
}

impl PreprocessingConfig {
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate.unwrap_or(DEFAULT_SAMPLING_RATE_HZ)
    }

    pub fn sample_rate_tolerance(&self) -> f64 {
        self.sample_rate_tolerance.unwrap_or(DEFAULT_SAMPLE_RATE_TOLERANCE)
    }

    pub fn taper_fraction(&self) -> f64 {
        self.taper_fraction.unwrap_or(DEFAULT_TAPER_FRACTION)
    }

    pub fn bandpass(&self) -> bool {
        self.bandpass.unwrap_or(DEFAULT_BANDPASS)
    }

    pub fn min_snr(&self) -> f64 {
        self.min_snr.unwrap_or(DEFAULT_PREPROCESS_MIN_SNR)
    }

    pub fn max_velocity(&self) -> f64 {
        self.max_velocity.unwrap_or(DEFAULT_MAX_VELOCITY_KM_S)
    }

    pub fn noise_margin(&self) -> f64 {
        self.noise_margin.unwrap_or(DEFAULT_NOISE_MARGIN_S)
    }
}

/// Window selection thresholds. Times are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowConfig {
    pub envelope_threshold: Option<f64>,
    pub margin: Option<f64>,
    pub max_lag_fraction: Option<f64>,
    pub min_cc: Option<f64>,
    pub min_snr: Option<f64>,
    pub merge_gap: Option<f64>,
    pub min_length: Option<f64>,
    /// Reuse the window set of this iteration instead of selecting windows.
    pub reuse_from: Option<String>,
}

impl WindowConfig {
    pub fn envelope_threshold(&self) -> f64 {
        self.envelope_threshold.unwrap_or(DEFAULT_ENVELOPE_THRESHOLD)
    }

    pub fn margin(&self) -> f64 {
        self.margin.unwrap_or(DEFAULT_WINDOW_MARGIN_S)
    }

    pub fn max_lag_fraction(&self) -> f64 {
        self.max_lag_fraction.unwrap_or(DEFAULT_MAX_LAG_FRACTION)
    }

    pub fn min_cc(&self) -> f64 {
        self.min_cc.unwrap_or(DEFAULT_MIN_CC)
    }

    pub fn min_snr(&self) -> f64 {
        self.min_snr.unwrap_or(DEFAULT_WINDOW_MIN_SNR)
    }

    pub fn merge_gap(&self) -> f64 {
        self.merge_gap.unwrap_or(DEFAULT_MERGE_GAP_S)
    }

    pub fn min_length(&self) -> f64 {
        self.min_length.unwrap_or(DEFAULT_MIN_WINDOW_LENGTH_S)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightConfig {
    /// km
    pub reference_distance: Option<f64>,
    /// Reuse the weight set of this iteration instead of computing weights.
    pub reuse_from: Option<String>,
}

impl WeightConfig {
    pub fn reference_distance(&self) -> f64 {
        self.reference_distance.unwrap_or(DEFAULT_REFERENCE_DISTANCE_KM)
    }
}

/// Simulation job resources and the polling/retry schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub ranks: Option<u32>,
    pub wall_time_seconds: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub wait_timeout_seconds: Option<u64>,
    pub retry_initial_delay_ms: Option<u64>,
    pub retry_max_delay_ms: Option<u64>,
    pub retry_multiplier: Option<f64>,
    pub retry_max_attempts: Option<u32>,
    pub retry_timeout_seconds: Option<u64>,
}

impl JobConfig {
    pub fn resources(&self) -> JobResources {
        JobResources {
            ranks: self.ranks.unwrap_or(DEFAULT_JOB_RANKS),
            wall_time: Duration::from_secs(self.wall_time_seconds.unwrap_or(DEFAULT_WALL_TIME_S)),
        }
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms.unwrap_or(DEFAULT_RETRY_INITIAL_DELAY_MS)),
            max_delay: Duration::from_millis(self.retry_max_delay_ms.unwrap_or(DEFAULT_RETRY_MAX_DELAY_MS)),
            multiplier: self.retry_multiplier.unwrap_or(DEFAULT_RETRY_MULTIPLIER),
            max_attempts: self.retry_max_attempts.unwrap_or(DEFAULT_RETRY_MAX_ATTEMPTS),
            timeout: Duration::from_secs(self.retry_timeout_seconds.unwrap_or(DEFAULT_RETRY_TIMEOUT_S)),
        }
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            backoff: self.backoff(),
            poll_interval: Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS)),
            wait_timeout: Duration::from_secs(self.wait_timeout_seconds.unwrap_or(DEFAULT_WAIT_TIMEOUT_S)),
        }
    }
}

/// Measurement worker pool options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorOptions {
    pub max_concurrency: Option<usize>,
}

impl ExecutorOptions {
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY)
    }
}

impl InversionConfig {
    /// Build a configuration from flat dotted keys, e.g. `("windows.min_snr", "3.0")`.
    ///
    /// Values are read as YAML scalars, so `3.0`, `true` and `cross_correlation`
    /// become a number, a boolean and a string.
    pub fn from_key_values<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut root = serde_yaml::Mapping::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            let segments: Vec<&str> = key.split('.').map(str::trim).collect();
            if segments.iter().any(|segment| segment.is_empty()) {
                return Err(ConfigError::InvalidKey {
                    key: key.to_string(),
                    reason: "empty key segment".to_string(),
                });
            }
            let scalar: serde_yaml::Value = serde_yaml::from_str(value.as_ref()).map_err(|e| ConfigError::InvalidKey {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
            insert_dotted(&mut root, key, &segments, scalar)?;
        }
        serde_yaml::from_value(serde_yaml::Value::Mapping(root)).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

fn insert_dotted(
    node: &mut serde_yaml::Mapping,
    key: &str,
    segments: &[&str],
    value: serde_yaml::Value,
) -> Result<(), ConfigError> {
    let conflict = || ConfigError::InvalidKey {
        key: key.to_string(),
        reason: "conflicts with another key".to_string(),
    };
    let Some((head, rest)) = segments.split_first() else {
        return Err(conflict());
    };
    let head = serde_yaml::Value::String(head.to_string());

    if rest.is_empty() {
        if node.contains_key(&head) {
            return Err(conflict());
        }
        node.insert(head, value);
        return Ok(());
    }

    let child = node
        .entry(head)
        .or_insert_with(|| serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    match child {
        serde_yaml::Value::Mapping(mapping) => insert_dotted(mapping, key, rest, value),
        _ => Err(conflict()),
    }
}

/// Load a config from a YAML (`.yaml`, `.yml`) or TOML (`.toml`) file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<InversionConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string())),
        Some("toml") => toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string())),
        other => Err(ConfigError::Parse(format!(
            "unsupported configuration format '{}' (expected .yaml, .yml or .toml)",
            other.unwrap_or("")
        ))),
    }
}

/// Load a config and check every constraint, reporting all violations at once.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<InversionConfig, ConfigError> {
    let path = path.as_ref();
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg).map_err(ConfigError::Validation)?;
    ConfigLoaded {
        path: &path.display().to_string(),
        kernel: cfg.misfit.kernel(),
        max_concurrency: cfg.executor.max_concurrency(),
    }
    .log();
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_basic_config() {
        let yaml = r#"
misfit:
  kernel: time_frequency
  max_period: 60.0
windows:
  min_cc: 0.85
  reuse_from: it0000
executor:
  max_concurrency: 2
"#;

        let cfg: InversionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.misfit.kernel(), "time_frequency");
        assert_eq!(cfg.misfit.max_period(), 60.0);
        assert_eq!(cfg.misfit.min_period(), DEFAULT_MIN_PERIOD_S);
        assert_eq!(cfg.windows.min_cc(), 0.85);
        assert_eq!(cfg.windows.reuse_from.as_deref(), Some("it0000"));
        assert_eq!(cfg.executor.max_concurrency(), 2);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let cfg: InversionConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, InversionConfig::default());
        assert_eq!(cfg.misfit.kernel(), DEFAULT_KERNEL);
        assert_eq!(cfg.jobs.resources().ranks, DEFAULT_JOB_RANKS);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result: Result<InversionConfig, _> = serde_yaml::from_str("windows:\n  min_ccc: 0.5\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_key_values_builds_nested_sections() {
        let cfg = InversionConfig::from_key_values([
            ("windows.min_snr", "4.5"),
            ("preprocessing.bandpass", "false"),
            ("misfit.kernel", "cross_correlation"),
            ("jobs.ranks", "32"),
        ])
        .unwrap();
        assert_eq!(cfg.windows.min_snr(), 4.5);
        assert!(!cfg.preprocessing.bandpass());
        assert_eq!(cfg.misfit.kernel(), "cross_correlation");
        assert_eq!(cfg.jobs.resources().ranks, 32);
    }

    #[test]
    fn test_from_key_values_rejects_bad_keys() {
        assert!(matches!(
            InversionConfig::from_key_values([("windows..min_snr", "1")]),
            Err(ConfigError::InvalidKey { .. })
        ));
        assert!(matches!(
            InversionConfig::from_key_values([("windows", "1"), ("windows.min_snr", "1")]),
            Err(ConfigError::InvalidKey { .. })
        ));
        assert!(matches!(
            InversionConfig::from_key_values([("windows.no_such_field", "1")]),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_config_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("inversion.toml");
        let mut file = fs::File::create(&toml_path).unwrap();
        writeln!(file, "[misfit]\nkernel = \"cross_correlation\"\n\n[weights]\nreference_distance = 250.0").unwrap();
        let cfg = load_config(&toml_path).unwrap();
        assert_eq!(cfg.misfit.kernel(), "cross_correlation");
        assert_eq!(cfg.weights.reference_distance(), 250.0);

        let yaml_path = dir.path().join("inversion.yml");
        fs::write(&yaml_path, "jobs:\n  wall_time_seconds: 60\n").unwrap();
        let cfg = load_config(&yaml_path).unwrap();
        assert_eq!(cfg.jobs.resources().wall_time, Duration::from_secs(60));

        let ini_path = dir.path().join("inversion.ini");
        fs::write(&ini_path, "").unwrap();
        assert!(matches!(load_config(&ini_path), Err(ConfigError::Parse(_))));

        assert!(matches!(
            load_config(dir.path().join("missing.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_load_and_validate_reports_all_violations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "misfit:\n  kernel: nope\nexecutor:\n  max_concurrency: 0\n").unwrap();

        match load_and_validate_config(&path) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }
}
