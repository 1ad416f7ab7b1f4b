// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

// Misfit measurement

/// Misfit kernel used when none is configured.
pub const DEFAULT_KERNEL: &str = "l2";
/// Shortest period of the measurement band, seconds.
pub const DEFAULT_MIN_PERIOD_S: f64 = 10.0;
/// Longest period of the measurement band, seconds. Also the dominant period used
/// to bound cross-correlation lags.
pub const DEFAULT_MAX_PERIOD_S: f64 = 40.0;
/// Time-frequency cells whose normalized observed amplitude falls below this are ignored.
pub const DEFAULT_TF_AMPLITUDE_THRESHOLD: f64 = 0.05;

// Preprocessing

/// Sampling rate every trace is brought to, Hz.
pub const DEFAULT_SAMPLING_RATE_HZ: f64 = 1.0;
/// Relative sampling-rate deviation that is still resampled instead of discarded.
pub const DEFAULT_SAMPLE_RATE_TOLERANCE: f64 = 0.01;
/// Fraction of the trace tapered at each end.
pub const DEFAULT_TAPER_FRACTION: f64 = 0.05;
pub const DEFAULT_BANDPASS: bool = true;
/// Minimum signal/noise amplitude ratio of a whole trace.
pub const DEFAULT_PREPROCESS_MIN_SNR: f64 = 2.0;
/// Fastest expected phase velocity, km/s; bounds the predicted first arrival.
pub const DEFAULT_MAX_VELOCITY_KM_S: f64 = 8.0;
/// Noise window ends this many seconds before the predicted first arrival.
pub const DEFAULT_NOISE_MARGIN_S: f64 = 20.0;

// Window selection

/// Candidate segments are where the synthetic envelope exceeds this fraction of its maximum.
pub const DEFAULT_ENVELOPE_THRESHOLD: f64 = 0.1;
/// Padding added on both sides of a candidate segment, seconds.
pub const DEFAULT_WINDOW_MARGIN_S: f64 = 10.0;
/// Largest accepted cross-correlation lag as a fraction of the dominant period.
pub const DEFAULT_MAX_LAG_FRACTION: f64 = 0.5;
/// Smallest accepted normalized cross-correlation coefficient.
pub const DEFAULT_MIN_CC: f64 = 0.7;
/// Minimum amplitude ratio between a candidate and its leading noise window.
pub const DEFAULT_WINDOW_MIN_SNR: f64 = 3.0;
/// Windows separated by at most this gap are merged, seconds.
pub const DEFAULT_MERGE_GAP_S: f64 = 5.0;
/// Windows shorter than this are dropped, seconds.
pub const DEFAULT_MIN_WINDOW_LENGTH_S: f64 = 10.0;

// Station weights

/// Reference distance `d0` of the Gaussian neighbour kernel, km.
pub const DEFAULT_REFERENCE_DISTANCE_KM: f64 = 1000.0;

// Simulation jobs

pub const DEFAULT_JOB_RANKS: u32 = 1;
pub const DEFAULT_WALL_TIME_S: u64 = 3600;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
/// Overall limit of waiting for one job.
pub const DEFAULT_WAIT_TIMEOUT_S: u64 = 86_400;
pub const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 500;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 30_000;
pub const DEFAULT_RETRY_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 5;
/// Overall limit of one retried remote call.
pub const DEFAULT_RETRY_TIMEOUT_S: u64 = 120;

// Executor

/// Worker permits of the measurement pool.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

// Persistence

/// Version written into every persisted artifact envelope.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;
