// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Location and strength of the cross-correlation maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationPeak {
    /// Sub-sample lag `k` such that `observed[i] ≈ synthetic[i - k]`.
    pub lag_samples: f64,
    /// Correlation at the integer peak normalized by both signal energies, in `[-1, 1]`.
    pub coefficient: f64,
}

/// `c(k) = Σ_i observed[i] · synthetic[i - k]` over the overlapping samples.
fn correlate_at(observed: &[f64], synthetic: &[f64], lag: isize) -> f64 {
    let n = observed.len().min(synthetic.len()) as isize;
    let first = lag.max(0);
    let last = (n + lag).min(n);
    (first..last)
        .map(|i| observed[i as usize] * synthetic[(i - lag) as usize])
        .sum()
}

/// Lags visited as 0, -1, 1, -2, 2, ... so the smallest |lag| wins ties.
fn lag_order(max_lag: usize) -> impl Iterator<Item = isize> {
    std::iter::once(0).chain((1..=max_lag as isize).flat_map(|k| [-k, k]))
}

/// Find the lag in `[-max_lag, max_lag]` maximizing the cross-correlation of two
/// equally sampled signals, refined by a parabola through the peak and its neighbours.
///
/// Returns `None` when either signal has no energy.
pub fn cross_correlation_lag(observed: &[f64], synthetic: &[f64], max_lag: usize) -> Option<CorrelationPeak> {
    let n = observed.len().min(synthetic.len());
    if n == 0 {
        return None;
    }
    let energy_obs: f64 = observed[..n].iter().map(|x| x * x).sum();
    let energy_syn: f64 = synthetic[..n].iter().map(|x| x * x).sum();
    let norm = (energy_obs * energy_syn).sqrt();
    if norm <= 0.0 || !norm.is_finite() {
        return None;
    }

    let max_lag = max_lag.min(n - 1);
    let mut best_lag = 0isize;
    let mut best_value = f64::NEG_INFINITY;
    for lag in lag_order(max_lag) {
        let value = correlate_at(observed, synthetic, lag);
        if value > best_value {
            best_value = value;
            best_lag = lag;
        }
    }

    let mut refined = best_lag as f64;
    if best_lag.unsigned_abs() < max_lag {
        let left = correlate_at(observed, synthetic, best_lag - 1);
        let right = correlate_at(observed, synthetic, best_lag + 1);
        let curvature = left - 2.0 * best_value + right;
        if curvature < 0.0 {
            let offset = 0.5 * (left - right) / curvature;
            if offset.abs() <= 0.5 {
                refined += offset;
            }
        }
    }

    Some(CorrelationPeak {
        lag_samples: refined,
        coefficient: best_value / norm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse(n: usize, center: f64, sigma: f64) -> Vec<f64> {
        (0..n)
            .map(|i| (-((i as f64 - center) / sigma).powi(2) / 2.0).exp())
            .collect()
    }

    #[test]
    fn test_identical_signals_have_zero_lag_and_unit_coefficient() {
        let signal = pulse(200, 100.0, 8.0);
        let peak = cross_correlation_lag(&signal, &signal, 30).unwrap();
        assert!(peak.lag_samples.abs() < 1e-9);
        assert!((peak.coefficient - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_delayed_observation_gives_positive_lag() {
        let synthetic = pulse(200, 100.0, 8.0);
        let observed = pulse(200, 104.0, 8.0);
        let peak = cross_correlation_lag(&observed, &synthetic, 30).unwrap();
        assert!((peak.lag_samples - 4.0).abs() < 0.05, "lag {}", peak.lag_samples);
    }

    #[test]
    fn test_sub_sample_shift_is_refined() {
        let synthetic = pulse(400, 200.0, 12.0);
        let observed = pulse(400, 197.4, 12.0);
        let peak = cross_correlation_lag(&observed, &synthetic, 30).unwrap();
        assert!((peak.lag_samples + 2.6).abs() < 0.1, "lag {}", peak.lag_samples);
    }

    #[test]
    fn test_silent_signal_has_no_peak() {
        let signal = pulse(50, 25.0, 3.0);
        assert!(cross_correlation_lag(&signal, &[0.0; 50], 10).is_none());
        assert!(cross_correlation_lag(&[], &[], 10).is_none());
    }

    #[test]
    fn test_lag_order_prefers_small_magnitudes() {
        let order: Vec<_> = lag_order(2).collect();
        assert_eq!(order, vec![0, -1, 1, -2, 2]);
    }
}
