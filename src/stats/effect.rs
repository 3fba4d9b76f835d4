//! Effect size magnitudes and Cohen's d

use crate::stats::descriptive::{mean, sample_variance};
use crate::structs::{EffectKind, EffectMagnitude};

/// Upper bounds (exclusive) on `|r|` for negligible, small, medium and large
const CORRELATION_BOUNDS: [f64; 4] = [0.10, 0.30, 0.50, 0.70];

/// Upper bounds (exclusive) on `|d|` for negligible, small and medium
const MEAN_DIFFERENCE_BOUNDS: [f64; 3] = [0.20, 0.50, 0.80];

const ORDER: [EffectMagnitude; 5] = [
    EffectMagnitude::Negligible,
    EffectMagnitude::Small,
    EffectMagnitude::Medium,
    EffectMagnitude::Large,
    EffectMagnitude::VeryLarge,
];

/// Classify an effect size by its absolute value
///
/// A value sitting exactly on a bound falls into the higher bucket. NaN is
/// classified as negligible.
#[must_use]
pub fn interpret(value: f64, kind: EffectKind) -> EffectMagnitude {
    let bounds: &[f64] = match kind {
        EffectKind::Correlation => &CORRELATION_BOUNDS,
        EffectKind::MeanDifference => &MEAN_DIFFERENCE_BOUNDS,
    };
    if value.is_nan() {
        return EffectMagnitude::Negligible;
    }

    let magnitude = value.abs();
    let bucket = bounds
        .iter()
        .position(|&bound| magnitude < bound)
        .unwrap_or(bounds.len());
    ORDER[bucket]
}

/// Cohen's d of `a` relative to `b` using the pooled sample SD
///
/// NaN entries are skipped. Returns NaN when either group has fewer than two
/// values or the pooled SD is zero.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn cohens_d(a: &[f64], b: &[f64]) -> f64 {
    let a: Vec<f64> = a.iter().copied().filter(|v| !v.is_nan()).collect();
    let b: Vec<f64> = b.iter().copied().filter(|v| !v.is_nan()).collect();
    if a.len() < 2 || b.len() < 2 {
        return f64::NAN;
    }

    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let pooled_var = ((n_a - 1.0) * sample_variance(&a) + (n_b - 1.0) * sample_variance(&b))
        / (n_a + n_b - 2.0);
    let pooled_sd = pooled_var.sqrt();
    if pooled_sd == 0.0 {
        return f64::NAN;
    }

    (mean(&a) - mean(&b)) / pooled_sd
}
