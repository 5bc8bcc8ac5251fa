//! Linear and perceptual (Bark) distances between formant measurements.

use serde::Serialize;

use crate::types::FormantPair;

/// Traunmüller's Hz to Bark conversion. NaN for non-positive or non-finite
/// input.
pub fn hz_to_bark(hz: f64) -> f64 {
    if !hz.is_finite() || hz <= 0.0 {
        return f64::NAN;
    }
    26.81 * hz / (1960.0 + hz) - 0.53
}

pub fn distance_hz(a: FormantPair, b: FormantPair) -> f64 {
    (a.f1 - b.f1).hypot(a.f2 - b.f2)
}

pub fn distance_bark(a: FormantPair, b: FormantPair) -> f64 {
    (hz_to_bark(a.f1) - hz_to_bark(b.f1)).hypot(hz_to_bark(a.f2) - hz_to_bark(b.f2))
}

/// Mean over finite entries; NaN when there are none.
pub fn nan_mean(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.iter().sum::<f64>() / finite.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceScore {
    pub hz: f64,
    pub bark: f64,
    pub is_outlier: bool,
}

/// Average per-point distances of normalized learner formants from the
/// reference and flag Bark distances above `outlier_bark`.
pub fn score(normalized: &[FormantPair], reference: &[FormantPair], outlier_bark: f64) -> DistanceScore {
    let (hz, bark): (Vec<f64>, Vec<f64>) = normalized
        .iter()
        .zip(reference)
        .map(|(&s, &r)| (distance_hz(s, r), distance_bark(s, r)))
        .unzip();
    let hz = nan_mean(&hz);
    let bark = nan_mean(&bark);
    DistanceScore {
        hz,
        bark,
        // NaN compares false, so failed measurements are never outliers.
        is_outlier: bark > outlier_bark,
    }
}
