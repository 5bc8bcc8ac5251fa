//! Per-speaker vocal tract length normalization.
//!
//! The scaling factor is recomputed from scratch on every call as the median
//! of every learner/reference formant ratio the speaker has produced,
//! including the current submission.

use crate::types::FormantPair;

/// Ratios `raw / reference` for F1 and F2 where both sides are finite and
/// the reference is positive.
pub fn pair_ratios(raw: FormantPair, reference: FormantPair) -> Vec<f64> {
    [(raw.f1, reference.f1), (raw.f2, reference.f2)]
        .into_iter()
        .filter(|(r, f)| r.is_finite() && f.is_finite() && *f > 0.0)
        .map(|(r, f)| r / f)
        .collect()
}

/// Median of the combined ratio set, or 1.0 when there is none.
pub fn scaling_factor(current: &[f64], historical: &[f64]) -> f64 {
    let all: Vec<f64> = historical.iter().chain(current).copied().collect();
    median(&all).unwrap_or(1.0)
}

pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    })
}
