//! Burg linear prediction and conversion of its poles to formants.

use std::f64::consts::PI;

use num_complex::Complex;

/// Poles closer than this to the band edges are not reported as formants.
const EDGE_MARGIN_HZ: f64 = 50.0;
const ROOT_ITERATIONS: usize = 500;
const POLISH_ITERATIONS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resonance {
    pub frequency: f64,
    pub bandwidth: f64,
}

/// Burg's method. Returns predictor coefficients `a[0..order]` for
/// `x[n] ≈ Σ a[k] x[n-k-1]`, or `None` when the frame carries no energy.
pub fn burg(samples: &[f64], order: usize) -> Option<Vec<f64>> {
    let n = samples.len();
    if order == 0 || n <= order + 1 {
        return None;
    }
    let power: f64 = samples.iter().map(|s| s * s).sum();
    if power <= 0.0 {
        return None;
    }

    let mut a = vec![0.0; order];
    let mut previous = vec![0.0; order];
    let mut forward = vec![0.0; n];
    let mut backward = vec![0.0; n];
    forward[0] = samples[0];
    backward[n - 2] = samples[n - 1];
    for j in 1..n - 1 {
        forward[j] = samples[j];
        backward[j - 1] = samples[j];
    }

    for i in 0..order {
        let (mut num, mut den) = (0.0, 0.0);
        for j in 0..n - i - 1 {
            num += forward[j] * backward[j];
            den += forward[j] * forward[j] + backward[j] * backward[j];
        }
        if den <= 0.0 {
            return Some(a);
        }
        a[i] = 2.0 * num / den;
        for j in 0..i {
            a[j] = previous[j] - a[i] * previous[i - j - 1];
        }
        if i + 1 < order {
            previous[..=i].copy_from_slice(&a[..=i]);
            for j in 0..n - i - 2 {
                forward[j] -= previous[i] * backward[j];
                backward[j] = backward[j + 1] - previous[i] * forward[j + 1];
            }
        }
    }
    Some(a)
}

/// Resonances of the all-pole filter, sorted by frequency, restricted to
/// `[50, nyquist - 50]` Hz.
pub fn resonances(coefficients: &[f64], sample_rate: f64) -> Vec<Resonance> {
    let m = coefficients.len();
    if m == 0 || coefficients.iter().all(|c| *c == 0.0) {
        return Vec::new();
    }
    let nyquist = sample_rate / 2.0;

    // Monic polynomial z^m - a[0] z^(m-1) - ... - a[m-1], lowest power first.
    let mut poly = vec![0.0; m + 1];
    for (i, slot) in poly.iter_mut().take(m).enumerate() {
        *slot = -coefficients[m - 1 - i];
    }
    poly[m] = 1.0;

    let mut found: Vec<Resonance> = polynomial_roots(&poly)
        .into_iter()
        .map(|root| {
            let magnitude = root.norm();
            if magnitude > 1.0 {
                root / (magnitude * magnitude)
            } else {
                root
            }
        })
        .filter(|root| root.im >= 0.0)
        .filter_map(|root| {
            let frequency = root.im.atan2(root.re).abs() * nyquist / PI;
            if !(EDGE_MARGIN_HZ..=nyquist - EDGE_MARGIN_HZ).contains(&frequency) {
                return None;
            }
            let magnitude = root.norm();
            let bandwidth = if magnitude > 0.0 {
                -magnitude.ln() * nyquist / PI
            } else {
                nyquist
            };
            Some(Resonance {
                frequency,
                bandwidth,
            })
        })
        .collect();
    found.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
    found
}

fn evaluate(poly: &[f64], z: Complex<f64>) -> (Complex<f64>, Complex<f64>) {
    let mut value = Complex::new(0.0, 0.0);
    let mut derivative = Complex::new(0.0, 0.0);
    for &c in poly.iter().rev() {
        derivative = derivative * z + value;
        value = value * z + c;
    }
    (value, derivative)
}

/// Durand-Kerner iteration for a monic polynomial, then Newton polishing.
fn polynomial_roots(poly: &[f64]) -> Vec<Complex<f64>> {
    let degree = poly.len().saturating_sub(1);
    if degree == 0 {
        return Vec::new();
    }
    let seed = Complex::new(0.4, 0.9);
    let mut roots: Vec<Complex<f64>> = (0..degree).map(|k| seed.powu(k as u32)).collect();

    for _ in 0..ROOT_ITERATIONS {
        let mut largest_step = 0.0_f64;
        for k in 0..degree {
            let (value, _) = evaluate(poly, roots[k]);
            let denominator = roots
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != k)
                .fold(Complex::new(1.0, 0.0), |acc, (_, other)| {
                    acc * (roots[k] - other)
                });
            if denominator.norm() == 0.0 {
                continue;
            }
            let step = value / denominator;
            roots[k] -= step;
            largest_step = largest_step.max(step.norm());
        }
        if largest_step < 1e-14 {
            break;
        }
    }

    for root in roots.iter_mut() {
        polish(poly, root);
    }
    roots
}

fn polish(poly: &[f64], root: &mut Complex<f64>) {
    let mut best = *root;
    let mut best_residual = f64::MAX;
    for _ in 0..POLISH_ITERATIONS {
        let (value, derivative) = evaluate(poly, *root);
        let residual = value.norm();
        if residual >= best_residual {
            *root = best;
            return;
        }
        best_residual = residual;
        best = *root;
        if derivative.norm() == 0.0 {
            return;
        }
        *root -= value / derivative;
    }
}
