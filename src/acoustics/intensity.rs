//! Kaiser-windowed short-term intensity in dB.

use std::f64::consts::PI;

use super::IntensityCurve;

/// 20 micropascal, the auditory threshold.
const REFERENCE_PRESSURE: f64 = 2.0e-5;
const SILENT_DB: f64 = -300.0;

#[derive(Debug, Clone, PartialEq)]
pub struct IntensitySettings {
    /// Lowest pitch the window must cover; sets window length and step.
    pub min_pitch: f64,
    pub subtract_mean: bool,
}

impl Default for IntensitySettings {
    fn default() -> Self {
        Self {
            min_pitch: 100.0,
            subtract_mean: true,
        }
    }
}

fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..200 {
        term *= half / k as f64;
        let contribution = term * term;
        sum += contribution;
        if contribution < 1e-16 * sum {
            break;
        }
    }
    sum
}

pub(super) fn intensity_curve(
    samples: &[f64],
    sample_rate: f64,
    settings: &IntensitySettings,
) -> IntensityCurve {
    let min_pitch = settings.min_pitch.max(1.0);
    let logical_window = 3.2 / min_pitch;
    let physical_window = 2.0 * logical_window;
    let time_step = logical_window / 4.0;

    let dx = 1.0 / sample_rate;
    let duration = samples.len() as f64 * dx;
    if samples.is_empty() || physical_window > duration {
        return IntensityCurve::new(0.0, time_step, Vec::new());
    }

    let half_window_duration = 0.5 * physical_window;
    let half_len = (half_window_duration / dx).floor() as isize;
    let bessel_arg = 2.0 * PI * PI + 0.5;
    let window: Vec<f64> = (-half_len..=half_len)
        .map(|k| {
            let x = k as f64 * dx / half_window_duration;
            bessel_i0(bessel_arg * (1.0 - x * x).max(0.0).sqrt())
        })
        .collect();

    let frame_count = ((duration - physical_window) / time_step).floor() as usize + 1;
    let first_time = 0.5 * duration - 0.5 * frame_count as f64 * time_step + 0.5 * time_step;
    let n = samples.len() as isize;

    let values = (0..frame_count)
        .map(|frame| {
            let mid = first_time + frame as f64 * time_step;
            let centre = ((mid - 0.5 * dx) / dx).round() as isize;
            let from = (centre - half_len).max(0);
            let to = (centre + half_len).min(n - 1);
            if to < from {
                return SILENT_DB;
            }
            let span = &samples[from as usize..=to as usize];
            let mean = if settings.subtract_mean {
                span.iter().sum::<f64>() / span.len() as f64
            } else {
                0.0
            };
            let (mut sum_xw, mut sum_w) = (0.0, 0.0);
            for (offset, sample) in span.iter().enumerate() {
                let w = window[(from - centre + half_len) as usize + offset];
                let centred = sample - mean;
                sum_xw += centred * centred * w;
                sum_w += w;
            }
            let power = if sum_w > 0.0 { sum_xw / sum_w } else { 0.0 };
            let relative = power / (REFERENCE_PRESSURE * REFERENCE_PRESSURE);
            if relative < 1.0e-30 {
                SILENT_DB
            } else {
                10.0 * relative.log10()
            }
        })
        .collect();

    IntensityCurve::new(first_time, time_step, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(amplitude: f64, seconds: f64) -> Vec<f64> {
        let n = (16_000.0 * seconds) as usize;
        (0..n)
            .map(|i| amplitude * (2.0 * PI * 440.0 * i as f64 / 16_000.0).sin())
            .collect()
    }

    #[test]
    fn halving_amplitude_drops_six_db() {
        let settings = IntensitySettings::default();
        let loud = intensity_curve(&tone(0.5, 0.5), 16_000.0, &settings);
        let quiet = intensity_curve(&tone(0.25, 0.5), 16_000.0, &settings);
        let mid = loud.values.len() / 2;
        let diff = loud.values[mid] - quiet.values[mid];
        assert!((diff - 20.0 * 2.0_f64.log10()).abs() < 0.05, "diff {diff}");
    }

    #[test]
    fn sine_power_matches_rms() {
        let curve = intensity_curve(&tone(0.5, 0.5), 16_000.0, &IntensitySettings::default());
        let expected = 10.0 * (0.125 / 4.0e-10_f64).log10();
        let mid = curve.values[curve.values.len() / 2];
        assert!((mid - expected).abs() < 0.5, "{mid} vs {expected}");
    }

    #[test]
    fn silence_reports_floor_value() {
        let curve = intensity_curve(&vec![0.0; 8000], 16_000.0, &IntensitySettings::default());
        assert!(curve.values.iter().all(|&v| v == SILENT_DB));
    }

    #[test]
    fn bessel_matches_known_value() {
        assert!((bessel_i0(1.0) - 1.266_065_877_752_008_4).abs() < 1e-12);
    }
}
