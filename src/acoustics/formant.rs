//! Burg LPC formant tracking on a Gaussian-windowed, pre-emphasized signal.

use std::f64::consts::PI;

use tracing::warn;

use super::lpc::{burg, resonances};
use super::FormantTrack;
use crate::audio::resample::linear_resample;
use crate::types::AudioBuffer;

#[derive(Debug, Clone, PartialEq)]
pub struct FormantSettings {
    pub time_step: f64,
    pub max_formants: usize,
    /// Half the effective analysis window, in seconds.
    pub window_length: f64,
    /// Pre-emphasis starts at this frequency.
    pub pre_emphasis_from: f64,
}

impl Default for FormantSettings {
    fn default() -> Self {
        Self {
            time_step: 0.01,
            max_formants: 5,
            window_length: 0.025,
            pre_emphasis_from: 50.0,
        }
    }
}

fn gaussian_window(size: usize) -> Vec<f64> {
    let edge = (-12.0_f64).exp();
    let mid = (size as f64 - 1.0) / 2.0;
    let denom = (size + 1) as f64;
    (0..size)
        .map(|i| {
            let d = i as f64 - mid;
            ((-48.0 * d * d / (denom * denom)).exp() - edge) / (1.0 - edge)
        })
        .collect()
}

fn pre_emphasize(samples: &mut [f64], sample_rate: f64, from_hz: f64) {
    if from_hz <= 0.0 {
        return;
    }
    let alpha = (-2.0 * PI * from_hz / sample_rate).exp();
    for i in (1..samples.len()).rev() {
        samples[i] -= alpha * samples[i - 1];
    }
}

pub(super) fn track_formants(
    audio: &AudioBuffer,
    ceiling_hz: f64,
    settings: &FormantSettings,
) -> FormantTrack {
    let time_step = settings.time_step;
    let empty = || FormantTrack::new(0.0, time_step, Vec::new());
    if audio.is_empty() || audio.sample_rate == 0 {
        return empty();
    }

    let target_rate = (2.0 * ceiling_hz).round() as u32;
    let (samples, sample_rate) = if audio.sample_rate > target_rate {
        match linear_resample(&audio.samples, audio.sample_rate, target_rate) {
            Ok(resampled) => (resampled, target_rate),
            Err(err) => {
                warn!(error = %err, ceiling_hz, "formant resampling failed");
                return empty();
            }
        }
    } else {
        (audio.samples.clone(), audio.sample_rate)
    };
    let sample_rate = sample_rate as f64;
    let mut samples: Vec<f64> = samples.into_iter().map(f64::from).collect();
    pre_emphasize(&mut samples, sample_rate, settings.pre_emphasis_from);

    let dx = 1.0 / sample_rate;
    let window_duration = 2.0 * settings.window_length;
    let window_len = (window_duration / dx).floor() as usize;
    let half_len = window_len / 2;
    let window = gaussian_window(window_len);
    let duration = samples.len() as f64 * dx;
    if duration < window_duration || window_len == 0 {
        return empty();
    }

    let frame_count = 1 + ((duration - window_duration) / time_step).floor() as usize;
    let first_sample_time = 0.5 * dx;
    let first_time =
        first_sample_time + 0.5 * (duration - dx - (frame_count - 1) as f64 * time_step);
    let order = 2 * settings.max_formants;
    let n = samples.len() as isize;

    let frames = (0..frame_count)
        .map(|frame| {
            let time = first_time + frame as f64 * time_step;
            let left = ((time - first_sample_time) / dx).floor() as isize;
            let start = (left + 1 - half_len as isize).max(0);
            let end = (left + half_len as isize).min(n - 1);
            let windowed: Vec<f64> = (start..=end)
                .zip(window.iter())
                .map(|(i, w)| samples[i as usize] * w)
                .collect();

            let mut formants: Vec<f64> = burg(&windowed, order)
                .map(|coefficients| resonances(&coefficients, sample_rate))
                .unwrap_or_default()
                .into_iter()
                .take(settings.max_formants)
                .map(|r| r.frequency)
                .collect();
            formants.resize(settings.max_formants, f64::NAN);
            formants
        })
        .collect();

    FormantTrack::new(first_time, time_step, frames)
}
