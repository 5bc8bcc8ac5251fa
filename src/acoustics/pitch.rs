//! Autocorrelation pitch tracking with Viterbi path selection.

use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::{PitchFrame, PitchTrack};

#[derive(Debug, Clone, PartialEq)]
pub struct PitchSettings {
    /// Seconds between frames; zero picks `periods_per_window / floor / 4`.
    pub time_step: f64,
    pub max_candidates: usize,
    pub silence_threshold: f64,
    pub voicing_threshold: f64,
    pub octave_cost: f64,
    pub octave_jump_cost: f64,
    pub voiced_unvoiced_cost: f64,
    pub periods_per_window: f64,
}

impl Default for PitchSettings {
    fn default() -> Self {
        Self {
            time_step: 0.0,
            max_candidates: 15,
            silence_threshold: 0.03,
            voicing_threshold: 0.45,
            octave_cost: 0.01,
            octave_jump_cost: 0.35,
            voiced_unvoiced_cost: 0.14,
            periods_per_window: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    frequency: f64,
    strength: f64,
}

impl Candidate {
    const UNVOICED: Candidate = Candidate {
        frequency: 0.0,
        strength: 0.0,
    };

    fn is_voiceless(&self, ceiling: f64) -> bool {
        self.frequency <= 0.0 || self.frequency >= ceiling
    }
}

struct FrameCandidates {
    candidates: Vec<Candidate>,
    /// Local peak relative to the global peak, in [0, 1].
    intensity: f64,
}

/// Zero-padded autocorrelation through a forward/inverse FFT pair.
struct Autocorrelator {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
}

impl Autocorrelator {
    fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
            buffer: vec![Complex::new(0.0, 0.0); size],
        }
    }

    fn autocorrelate(&mut self, input: &[f64]) -> Vec<f64> {
        let size = self.buffer.len();
        for (slot, value) in self.buffer.iter_mut().zip(
            input
                .iter()
                .copied()
                .chain(std::iter::repeat(0.0)),
        ) {
            *slot = Complex::new(value, 0.0);
        }
        self.forward.process(&mut self.buffer);
        for value in self.buffer.iter_mut() {
            *value = Complex::new(value.norm_sqr(), 0.0);
        }
        self.inverse.process(&mut self.buffer);
        let scale = 1.0 / size as f64;
        self.buffer.iter().map(|c| c.re * scale).collect()
    }
}

/// Frame layout derived from the pitch range and sample rate.
struct Geometry {
    sample_rate: f64,
    half_window: usize,
    window_len: usize,
    period_len: usize,
    half_period: usize,
    min_lag: usize,
    max_lag: usize,
    brent_max: usize,
}

pub(super) fn track_pitch(
    samples: &[f64],
    sample_rate: f64,
    floor_hz: f64,
    ceiling_hz: f64,
    settings: &PitchSettings,
) -> PitchTrack {
    if samples.is_empty() || sample_rate <= 0.0 {
        return PitchTrack::default();
    }
    let dx = 1.0 / sample_rate;
    let floor = floor_hz.max(10.0);
    let ceiling = ceiling_hz.min(0.5 * sample_rate);
    let periods = settings.periods_per_window;
    let time_step = if settings.time_step > 0.0 {
        settings.time_step
    } else {
        periods / floor / 4.0
    };

    let window_duration = periods / floor;
    let half_window = ((window_duration / dx).floor() as usize / 2).saturating_sub(1);
    let duration = samples.len() as f64 * dx;
    if half_window < 2 || duration < window_duration {
        return PitchTrack::default();
    }
    let window_len = half_window * 2;
    let period_len = (sample_rate / floor).floor() as usize;
    let geometry = Geometry {
        sample_rate,
        half_window,
        window_len,
        period_len,
        half_period: period_len / 2 + 1,
        min_lag: ((sample_rate / ceiling).floor() as usize).max(2),
        max_lag: ((window_len as f64 / periods).floor() as usize + 2).min(window_len),
        brent_max: window_len / 2,
    };

    let frame_count = ((duration - window_duration) / time_step).floor() as usize + 1;
    let first_time = 0.5 * duration - 0.5 * frame_count as f64 * time_step + 0.5 * time_step;

    let window: Vec<f64> = (0..window_len)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * (i + 1) as f64 / (window_len + 1) as f64).cos())
        .collect();
    let fft_len = ((window_len as f64 * 1.5).ceil() as usize).next_power_of_two();
    let mut autocorrelator = Autocorrelator::new(fft_len);
    let window_ac = autocorrelator.autocorrelate(&window);
    let window_r: Vec<f64> = (0..=window_len)
        .map(|i| if window_ac[0] > 0.0 { window_ac[i] / window_ac[0] } else { 0.0 })
        .collect();

    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let global_peak = samples.iter().fold(0.0_f64, |acc, s| acc.max((s - mean).abs()));
    let times: Vec<f64> = (0..frame_count)
        .map(|i| first_time + i as f64 * time_step)
        .collect();
    if global_peak == 0.0 {
        return PitchTrack::new(
            times
                .into_iter()
                .map(|time| PitchFrame {
                    time,
                    frequency: None,
                })
                .collect(),
        );
    }

    let max_candidates = settings
        .max_candidates
        .max((ceiling / floor).floor() as usize)
        .max(2);
    let frames: Vec<FrameCandidates> = times
        .iter()
        .map(|&time| {
            analyse_frame(
                samples,
                time,
                &geometry,
                &window,
                &window_r,
                global_peak,
                floor,
                max_candidates,
                settings,
                &mut autocorrelator,
            )
        })
        .collect();

    let path = best_path(&frames, settings, ceiling, time_step);
    PitchTrack::new(
        times
            .into_iter()
            .zip(frames.iter().zip(path))
            .map(|(time, (frame, choice))| {
                let candidate = frame.candidates[choice];
                PitchFrame {
                    time,
                    frequency: (!candidate.is_voiceless(ceiling)).then_some(candidate.frequency),
                }
            })
            .collect(),
    )
}

#[allow(clippy::too_many_arguments)]
fn analyse_frame(
    samples: &[f64],
    time: f64,
    geometry: &Geometry,
    window: &[f64],
    window_r: &[f64],
    global_peak: f64,
    floor: f64,
    max_candidates: usize,
    settings: &PitchSettings,
    autocorrelator: &mut Autocorrelator,
) -> FrameCandidates {
    let n = samples.len() as isize;
    let dx = 1.0 / geometry.sample_rate;
    let left = ((time - 0.5 * dx) / dx).floor() as isize;
    let right = left + 1;

    let mean_start = (right - geometry.period_len as isize).max(0);
    let mean_end = (left + geometry.period_len as isize).min(n);
    let local_mean = if mean_end > mean_start {
        samples[mean_start as usize..mean_end as usize].iter().sum::<f64>()
            / (mean_end - mean_start) as f64
    } else {
        0.0
    };

    let offset = right - geometry.half_window as isize;
    let frame: Vec<f64> = window
        .iter()
        .enumerate()
        .map(|(j, w)| {
            let idx = offset + j as isize;
            if (0..n).contains(&idx) {
                (samples[idx as usize] - local_mean) * w
            } else {
                0.0
            }
        })
        .collect();

    let peak_start = geometry.half_window.saturating_sub(geometry.half_period);
    let peak_end = (geometry.half_window + geometry.half_period).min(geometry.window_len);
    let local_peak = frame[peak_start..peak_end]
        .iter()
        .fold(0.0_f64, |acc, s| acc.max(s.abs()));
    let intensity = (local_peak / global_peak).min(1.0);

    let mut candidates = vec![Candidate::UNVOICED];
    if local_peak == 0.0 {
        return FrameCandidates {
            candidates,
            intensity,
        };
    }

    let ac = autocorrelator.autocorrelate(&frame);
    if ac[0] <= 0.0 {
        return FrameCandidates {
            candidates,
            intensity,
        };
    }
    let mut r = vec![0.0; geometry.brent_max + 2];
    r[0] = 1.0;
    for (i, slot) in r.iter_mut().enumerate().skip(1) {
        if window_r[i].abs() > 1e-10 {
            *slot = ac[i] / (ac[0] * window_r[i]);
        }
    }

    let weighted = |c: &Candidate| c.strength - settings.octave_cost * (floor / c.frequency).log2();
    let upper = geometry.max_lag.min(geometry.brent_max);
    for i in geometry.min_lag..upper {
        let (prev, mid, next) = (r[i - 1], r[i], r[i + 1]);
        if !(mid > 0.5 * settings.voicing_threshold && mid > prev && mid >= next) {
            continue;
        }
        let dr = 0.5 * (next - prev);
        let d2r = 2.0 * mid - prev - next;
        if d2r <= 0.0 {
            continue;
        }
        let lag = i as f64 + dr / d2r;
        let mut strength = mid + 0.5 * dr * dr / d2r;
        if strength > 1.0 {
            strength = 1.0 / strength;
        }
        let candidate = Candidate {
            frequency: geometry.sample_rate / lag,
            strength,
        };

        if candidates.len() < max_candidates {
            candidates.push(candidate);
            continue;
        }
        let weakest = candidates
            .iter()
            .enumerate()
            .skip(1)
            .min_by(|a, b| weighted(a.1).total_cmp(&weighted(b.1)));
        if let Some((place, current)) = weakest {
            if weighted(&candidate) > weighted(current) {
                candidates[place] = candidate;
            }
        }
    }

    FrameCandidates {
        candidates,
        intensity,
    }
}

/// Viterbi search over per-frame candidates; returns the chosen candidate
/// index for every frame.
fn best_path(
    frames: &[FrameCandidates],
    settings: &PitchSettings,
    ceiling: f64,
    time_step: f64,
) -> Vec<usize> {
    if frames.is_empty() {
        return Vec::new();
    }
    let correction = 0.01 / time_step;
    let octave_jump_cost = settings.octave_jump_cost * correction;
    let voiced_unvoiced_cost = settings.voiced_unvoiced_cost * correction;

    let local_score = |frame: &FrameCandidates, candidate: &Candidate| {
        if candidate.is_voiceless(ceiling) {
            if settings.silence_threshold <= 0.0 {
                0.0
            } else {
                let relative = frame.intensity
                    / (settings.silence_threshold / (1.0 + settings.voicing_threshold));
                settings.voicing_threshold + (2.0 - relative).max(0.0)
            }
        } else {
            candidate.strength - settings.octave_cost * (ceiling / candidate.frequency).log2()
        }
    };

    let mut delta: Vec<Vec<f64>> = frames
        .iter()
        .map(|frame| {
            frame
                .candidates
                .iter()
                .map(|c| local_score(frame, c))
                .collect()
        })
        .collect();
    let mut psi: Vec<Vec<usize>> = frames.iter().map(|f| vec![0; f.candidates.len()]).collect();

    for t in 1..frames.len() {
        let (previous, current) = (&frames[t - 1], &frames[t]);
        for (j, to) in current.candidates.iter().enumerate() {
            let mut best = f64::NEG_INFINITY;
            let mut place = 0;
            for (i, from) in previous.candidates.iter().enumerate() {
                let transition = match (from.is_voiceless(ceiling), to.is_voiceless(ceiling)) {
                    (true, true) => 0.0,
                    (true, false) | (false, true) => voiced_unvoiced_cost,
                    (false, false) => octave_jump_cost * (from.frequency / to.frequency).log2().abs(),
                };
                let score = delta[t - 1][i] - transition;
                if score > best {
                    best = score;
                    place = i;
                }
            }
            delta[t][j] += best;
            psi[t][j] = place;
        }
    }

    let last = frames.len() - 1;
    let mut place = delta[last]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut path = vec![0; frames.len()];
    for t in (0..frames.len()).rev() {
        path[t] = place;
        place = psi[t][place];
    }
    path
}
