//! Adaptive leading/trailing silence removal.

use std::ops::Range;

use tracing::{debug, warn};

use super::frames::{frame_rms, frame_zcr};
use crate::config::PreprocessConfig;

/// Energy levels that separate speech frames from background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechThresholds {
    pub noise_floor: f32,
    /// Any frame above this is speech.
    pub loud: f32,
    /// Frames above this are speech when they are also noisy (high ZCR).
    pub weak: f32,
}

impl SpeechThresholds {
    pub fn from_floor(noise_floor: f32, config: &PreprocessConfig) -> Self {
        Self {
            noise_floor,
            loud: (noise_floor * config.loud_floor_multiplier).max(config.loud_threshold_min),
            weak: (noise_floor * config.weak_floor_multiplier).max(config.weak_threshold_min),
        }
    }

    pub fn is_speech(&self, rms: f32, zcr: f32, config: &PreprocessConfig) -> bool {
        rms > self.loud || (rms > self.weak && zcr > config.weak_zcr_min)
    }
}

/// What the trimmer decided for a clip.
#[derive(Debug, Clone, PartialEq)]
pub enum TrimDecision {
    /// Keep this sample range.
    Span(Range<usize>),
    /// Every frame sits at or below the noise floor.
    Silent,
    /// Audible but no frame crossed the speech thresholds; kept whole.
    Quiet,
    /// The speech span was too short to trust; the clip is kept whole.
    TooShort,
    /// The clip is shorter than one analysis frame; kept whole.
    Unframed,
}

/// Noise floor from a client hint when it is plausible, otherwise from a
/// low percentile of the frame energies.
pub fn noise_floor(rms: &[f32], hint: Option<f32>, config: &PreprocessConfig) -> f32 {
    trusted_hint(hint, config)
        .unwrap_or_else(|| percentile(rms, config.noise_floor_percentile))
        .max(config.min_noise_floor)
}

fn trusted_hint(hint: Option<f32>, config: &PreprocessConfig) -> Option<f32> {
    hint.filter(|h| *h > config.min_noise_floor_hint)
}

/// Nearest-rank percentile: the value at index `floor(len * q)` of the
/// sorted input, `q` in [0, 1].
pub fn percentile(values: &[f32], q: f64) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let index = ((sorted.len() as f64 * q.clamp(0.0, 1.0)) as usize).min(sorted.len() - 1);
    sorted[index]
}

/// Decide which part of `samples` holds speech.
pub fn find_speech_span(
    samples: &[f32],
    sample_rate: u32,
    hint: Option<f32>,
    config: &PreprocessConfig,
) -> TrimDecision {
    let frame = ((config.frame_ms / 1000.0) * sample_rate as f64).round() as usize;
    let rms = frame_rms(samples, frame, frame);
    if rms.is_empty() {
        return TrimDecision::Unframed;
    }
    let zcr = frame_zcr(samples, frame, frame);

    let thresholds = SpeechThresholds::from_floor(noise_floor(&rms, hint, config), config);
    debug!(
        noise_floor = thresholds.noise_floor,
        loud = thresholds.loud,
        weak = thresholds.weak,
        "speech thresholds"
    );

    let speech = |i: &usize| thresholds.is_speech(rms[*i], zcr[*i], config);
    let (Some(first), Some(last)) = (
        (0..rms.len()).find(speech),
        (0..rms.len()).rev().find(speech),
    ) else {
        // Only a clip sitting at the floor is empty; quiet but audible takes stay.
        let audible = trusted_hint(hint, config)
            .unwrap_or(0.0)
            .max(config.min_noise_floor);
        return if rms.iter().any(|&r| r > audible) {
            TrimDecision::Quiet
        } else {
            TrimDecision::Silent
        };
    };

    let padding = ((config.padding_ms / 1000.0) * sample_rate as f64).round() as usize;
    let start = (first * frame).saturating_sub(padding);
    let end = ((last + 1) * frame + padding).min(samples.len());
    let min_len = ((config.min_trimmed_ms / 1000.0) * sample_rate as f64).round() as usize;
    if end - start <= min_len {
        return TrimDecision::TooShort;
    }
    TrimDecision::Span(start..end)
}

/// Apply [`find_speech_span`] and return the kept samples.
pub fn trim_silence(
    samples: &[f32],
    sample_rate: u32,
    hint: Option<f32>,
    config: &PreprocessConfig,
) -> Vec<f32> {
    match find_speech_span(samples, sample_rate, hint, config) {
        TrimDecision::Span(range) => samples[range].to_vec(),
        TrimDecision::Silent => {
            warn!(samples = samples.len(), "no speech frames detected; clip is silent");
            Vec::new()
        }
        TrimDecision::Quiet => {
            warn!("no frame crossed the speech thresholds; keeping full clip");
            samples.to_vec()
        }
        TrimDecision::TooShort => {
            warn!("speech span too short to trim safely; keeping full clip");
            samples.to_vec()
        }
        TrimDecision::Unframed => samples.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burst(sample_rate: u32, lead: f64, body: f64, tail: f64) -> Vec<f32> {
        let lead = (lead * sample_rate as f64) as usize;
        let body = (body * sample_rate as f64) as usize;
        let tail = (tail * sample_rate as f64) as usize;
        let mut samples = vec![0.0005_f32; lead];
        samples.extend((0..body).map(|i| {
            0.5 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sample_rate as f32).sin()
        }));
        samples.extend(vec![0.0005_f32; tail]);
        samples
    }

    #[test]
    fn burst_is_kept_with_padding() {
        let config = PreprocessConfig::default();
        let samples = burst(16_000, 0.5, 0.3, 0.5);
        let decision = find_speech_span(&samples, 16_000, None, &config);
        // Speech occupies [8000, 12800); frames are 320 samples, padding 1600.
        assert_eq!(decision, TrimDecision::Span(6400..14400));
    }

    #[test]
    fn trusted_hint_raises_thresholds() {
        let config = PreprocessConfig::default();
        let thresholds = SpeechThresholds::from_floor(noise_floor(&[0.0], Some(0.02), &config), &config);
        assert!((thresholds.loud - 0.04).abs() < 1e-6);
        assert!((thresholds.weak - 0.03).abs() < 1e-6);
    }

    #[test]
    fn implausible_hint_falls_back_to_percentile() {
        let config = PreprocessConfig::default();
        let rms = vec![0.002; 10];
        assert!((noise_floor(&rms, Some(0.00005), &config) - 0.002).abs() < 1e-6);
    }

    #[test]
    fn quiet_noisy_frames_count_as_speech() {
        let config = PreprocessConfig::default();
        let thresholds = SpeechThresholds::from_floor(0.001, &config);
        assert!(thresholds.is_speech(0.008, 0.4, &config));
        assert!(!thresholds.is_speech(0.008, 0.05, &config));
    }

    #[test]
    fn silence_trims_to_nothing() {
        let config = PreprocessConfig::default();
        let samples = vec![0.0004_f32; 16_000];
        assert!(trim_silence(&samples, 16_000, None, &config).is_empty());
    }

    #[test]
    fn percentile_takes_nearest_rank() {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(percentile(&values, 0.1), 1.0);
        assert_eq!(percentile(&values, 0.5), 3.0);
        assert_eq!(percentile(&values, 1.0), 5.0);

        let frames: Vec<f32> = (1..=20).map(|i| i as f32).collect();
        assert_eq!(percentile(&frames, 0.1), 3.0);
    }

    #[test]
    fn quiet_vowel_is_kept_whole() {
        let config = PreprocessConfig::default();
        let samples: Vec<f32> = (0..8_000)
            .map(|i| 0.0005 + 0.02 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 16_000.0).sin())
            .collect();
        assert_eq!(find_speech_span(&samples, 16_000, None, &config), TrimDecision::Quiet);
        assert_eq!(trim_silence(&samples, 16_000, None, &config), samples);
    }

    #[test]
    fn span_of_exactly_the_minimum_is_not_trusted() {
        let config = PreprocessConfig::default();
        // Two loud frames at the start: [0, 640) plus 1600 padding = 2240 samples.
        let mut samples = vec![0.0_f32; 16_000];
        samples[..640].iter_mut().for_each(|s| *s = 0.5);
        assert_eq!(
            find_speech_span(&samples, 16_000, None, &config),
            TrimDecision::Span(0..2240)
        );

        let config = PreprocessConfig {
            min_trimmed_ms: 140.0,
            ..PreprocessConfig::default()
        };
        assert_eq!(find_speech_span(&samples, 16_000, None, &config), TrimDecision::TooShort);
    }
}
