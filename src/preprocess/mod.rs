//! Intake standardization of learner recordings.
//!
//! Decoding, resampling, the clipping gate, adaptive silence trimming and
//! peak normalization. Clipping is the only failure surfaced to the caller;
//! anything else unexpected hands the original bytes back untouched, tagged
//! as [`PreprocessOutcome::Unprocessed`].

pub mod frames;
pub mod trim;

use std::path::Path;

use tracing::{info, warn};

use crate::audio::loader::load_bytes_and_resample;
use crate::config::{EngineConfig, PreprocessConfig};
use crate::error::{AnalysisError, Result};
use crate::types::AudioBuffer;

#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessOutcome {
    Processed(AudioBuffer),
    /// Standardization failed for a reason other than clipping.
    Unprocessed { original: Vec<u8>, reason: String },
}

impl PreprocessOutcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }
}

#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessConfig,
    target_rate: u32,
}

impl Preprocessor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.preprocess.clone(),
            target_rate: config.target_sample_rate,
        }
    }

    /// Standardize raw uploaded bytes.
    pub fn process_bytes(
        &self,
        bytes: Vec<u8>,
        extension: Option<&str>,
        noise_floor_hint: Option<f32>,
    ) -> Result<PreprocessOutcome> {
        let decoded = match load_bytes_and_resample(&bytes, extension, self.target_rate) {
            Ok(decoded) => decoded,
            Err(err) => return Ok(unprocessed(bytes, format!("{err:#}"))),
        };
        if decoded.is_empty() {
            return Ok(unprocessed(bytes, "decoded audio is empty".to_string()));
        }
        let standardized = self.standardize(decoded, noise_floor_hint)?;
        if standardized.samples.iter().any(|s| !s.is_finite()) {
            return Ok(unprocessed(bytes, "normalized samples are not finite".to_string()));
        }
        Ok(PreprocessOutcome::Processed(standardized))
    }

    pub fn process_path(
        &self,
        path: &Path,
        noise_floor_hint: Option<f32>,
    ) -> Result<PreprocessOutcome> {
        let bytes = std::fs::read(path)?;
        let extension = path.extension().and_then(|e| e.to_str());
        self.process_bytes(bytes, extension, noise_floor_hint)
    }

    /// Clipping gate, silence trim and peak normalization on decoded audio.
    pub fn standardize(
        &self,
        audio: AudioBuffer,
        noise_floor_hint: Option<f32>,
    ) -> Result<AudioBuffer> {
        let ratio = clip_ratio(&audio.samples, self.config.clip_amplitude);
        if ratio > self.config.max_clip_ratio {
            warn!(ratio, "recording rejected for clipping");
            return Err(AnalysisError::ClippingDetected { ratio });
        }

        let original_len = audio.samples.len();
        let mut samples =
            trim::trim_silence(&audio.samples, audio.sample_rate, noise_floor_hint, &self.config);
        peak_normalize(&mut samples, self.config.peak_target);
        info!(
            original_len,
            trimmed_len = samples.len(),
            sample_rate = audio.sample_rate,
            "recording standardized"
        );
        Ok(AudioBuffer::new(samples, audio.sample_rate))
    }
}

fn unprocessed(original: Vec<u8>, reason: String) -> PreprocessOutcome {
    warn!(%reason, "preprocessing skipped; keeping original bytes");
    PreprocessOutcome::Unprocessed { original, reason }
}

/// Fraction of samples whose magnitude exceeds `amplitude`.
pub fn clip_ratio(samples: &[f32], amplitude: f32) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let clipped = samples.iter().filter(|s| s.abs() > amplitude).count();
    clipped as f64 / samples.len() as f64
}

/// Scale so the largest magnitude equals `target`. Silent input is untouched.
pub fn peak_normalize(samples: &mut [f32], target: f32) {
    let peak = samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
    if peak > 0.0 {
        let gain = target / peak;
        samples.iter_mut().for_each(|s| *s *= gain);
    }
}
