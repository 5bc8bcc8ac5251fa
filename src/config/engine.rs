//! Tunable thresholds for every stage of the analysis.
//!
//! Defaults reproduce the tuned values used in production; any of them can
//! be overridden from a JSON file where only the changed keys are given.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rate every clip is resampled to before analysis.
    pub target_sample_rate: u32,
    pub preprocess: PreprocessConfig,
    pub nucleus: NucleusConfig,
    pub formants: FormantConfig,
    pub scoring: ScoringConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16_000,
            preprocess: PreprocessConfig::default(),
            nucleus: NucleusConfig::default(),
            formants: FormantConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Run the learner clip through clipping check, trim and normalization.
    pub apply_to_learner: bool,
    /// Absolute amplitude above which a sample counts as saturated.
    pub clip_amplitude: f32,
    /// Fraction of saturated samples that rejects the recording.
    pub max_clip_ratio: f64,
    pub frame_ms: f64,
    /// Client-measured noise floors at or below this are ignored.
    pub min_noise_floor_hint: f32,
    /// Percentile of frame RMS used as the floor when no hint is trusted.
    pub noise_floor_percentile: f64,
    pub min_noise_floor: f32,
    pub loud_floor_multiplier: f32,
    pub loud_threshold_min: f32,
    pub weak_floor_multiplier: f32,
    pub weak_threshold_min: f32,
    pub weak_zcr_min: f32,
    pub padding_ms: f64,
    /// Trimmed spans no longer than this fall back to the untrimmed clip.
    pub min_trimmed_ms: f64,
    pub peak_target: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            apply_to_learner: true,
            clip_amplitude: 0.99,
            max_clip_ratio: 0.005,
            frame_ms: 20.0,
            min_noise_floor_hint: 0.0001,
            noise_floor_percentile: 0.10,
            min_noise_floor: 0.001,
            loud_floor_multiplier: 2.0,
            loud_threshold_min: 0.015,
            weak_floor_multiplier: 1.5,
            weak_threshold_min: 0.005,
            weak_zcr_min: 0.1,
            padding_ms: 100.0,
            min_trimmed_ms: 62.5,
            peak_target: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NucleusConfig {
    pub pitch_floor_hz: f64,
    pub pitch_ceiling_hz: f64,
    /// Voiced runs shorter than this are ignored.
    pub min_voiced_seconds: f64,
}

impl Default for NucleusConfig {
    fn default() -> Self {
        Self {
            pitch_floor_hz: 75.0,
            pitch_ceiling_hz: 600.0,
            min_voiced_seconds: 0.03,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRange {
    pub min_hz: f64,
    pub max_hz: f64,
}

impl FrequencyRange {
    pub const fn new(min_hz: f64, max_hz: f64) -> Self {
        Self { min_hz, max_hz }
    }

    pub fn contains(&self, hz: f64) -> bool {
        hz.is_finite() && hz >= self.min_hz && hz <= self.max_hz
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormantConfig {
    pub standard_ceiling_hz: f64,
    /// Lower ceiling used when a back vowel's F2 looks like F3.
    pub retry_ceiling_hz: f64,
    pub f1_range: FrequencyRange,
    pub f2_range: FrequencyRange,
    pub learner_retry_threshold_hz: f64,
    pub reference_retry_threshold_hz: f64,
}

impl Default for FormantConfig {
    fn default() -> Self {
        Self {
            standard_ceiling_hz: 5500.0,
            retry_ceiling_hz: 4000.0,
            f1_range: FrequencyRange::new(50.0, 1200.0),
            f2_range: FrequencyRange::new(200.0, 4000.0),
            learner_retry_threshold_hz: 1500.0,
            reference_retry_threshold_hz: 1600.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Bark distances strictly above this are flagged as outliers.
    pub outlier_bark: f64,
    pub f1_feedback_hz: f64,
    pub f2_feedback_hz: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            outlier_bark: 5.0,
            f1_feedback_hz: 50.0,
            f2_feedback_hz: 100.0,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| AnalysisError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require(self.target_sample_rate > 0, "target_sample_rate must be positive")?;

        let pre = &self.preprocess;
        require(
            pre.clip_amplitude > 0.0 && pre.clip_amplitude <= 1.0,
            "preprocess.clip_amplitude must be in (0, 1]",
        )?;
        require(
            (0.0..=1.0).contains(&pre.max_clip_ratio),
            "preprocess.max_clip_ratio must be in [0, 1]",
        )?;
        require(pre.frame_ms > 0.0, "preprocess.frame_ms must be positive")?;
        require(
            (0.0..=1.0).contains(&pre.noise_floor_percentile),
            "preprocess.noise_floor_percentile must be in [0, 1]",
        )?;
        require(pre.padding_ms >= 0.0, "preprocess.padding_ms must be non-negative")?;
        require(
            pre.peak_target > 0.0 && pre.peak_target <= 1.0,
            "preprocess.peak_target must be in (0, 1]",
        )?;

        let nucleus = &self.nucleus;
        require(
            nucleus.pitch_floor_hz > 0.0 && nucleus.pitch_ceiling_hz > nucleus.pitch_floor_hz,
            "nucleus pitch ceiling must exceed a positive pitch floor",
        )?;
        require(
            nucleus.min_voiced_seconds >= 0.0,
            "nucleus.min_voiced_seconds must be non-negative",
        )?;

        let formants = &self.formants;
        require(
            formants.standard_ceiling_hz > 0.0 && formants.retry_ceiling_hz > 0.0,
            "formant ceilings must be positive",
        )?;
        require(
            formants.f1_range.min_hz < formants.f1_range.max_hz
                && formants.f2_range.min_hz < formants.f2_range.max_hz,
            "formant plausibility ranges must have min < max",
        )?;

        require(
            self.scoring.outlier_bark > 0.0,
            "scoring.outlier_bark must be positive",
        )?;
        Ok(())
    }
}

fn require(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(AnalysisError::InvalidConfig(message.to_string()))
    }
}
