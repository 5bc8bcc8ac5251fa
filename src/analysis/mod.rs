//! The `analyze` operation: learner clip plus reference clip in, scored
//! [`AnalysisResult`] out.

pub mod distance;
pub mod feedback;
pub mod formants;
pub mod nucleus;
pub mod vowel;
pub mod vtln;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::acoustics::{AcousticProvider, PraatAcoustics};
use crate::audio::loader::load_and_resample;
use crate::config::EngineConfig;
use crate::error::{AnalysisError, Result};
use crate::preprocess::{peak_normalize, Preprocessor};
use crate::types::{AudioBuffer, FormantPair, VoicedInterval};

use feedback::{Feedback, ScoreCard};
use formants::{ClipRole, FormantExtractor, FormantMeasurement};
use nucleus::NucleusLocator;
use vowel::{VowelClass, VowelKind};

/// Persisted outcome of one analysis. Values that could not be measured are
/// `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub f1_raw: Option<f64>,
    pub f2_raw: Option<f64>,
    pub f1_ref: Option<f64>,
    pub f2_ref: Option<f64>,
    pub scaling_factor: Option<f64>,
    pub f1_norm: Option<f64>,
    pub f2_norm: Option<f64>,
    pub distance_hz: Option<f64>,
    pub distance_bark: Option<f64>,
    pub is_deep_voice_corrected: bool,
    pub is_outlier: bool,
}

fn nullable(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn pair(f1: Option<f64>, f2: Option<f64>) -> FormantPair {
    FormantPair::new(f1.unwrap_or(f64::NAN), f2.unwrap_or(f64::NAN))
}

impl AnalysisResult {
    pub fn raw(&self) -> FormantPair {
        pair(self.f1_raw, self.f2_raw)
    }

    pub fn reference(&self) -> FormantPair {
        pair(self.f1_ref, self.f2_ref)
    }

    pub fn normalized(&self) -> FormantPair {
        pair(self.f1_norm, self.f2_norm)
    }

    /// Ratios this result contributes to its speaker's scaling factor.
    pub fn ratios(&self) -> Vec<f64> {
        vtln::pair_ratios(self.raw(), self.reference())
    }
}

/// What was measured in one clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipMeasurement {
    pub nucleus: Option<VoicedInterval>,
    #[serde(flatten)]
    pub formants: FormantMeasurement,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub vowel: String,
    pub vowel_kind: VowelKind,
    pub result: AnalysisResult,
    pub learner: ClipMeasurement,
    /// `None` when the reference clip was missing.
    pub reference: Option<ClipMeasurement>,
    pub feedback: Feedback,
    pub score_card: Option<ScoreCard>,
}

/// Runs the full pipeline over a pair of clips.
pub struct Analyzer<P = PraatAcoustics> {
    provider: P,
    config: EngineConfig,
    preprocessor: Preprocessor,
}

impl Analyzer<PraatAcoustics> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_provider(config, PraatAcoustics::default())
    }
}

impl<P: AcousticProvider> Analyzer<P> {
    pub fn with_provider(config: EngineConfig, provider: P) -> Self {
        let preprocessor = Preprocessor::new(&config);
        Self {
            provider,
            config,
            preprocessor,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Score a learner recording against a reference recording.
    ///
    /// `history` holds the speaker's earlier results; it feeds the scaling
    /// factor and must not contain a result for this same recording.
    pub fn analyze(
        &self,
        student_path: &Path,
        reference_path: &Path,
        vowel: &str,
        history: &[AnalysisResult],
        noise_floor_hint: Option<f32>,
    ) -> Result<AnalysisReport> {
        let learner_audio = self.load_learner(student_path, noise_floor_hint)?;
        let reference_audio = self.load_reference(reference_path)?;
        Ok(self.analyze_audio(
            &learner_audio,
            reference_audio.as_ref(),
            vowel,
            history,
        ))
    }

    /// Same as [`Analyzer::analyze`] for audio that is already loaded and
    /// standardized.
    pub fn analyze_audio(
        &self,
        learner_audio: &AudioBuffer,
        reference_audio: Option<&AudioBuffer>,
        vowel: &str,
        history: &[AnalysisResult],
    ) -> AnalysisReport {
        let class = VowelClass::classify(vowel);
        let learner = self.measure(learner_audio, &class, ClipRole::Learner);
        let reference = reference_audio.map(|audio| self.measure(audio, &class, ClipRole::Reference));
        let reference_points = reference
            .as_ref()
            .map(|clip| clip.formants.clone())
            .unwrap_or_else(|| FormantMeasurement::undefined(&class));

        let raw = learner.formants.primary();
        let target = reference_points.primary();
        let historical: Vec<f64> = history.iter().flat_map(AnalysisResult::ratios).collect();
        let alpha = vtln::scaling_factor(&vtln::pair_ratios(raw, target), &historical);

        let normalized: Vec<FormantPair> = learner
            .formants
            .points
            .iter()
            .map(|p| p.scaled_down(alpha))
            .collect();
        let scoring = &self.config.scoring;
        let distance = distance::score(&normalized, &reference_points.points, scoring.outlier_bark);
        let primary_norm = raw.scaled_down(alpha);

        let result = AnalysisResult {
            f1_raw: nullable(raw.f1),
            f2_raw: nullable(raw.f2),
            f1_ref: nullable(target.f1),
            f2_ref: nullable(target.f2),
            scaling_factor: nullable(alpha),
            f1_norm: nullable(primary_norm.f1),
            f2_norm: nullable(primary_norm.f2),
            distance_hz: nullable(distance.hz),
            distance_bark: nullable(distance.bark),
            is_deep_voice_corrected: learner.formants.ceiling_retried,
            is_outlier: distance.is_outlier,
        };
        info!(
            vowel,
            alpha,
            history_ratios = historical.len(),
            distance_hz = distance.hz,
            distance_bark = distance.bark,
            outlier = distance.is_outlier,
            deep_voice_corrected = result.is_deep_voice_corrected,
            "analysis complete"
        );

        AnalysisReport {
            vowel: vowel.to_string(),
            vowel_kind: class.kind,
            feedback: feedback::articulatory_feedback(primary_norm, target, scoring),
            score_card: feedback::score_card(distance.bark, primary_norm, target, scoring),
            result,
            learner,
            reference,
        }
    }

    /// Locate the nucleus and measure formants in one clip.
    pub fn measure(&self, audio: &AudioBuffer, vowel: &VowelClass, role: ClipRole) -> ClipMeasurement {
        let nucleus = NucleusLocator::new(&self.provider, &self.config.nucleus).locate(audio);
        let formants = FormantExtractor::new(&self.provider, &self.config.formants)
            .extract(audio, nucleus, vowel, role);
        ClipMeasurement { nucleus, formants }
    }

    /// Decode the learner clip and standardize it. Clipping is rejected here.
    pub fn load_learner(&self, path: &Path, noise_floor_hint: Option<f32>) -> Result<AudioBuffer> {
        if !path.exists() {
            return Err(AnalysisError::MissingStudentFile(path.to_path_buf()));
        }
        let audio = load_and_resample(path, self.config.target_sample_rate)
            .map_err(|err| AnalysisError::unreadable(path.display().to_string(), err))?;
        if self.config.preprocess.apply_to_learner {
            self.preprocessor.standardize(audio, noise_floor_hint)
        } else {
            Ok(normalized(audio, self.config.preprocess.peak_target))
        }
    }

    /// Decode the reference clip; a missing file yields `None`.
    pub fn load_reference(&self, path: &Path) -> Result<Option<AudioBuffer>> {
        if !path.exists() {
            warn!(path = %path.display(), "reference clip missing; reference formants undefined");
            return Ok(None);
        }
        let audio = load_and_resample(path, self.config.target_sample_rate)
            .map_err(|err| AnalysisError::unreadable(path.display().to_string(), err))?;
        Ok(Some(normalized(audio, self.config.preprocess.peak_target)))
    }
}

fn normalized(mut audio: AudioBuffer, peak_target: f32) -> AudioBuffer {
    peak_normalize(&mut audio.samples, peak_target);
    audio
}
