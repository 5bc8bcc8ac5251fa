//! F1/F2 sampling inside the nucleus, with the low-ceiling retry for back
//! vowels.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::vowel::VowelClass;
use crate::acoustics::AcousticProvider;
use crate::config::{FormantConfig, FrequencyRange};
use crate::types::{AudioBuffer, FormantPair, Measurement, VoicedInterval};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipRole {
    Learner,
    Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormantMeasurement {
    pub points: Measurement,
    /// The low-ceiling pass replaced the standard one.
    pub ceiling_retried: bool,
}

impl FormantMeasurement {
    /// All-NaN measurement with one pair per sampling point.
    pub fn undefined(vowel: &VowelClass) -> Self {
        Self {
            points: vec![FormantPair::UNDEFINED; vowel.sampling_points().len()],
            ceiling_retried: false,
        }
    }

    pub fn primary(&self) -> FormantPair {
        self.points.first().copied().unwrap_or(FormantPair::UNDEFINED)
    }
}

pub struct FormantExtractor<'a, P> {
    provider: &'a P,
    config: &'a FormantConfig,
}

impl<'a, P: AcousticProvider> FormantExtractor<'a, P> {
    pub fn new(provider: &'a P, config: &'a FormantConfig) -> Self {
        Self { provider, config }
    }

    pub fn extract(
        &self,
        audio: &AudioBuffer,
        interval: Option<VoicedInterval>,
        vowel: &VowelClass,
        role: ClipRole,
    ) -> FormantMeasurement {
        let Some(interval) = interval else {
            return FormantMeasurement::undefined(vowel);
        };
        let times: Vec<f64> = vowel
            .sampling_points()
            .iter()
            .map(|&offset| interval.time_at(offset))
            .collect();

        let standard = self.sample(audio, &times, self.config.standard_ceiling_hz);
        if !self.needs_retry(vowel, standard[0], role) {
            return FormantMeasurement {
                points: standard,
                ceiling_retried: false,
            };
        }

        let retried = self.sample(audio, &times, self.config.retry_ceiling_hz);
        debug!(
            ?role,
            standard_f2 = standard[0].f2,
            retried_f2 = retried[0].f2,
            "back vowel re-measured with lower ceiling"
        );
        FormantMeasurement {
            points: retried,
            ceiling_retried: true,
        }
    }

    /// Retry only back vowels whose primary F2 is missing or suspiciously high.
    pub fn needs_retry(&self, vowel: &VowelClass, primary: FormantPair, role: ClipRole) -> bool {
        if !vowel.is_back {
            return false;
        }
        let threshold = match role {
            ClipRole::Learner => self.config.learner_retry_threshold_hz,
            ClipRole::Reference => self.config.reference_retry_threshold_hz,
        };
        primary.f2.is_nan() || primary.f2 > threshold
    }

    fn sample(&self, audio: &AudioBuffer, times: &[f64], ceiling_hz: f64) -> Measurement {
        let track = self.provider.formant_track(audio, ceiling_hz);
        times
            .iter()
            .map(|&t| {
                let plausible = |number: usize, range: &FrequencyRange| {
                    track
                        .value_at(number, t)
                        .filter(|hz| range.contains(*hz))
                        .unwrap_or(f64::NAN)
                };
                FormantPair::new(
                    plausible(1, &self.config.f1_range),
                    plausible(2, &self.config.f2_range),
                )
            })
            .collect()
    }
}
