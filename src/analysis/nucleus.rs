//! Locates the loudest sustained voiced stretch of a clip.

use tracing::debug;

use crate::acoustics::{AcousticProvider, IntensityCurve, PitchTrack};
use crate::config::NucleusConfig;
use crate::types::{AudioBuffer, VoicedInterval};

/// Maximal runs of voiced frames.
///
/// A run ends at the time of the first unvoiced frame after it; a run still
/// open at the end of the track ends at the last frame.
pub fn voiced_runs(track: &PitchTrack) -> Vec<VoicedInterval> {
    let mut runs = Vec::new();
    let mut open: Option<f64> = None;
    for frame in &track.frames {
        match (frame.is_voiced(), open) {
            (true, None) => open = Some(frame.time),
            (false, Some(start)) => {
                runs.push(VoicedInterval::new(start, frame.time));
                open = None;
            }
            _ => {}
        }
    }
    if let (Some(start), Some(last)) = (open, track.frames.last()) {
        runs.push(VoicedInterval::new(start, last.time));
    }
    runs
}

/// Run with the highest peak intensity; earlier runs win ties.
pub fn select_loudest(
    runs: &[VoicedInterval],
    intensity: &IntensityCurve,
) -> Option<VoicedInterval> {
    let mut best: Option<(VoicedInterval, f64)> = None;
    for run in runs {
        let Some(peak) = intensity.max_in_interval(run.start, run.end) else {
            continue;
        };
        if best.map_or(true, |(_, loudest)| peak > loudest) {
            best = Some((*run, peak));
        }
    }
    best.map(|(run, _)| run)
}

pub struct NucleusLocator<'a, P> {
    provider: &'a P,
    config: &'a NucleusConfig,
}

impl<'a, P: AcousticProvider> NucleusLocator<'a, P> {
    pub fn new(provider: &'a P, config: &'a NucleusConfig) -> Self {
        Self { provider, config }
    }

    pub fn locate(&self, audio: &AudioBuffer) -> Option<VoicedInterval> {
        if audio.is_empty() {
            return None;
        }
        let pitch = self.provider.pitch_track(
            audio,
            self.config.pitch_floor_hz,
            self.config.pitch_ceiling_hz,
        );
        let runs: Vec<VoicedInterval> = voiced_runs(&pitch)
            .into_iter()
            .filter(|run| run.duration() >= self.config.min_voiced_seconds)
            .collect();
        if runs.is_empty() {
            debug!(frames = pitch.frames.len(), "no voiced run long enough for a nucleus");
            return None;
        }
        let intensity = self.provider.intensity_curve(audio);
        let nucleus = select_loudest(&runs, &intensity);
        debug!(candidates = runs.len(), ?nucleus, "nucleus selected");
        nucleus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acoustics::PitchFrame;

    fn track(voicing: &[bool]) -> PitchTrack {
        PitchTrack::new(
            voicing
                .iter()
                .enumerate()
                .map(|(i, &voiced)| PitchFrame {
                    time: i as f64 * 0.01,
                    frequency: voiced.then_some(150.0),
                })
                .collect(),
        )
    }

    #[test]
    fn runs_end_at_first_unvoiced_frame() {
        let runs = voiced_runs(&track(&[false, true, true, false, true, true, true]));
        assert_eq!(runs.len(), 2);
        assert!((runs[0].start - 0.01).abs() < 1e-12);
        assert!((runs[0].end - 0.03).abs() < 1e-12);
        assert!((runs[1].start - 0.04).abs() < 1e-12);
        assert!((runs[1].end - 0.06).abs() < 1e-12);
    }

    #[test]
    fn loudest_run_wins_over_longest() {
        let runs = [VoicedInterval::new(0.0, 0.3), VoicedInterval::new(0.4, 0.45)];
        let mut values = vec![60.0; 50];
        values[42] = 80.0;
        let curve = IntensityCurve::new(0.0, 0.01, values);
        assert_eq!(select_loudest(&runs, &curve), Some(runs[1]));
    }

    #[test]
    fn no_runs_means_no_nucleus() {
        assert!(voiced_runs(&track(&[false, false])).is_empty());
        assert_eq!(select_loudest(&[], &IntensityCurve::default()), None);
    }
}
