//! Acoustic primitives consumed by the nucleus locator and formant
//! extractor.
//!
//! [`AcousticProvider`] is the seam: analysis code only sees pitch tracks,
//! intensity curves and formant tracks, so tests can script them directly.
//! [`PraatAcoustics`] is the real implementation (autocorrelation pitch,
//! Kaiser-windowed intensity, Burg LPC formants).

mod formant;
mod intensity;
mod lpc;
mod pitch;

pub use formant::FormantSettings;
pub use intensity::IntensitySettings;
pub use pitch::PitchSettings;

use crate::types::AudioBuffer;

/// Capability boundary for the three measurements the analysis needs.
pub trait AcousticProvider {
    fn pitch_track(&self, audio: &AudioBuffer, floor_hz: f64, ceiling_hz: f64) -> PitchTrack;
    fn intensity_curve(&self, audio: &AudioBuffer) -> IntensityCurve;
    fn formant_track(&self, audio: &AudioBuffer, ceiling_hz: f64) -> FormantTrack;
}

impl<P: AcousticProvider + ?Sized> AcousticProvider for &P {
    fn pitch_track(&self, audio: &AudioBuffer, floor_hz: f64, ceiling_hz: f64) -> PitchTrack {
        (**self).pitch_track(audio, floor_hz, ceiling_hz)
    }

    fn intensity_curve(&self, audio: &AudioBuffer) -> IntensityCurve {
        (**self).intensity_curve(audio)
    }

    fn formant_track(&self, audio: &AudioBuffer, ceiling_hz: f64) -> FormantTrack {
        (**self).formant_track(audio, ceiling_hz)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchFrame {
    pub time: f64,
    /// `None` when the frame is unvoiced.
    pub frequency: Option<f64>,
}

impl PitchFrame {
    pub fn is_voiced(&self) -> bool {
        matches!(self.frequency, Some(f) if f > 0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchTrack {
    pub frames: Vec<PitchFrame>,
}

impl PitchTrack {
    pub fn new(frames: Vec<PitchFrame>) -> Self {
        Self { frames }
    }

    pub fn voiced_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_voiced()).count()
    }
}

/// Intensity in dB sampled on a regular time grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntensityCurve {
    pub start_time: f64,
    pub time_step: f64,
    pub values: Vec<f64>,
}

impl IntensityCurve {
    pub fn new(start_time: f64, time_step: f64, values: Vec<f64>) -> Self {
        Self {
            start_time,
            time_step,
            values,
        }
    }

    /// Linear interpolation between frames, clamped at the ends.
    pub fn value_at(&self, time: f64) -> Option<f64> {
        let last = self.values.len().checked_sub(1)?;
        let position = ((time - self.start_time) / self.time_step).clamp(0.0, last as f64);
        let left = position.floor() as usize;
        let right = (left + 1).min(last);
        let frac = position - left as f64;
        Some(self.values[left] * (1.0 - frac) + self.values[right] * frac)
    }

    /// Peak intensity in `[t0, t1]`, refined by parabolic interpolation around
    /// interior maxima. Interval edges are included via interpolation so even
    /// intervals shorter than one frame get a value.
    pub fn max_in_interval(&self, t0: f64, t1: f64) -> Option<f64> {
        let mut best = self.value_at(t0)?.max(self.value_at(t1)?);
        if self.time_step <= 0.0 {
            return Some(best);
        }

        let n = self.values.len();
        let first = ((t0 - self.start_time) / self.time_step).ceil().max(0.0) as usize;
        let last = ((t1 - self.start_time) / self.time_step).floor();
        if last < 0.0 {
            return Some(best);
        }
        let last = (last as usize).min(n - 1);

        for i in first..=last {
            let y = self.values[i];
            let mut peak = y;
            if i > 0 && i + 1 < n {
                let (l, r) = (self.values[i - 1], self.values[i + 1]);
                if y > l && y >= r {
                    peak = parabolic_peak(l, y, r);
                }
            }
            best = best.max(peak);
        }
        Some(best)
    }
}

/// Height of the parabola through three equally spaced points.
pub fn parabolic_peak(left: f64, mid: f64, right: f64) -> f64 {
    let dy = 0.5 * (right - left);
    let d2y = 2.0 * mid - left - right;
    if d2y > 0.0 {
        mid + 0.5 * dy * dy / d2y
    } else {
        mid
    }
}

/// Formant frequencies per analysis frame; index 0 of each frame is F1.
/// Undefined formants are NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormantTrack {
    pub start_time: f64,
    pub time_step: f64,
    pub frames: Vec<Vec<f64>>,
}

impl FormantTrack {
    pub fn new(start_time: f64, time_step: f64, frames: Vec<Vec<f64>>) -> Self {
        Self {
            start_time,
            time_step,
            frames,
        }
    }

    /// Formant `number` (1 = F1) at `time`, linearly interpolated between the
    /// two nearest frames. Undefined if either frame lacks that formant or the
    /// time falls more than half a frame outside the track.
    pub fn value_at(&self, number: usize, time: f64) -> Option<f64> {
        if number == 0 || self.frames.is_empty() || self.time_step <= 0.0 {
            return None;
        }
        let n = self.frames.len();
        let position = (time - self.start_time) / self.time_step;
        if position < -0.5 || position > n as f64 - 0.5 {
            return None;
        }
        let position = position.clamp(0.0, (n - 1) as f64);
        let left = position.floor() as usize;
        let right = (left + 1).min(n - 1);
        let frac = position - left as f64;

        let at = |frame: usize| {
            self.frames[frame]
                .get(number - 1)
                .copied()
                .filter(|f| f.is_finite())
        };
        let left_value = at(left)?;
        if frac == 0.0 || left == right {
            return Some(left_value);
        }
        let right_value = at(right)?;
        Some(left_value * (1.0 - frac) + right_value * frac)
    }
}

/// Production acoustic analysis.
#[derive(Debug, Clone, Default)]
pub struct PraatAcoustics {
    pub pitch: PitchSettings,
    pub intensity: IntensitySettings,
    pub formants: FormantSettings,
}

impl AcousticProvider for PraatAcoustics {
    fn pitch_track(&self, audio: &AudioBuffer, floor_hz: f64, ceiling_hz: f64) -> PitchTrack {
        pitch::track_pitch(
            &audio.to_f64(),
            audio.sample_rate as f64,
            floor_hz,
            ceiling_hz,
            &self.pitch,
        )
    }

    fn intensity_curve(&self, audio: &AudioBuffer) -> IntensityCurve {
        intensity::intensity_curve(&audio.to_f64(), audio.sample_rate as f64, &self.intensity)
    }

    fn formant_track(&self, audio: &AudioBuffer, ceiling_hz: f64) -> FormantTrack {
        formant::track_formants(audio, ceiling_hz, &self.formants)
    }
}
