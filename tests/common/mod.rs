#![allow(dead_code)]

use std::collections::HashMap;
use std::f32::consts::PI;
use std::path::Path;

use anyhow::Result;
use vowelyzer::acoustics::{
    AcousticProvider, FormantTrack, IntensityCurve, PitchFrame, PitchTrack,
};
use vowelyzer::types::AudioBuffer;

pub const SAMPLE_RATE: u32 = 16_000;
const FRAME_STEP: f64 = 0.01;

/// What the scripted provider reports for one clip.
#[derive(Debug, Clone, Copy)]
pub struct ClipScript {
    pub voiced: bool,
    /// (F1, F2) under the standard ceiling.
    pub standard: (f64, f64),
    /// (F1, F2) under the lowered ceiling.
    pub lowered: (f64, f64),
}

impl ClipScript {
    pub fn vowel(f1: f64, f2: f64) -> Self {
        Self {
            voiced: true,
            standard: (f1, f2),
            lowered: (f1, f2),
        }
    }

    pub fn lowered_to(mut self, f1: f64, f2: f64) -> Self {
        self.lowered = (f1, f2);
        self
    }

    pub fn unvoiced() -> Self {
        Self {
            voiced: false,
            standard: (f64::NAN, f64::NAN),
            lowered: (f64::NAN, f64::NAN),
        }
    }
}

/// Acoustic provider returning fixed measurements. Clips are told apart by
/// sample count; `fallback` covers any other clip.
#[derive(Debug, Default)]
pub struct ScriptedAcoustics {
    clips: HashMap<usize, ClipScript>,
    fallback: Option<ClipScript>,
}

impl ScriptedAcoustics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clip(mut self, samples: usize, script: ClipScript) -> Self {
        self.clips.insert(samples, script);
        self
    }

    pub fn fallback(mut self, script: ClipScript) -> Self {
        self.fallback = Some(script);
        self
    }

    fn script_for(&self, audio: &AudioBuffer) -> ClipScript {
        self.clips
            .get(&audio.samples.len())
            .copied()
            .or(self.fallback)
            .unwrap_or_else(ClipScript::unvoiced)
    }
}

fn frame_times(audio: &AudioBuffer) -> Vec<f64> {
    let count = (audio.duration() / FRAME_STEP).floor() as usize + 1;
    (0..count).map(|i| i as f64 * FRAME_STEP).collect()
}

impl AcousticProvider for ScriptedAcoustics {
    fn pitch_track(&self, audio: &AudioBuffer, _floor_hz: f64, _ceiling_hz: f64) -> PitchTrack {
        let voiced = self.script_for(audio).voiced;
        PitchTrack::new(
            frame_times(audio)
                .into_iter()
                .map(|time| PitchFrame {
                    time,
                    frequency: voiced.then_some(140.0),
                })
                .collect(),
        )
    }

    fn intensity_curve(&self, audio: &AudioBuffer) -> IntensityCurve {
        IntensityCurve::new(0.0, FRAME_STEP, vec![70.0; frame_times(audio).len()])
    }

    fn formant_track(&self, audio: &AudioBuffer, ceiling_hz: f64) -> FormantTrack {
        let script = self.script_for(audio);
        let (f1, f2) = if ceiling_hz < 5000.0 {
            script.lowered
        } else {
            script.standard
        };
        let frames = frame_times(audio)
            .iter()
            .map(|_| vec![f1, f2, 2500.0, 3500.0, 4500.0])
            .collect();
        FormantTrack::new(0.0, FRAME_STEP, frames)
    }
}

pub fn silent_clip(samples: usize) -> AudioBuffer {
    AudioBuffer::new(vec![0.0; samples], SAMPLE_RATE)
}

/// Silence, a 220 Hz tone, silence.
pub fn tone_burst(lead: f64, body: f64, tail: f64, amplitude: f32) -> Vec<f32> {
    let count = |seconds: f64| (seconds * SAMPLE_RATE as f64).round() as usize;
    let mut samples = vec![0.0_f32; count(lead)];
    samples.extend(
        (0..count(body))
            .map(|i| amplitude * (2.0 * PI * 220.0 * i as f32 / SAMPLE_RATE as f32).sin()),
    );
    samples.extend(vec![0.0_f32; count(tail)]);
    samples
}

pub fn write_wav(path: &Path, samples: &[f32]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

pub fn write_float_wav(path: &Path, samples: &[f32]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
