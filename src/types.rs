//! Core value types shared across the analysis pipeline

use serde::{Deserialize, Serialize};

/// Mono audio samples at a known rate.
///
/// Samples are expected in [-1.0, 1.0]. An empty buffer is valid and means
/// no usable audio survived preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g., 16000)
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }

    /// Samples widened to f64 for the acoustic primitives.
    pub fn to_f64(&self) -> Vec<f64> {
        self.samples.iter().map(|&s| s as f64).collect()
    }
}

/// The selected vowel nucleus, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoicedInterval {
    pub start: f64,
    pub end: f64,
}

impl VoicedInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Absolute time at a relative offset (0.0 = start, 1.0 = end).
    pub fn time_at(&self, offset: f64) -> f64 {
        self.start + offset * self.duration()
    }
}

/// First and second formant in Hz; NaN marks a failed measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormantPair {
    pub f1: f64,
    pub f2: f64,
}

impl FormantPair {
    pub const UNDEFINED: FormantPair = FormantPair {
        f1: f64::NAN,
        f2: f64::NAN,
    };

    pub fn new(f1: f64, f2: f64) -> Self {
        Self { f1, f2 }
    }

    pub fn is_complete(&self) -> bool {
        self.f1.is_finite() && self.f2.is_finite()
    }

    pub fn scaled_down(&self, alpha: f64) -> Self {
        Self {
            f1: self.f1 / alpha,
            f2: self.f2 / alpha,
        }
    }
}

/// One formant pair per sampling point: one for a monophthong, two for a
/// diphthong.
pub type Measurement = Vec<FormantPair>;
