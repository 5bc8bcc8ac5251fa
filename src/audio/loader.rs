//! Decode-and-resample entry points used by every stage that needs audio.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::decoder::{decode_audio, decode_bytes};
use super::resample::linear_resample;
use crate::types::AudioBuffer;

/// Decode a file, mix to mono and resample to `target_rate`.
pub fn load_and_resample<P: AsRef<Path>>(path: P, target_rate: u32) -> Result<AudioBuffer> {
    let decoded = decode_audio(path.as_ref())?;
    resample_to(decoded, target_rate)
}

/// Same as [`load_and_resample`] for bytes already in memory.
pub fn load_bytes_and_resample(
    bytes: &[u8],
    extension: Option<&str>,
    target_rate: u32,
) -> Result<AudioBuffer> {
    let decoded = decode_bytes(bytes, extension).context("Failed to decode audio bytes")?;
    resample_to(decoded, target_rate)
}

fn resample_to(decoded: AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
    debug!(
        samples = decoded.samples.len(),
        source_rate = decoded.sample_rate,
        target_rate,
        "resampling decoded audio"
    );
    let samples = linear_resample(&decoded.samples, decoded.sample_rate, target_rate)
        .context("Failed to resample audio")?;
    Ok(AudioBuffer::new(samples, target_rate))
}
