use anyhow::{ensure, Result};
use std::f32::consts::PI;

const ANTI_ALIAS_HALF_TAPS: usize = 32;

/// Linearly resample `samples` from `source_rate` to `target_rate`.
///
/// When downsampling, a windowed-sinc lowpass at the new Nyquist frequency is
/// applied first so high-frequency energy does not fold into the formant band.
pub fn linear_resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    ensure!(source_rate > 0, "source sample rate must be positive");
    ensure!(target_rate > 0, "target sample rate must be positive");
    if samples.is_empty() || source_rate == target_rate {
        return Ok(samples.to_vec());
    }

    let filtered;
    let input = if target_rate < source_rate {
        let cutoff = 0.5 * target_rate as f32 / source_rate as f32;
        filtered = lowpass(samples, cutoff);
        filtered.as_slice()
    } else {
        samples
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = ((input.len() as f64) * ratio).ceil().max(1.0) as usize;
    let mut output = Vec::with_capacity(output_len);
    let last_index = input.len() - 1;
    for i in 0..output_len {
        let position = i as f64 / ratio;
        let left = (position.floor() as usize).min(last_index);
        let right = (left + 1).min(last_index);
        let t = (position - left as f64) as f32;
        output.push(input[left] * (1.0 - t) + input[right] * t);
    }
    Ok(output)
}

/// Hann-windowed sinc FIR; `cutoff` is in cycles per sample (0, 0.5].
fn lowpass(samples: &[f32], cutoff: f32) -> Vec<f32> {
    let half = ANTI_ALIAS_HALF_TAPS as isize;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|k| {
            let x = k as f32;
            let sinc = if k == 0 {
                2.0 * cutoff
            } else {
                (2.0 * PI * cutoff * x).sin() / (PI * x)
            };
            let window = 0.5 + 0.5 * (PI * x / (half as f32 + 1.0)).cos();
            sinc * window
        })
        .collect();
    let gain: f32 = kernel.iter().sum();
    if gain.abs() > f32::EPSILON {
        kernel.iter_mut().for_each(|tap| *tap /= gain);
    }

    let len = samples.len() as isize;
    (0..len)
        .map(|n| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(j, tap)| {
                    let idx = n + j as isize - half;
                    (0..len).contains(&idx).then(|| tap * samples[idx as usize])
                })
                .sum::<f32>()
        })
        .collect()
}
