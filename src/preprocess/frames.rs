//! Frame-level energy and zero-crossing measures.
//!
//! Frames start at `i * hop` and only whole frames are produced, so a signal
//! shorter than one frame yields no frames at all.

pub fn frame_count(len: usize, frame: usize, hop: usize) -> usize {
    if frame == 0 || hop == 0 || len < frame {
        return 0;
    }
    1 + (len - frame) / hop
}

/// Root-mean-square amplitude of each frame.
pub fn frame_rms(samples: &[f32], frame: usize, hop: usize) -> Vec<f32> {
    (0..frame_count(samples.len(), frame, hop))
        .map(|i| {
            let window = &samples[i * hop..i * hop + frame];
            let energy: f32 = window.iter().map(|s| s * s).sum();
            (energy / frame as f32).sqrt()
        })
        .collect()
}

/// Fraction of adjacent sample pairs in each frame whose sign differs.
///
/// Zero counts as positive.
pub fn frame_zcr(samples: &[f32], frame: usize, hop: usize) -> Vec<f32> {
    (0..frame_count(samples.len(), frame, hop))
        .map(|i| {
            let window = &samples[i * hop..i * hop + frame];
            let crossings = window
                .windows(2)
                .filter(|pair| (pair[0] < 0.0) != (pair[1] < 0.0))
                .count();
            crossings as f32 / frame as f32
        })
        .collect()
}
