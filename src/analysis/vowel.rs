//! Vowel symbol classification for the curated target-accent inventory.

use serde::{Deserialize, Serialize};

/// Symbols that glide between two targets.
pub const DIPHTHONGS: [&str; 8] = ["aɪ", "əʊ", "ɔɪ", "eɪ", "eə", "aʊ", "ɪə", "ʊə"];

/// Vowels whose low F2 is easily mistaken for F3 under a wide ceiling.
pub const BACK_VOWELS: [&str; 8] = ["uː", "ʊ", "ɔː", "ɒ", "ɑː", "əʊ", "ɔɪ", "aʊ"];

const MONOPHTHONG_POINTS: [f64; 1] = [0.5];
const DIPHTHONG_POINTS: [f64; 2] = [0.2, 0.8];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VowelKind {
    Monophthong,
    Diphthong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VowelClass {
    pub kind: VowelKind,
    pub is_back: bool,
}

impl VowelClass {
    pub fn classify(symbol: &str) -> Self {
        let unbracketed: String = symbol
            .trim()
            .chars()
            .filter(|c| !matches!(c, '(' | ')'))
            .collect();
        let core: String = unbracketed.chars().filter(|&c| c != 'ː').collect();

        let kind = if DIPHTHONGS.contains(&core.as_str()) || core.chars().count() > 1 {
            VowelKind::Diphthong
        } else {
            VowelKind::Monophthong
        };
        Self {
            kind,
            // Matched on the symbol as written: a bracketed back vowel marks an
            // optional sound and is not re-measured.
            is_back: BACK_VOWELS.contains(&symbol.trim()),
        }
    }

    /// Relative offsets inside the nucleus where formants are sampled.
    pub fn sampling_points(&self) -> &'static [f64] {
        match self.kind {
            VowelKind::Monophthong => &MONOPHTHONG_POINTS,
            VowelKind::Diphthong => &DIPHTHONG_POINTS,
        }
    }
}
