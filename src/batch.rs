//! Cohort export: walk a directory of learner recordings named
//! `<id>_<name parts>_<word>.<ext>`, measure each against its word's
//! reference clip and produce one row per recording.
//!
//! Rows carry raw distances; no speaker normalization is applied.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::acoustics::AcousticProvider;
use crate::analysis::distance;
use crate::analysis::formants::ClipRole;
use crate::analysis::vowel::{VowelClass, VowelKind};
use crate::analysis::{Analyzer, ClipMeasurement};
use crate::pipeline::reference_path_in;
use crate::types::FormantPair;

const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "wav", "flac", "ogg", "m4a"];

#[derive(Debug, Deserialize)]
struct WordIndex {
    words: Vec<WordEntry>,
}

#[derive(Debug, Deserialize)]
struct WordEntry {
    word: String,
    stressed_vowel: String,
}

/// Lowercased word to stressed vowel symbol, read from an `index.json` of
/// the form `{"words": [{"word": ..., "stressed_vowel": ...}]}`.
pub fn load_word_index(path: &Path) -> Result<HashMap<String, String>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read word index {}", path.display()))?;
    let index: WordIndex = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse word index {}", path.display()))?;
    Ok(index
        .words
        .into_iter()
        .map(|entry| (entry.word.to_lowercase(), entry.stressed_vowel))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingName {
    pub student_id: String,
    pub student_name: String,
    pub word: String,
}

impl RecordingName {
    /// Needs at least three `_`-separated parts: id, name, word.
    pub fn parse(stem: &str) -> Option<Self> {
        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() < 3 {
            return None;
        }
        Some(Self {
            student_id: parts[0].to_string(),
            student_name: parts[1..parts.len() - 1].join(" "),
            word: parts[parts.len() - 1].to_lowercase(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestPhase {
    #[serde(rename = "Pre-test")]
    Pre,
    #[serde(rename = "Post-test")]
    Post,
}

impl TestPhase {
    /// Taken from the recording's parent folder name; pre-test by default.
    pub fn from_path(path: &Path) -> Self {
        let folder = path
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if folder.contains("pre") {
            Self::Pre
        } else if folder.contains("post") {
            Self::Post
        } else {
            Self::Pre
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRow {
    #[serde(rename = "student_ID")]
    pub student_id: String,
    pub student_name: String,
    pub word: String,
    pub vowel: String,
    pub vowel_type: VowelKind,
    #[serde(rename = "F1_student")]
    pub f1_student: f64,
    #[serde(rename = "F2_student")]
    pub f2_student: f64,
    #[serde(rename = "F1_ref")]
    pub f1_ref: f64,
    #[serde(rename = "F2_ref")]
    pub f2_ref: f64,
    pub dist_hz: f64,
    pub dist_bark: f64,
    pub test_type: TestPhase,
    pub ref_file_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub rows: Vec<BatchRow>,
    pub skipped: Vec<PathBuf>,
}

/// Every audio file under `root`, sorted by path.
pub fn find_recordings(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries =
            fs::read_dir(&dir).with_context(|| format!("failed to list {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_audio(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub struct BatchRunner<'a, P> {
    analyzer: &'a Analyzer<P>,
    words: HashMap<String, String>,
    audio_dir: PathBuf,
    references: HashMap<String, Option<ClipMeasurement>>,
}

impl<'a, P: AcousticProvider> BatchRunner<'a, P> {
    pub fn new(analyzer: &'a Analyzer<P>, words: HashMap<String, String>, audio_dir: impl Into<PathBuf>) -> Self {
        Self {
            analyzer,
            words,
            audio_dir: audio_dir.into(),
            references: HashMap::new(),
        }
    }

    pub fn run(&mut self, recordings_dir: &Path) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for path in find_recordings(recordings_dir)? {
            match self.row_for(&path) {
                Some(row) => report.rows.push(row),
                None => report.skipped.push(path),
            }
        }
        info!(
            rows = report.rows.len(),
            skipped = report.skipped.len(),
            "batch analysis finished"
        );
        Ok(report)
    }

    fn row_for(&mut self, path: &Path) -> Option<BatchRow> {
        let stem = path.file_stem()?.to_string_lossy();
        let Some(name) = RecordingName::parse(&stem) else {
            warn!(path = %path.display(), "file name does not match <id>_<name>_<word>");
            return None;
        };
        let Some(vowel) = self.words.get(&name.word).cloned() else {
            warn!(path = %path.display(), word = %name.word, "word not in index");
            return None;
        };
        let class = VowelClass::classify(&vowel);

        let audio = match self.analyzer.load_learner(path, None) {
            Ok(audio) if !audio.is_empty() => audio,
            Ok(_) => {
                warn!(path = %path.display(), "recording is silent");
                return None;
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "recording skipped");
                return None;
            }
        };
        let learner = self.analyzer.measure(&audio, &class, ClipRole::Learner);
        let reference_path = reference_path_in(&self.audio_dir, &name.word);
        let reference = self.reference_for(&name.word, &reference_path, &class);
        let reference_points = reference
            .map(|clip| clip.formants.points)
            .unwrap_or_else(|| vec![FormantPair::UNDEFINED; class.sampling_points().len()]);

        let score = distance::score(
            &learner.formants.points,
            &reference_points,
            self.analyzer.config().scoring.outlier_bark,
        );
        let student = learner.formants.primary();
        let target = reference_points.first().copied().unwrap_or(FormantPair::UNDEFINED);
        debug!(path = %path.display(), dist_bark = score.bark, "recording measured");

        Some(BatchRow {
            student_id: name.student_id,
            student_name: name.student_name,
            word: name.word,
            vowel,
            vowel_type: class.kind,
            f1_student: student.f1,
            f2_student: student.f2,
            f1_ref: target.f1,
            f2_ref: target.f2,
            dist_hz: score.hz,
            dist_bark: score.bark,
            test_type: TestPhase::from_path(path),
            ref_file_name: reference_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })
    }

    fn reference_for(&mut self, word: &str, path: &Path, class: &VowelClass) -> Option<ClipMeasurement> {
        if let Some(cached) = self.references.get(word) {
            return cached.clone();
        }
        let measured = match self.analyzer.load_reference(path) {
            Ok(Some(audio)) => Some(self.analyzer.measure(&audio, class, ClipRole::Reference)),
            Ok(None) => None,
            Err(err) => {
                warn!(path = %path.display(), %err, "reference unreadable");
                None
            }
        };
        self.references.insert(word.to_string(), measured.clone());
        measured
    }
}
