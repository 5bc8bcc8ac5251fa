//! Submission processing: look up a stored submission, analyze it against
//! the reference recording for its word, and persist the result.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, info_span, warn};

use crate::acoustics::{AcousticProvider, PraatAcoustics};
use crate::analysis::{AnalysisReport, Analyzer};
use crate::config::AppConfig;
use crate::error::{AnalysisError, Result};
use crate::store::{ResultStore, SpeakerLocks, UpsertOutcome};

const REFERENCE_EXTENSIONS: [&str; 4] = ["mp3", "wav", "flac", "ogg"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedSubmission {
    pub submission_id: u64,
    pub outcome: UpsertOutcome,
    pub report: AnalysisReport,
}

/// Outcome of a submission run, suitable for reporting back to a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProcessingStatus {
    Succeeded(Box<ProcessedSubmission>),
    Failed { message: String, user_message: String },
}

impl ProcessingStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReprocessSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<u64>,
    #[serde(serialize_with = "seconds")]
    pub elapsed: Duration,
}

fn seconds<S: serde::Serializer>(value: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

pub struct SubmissionPipeline<S, P = PraatAcoustics> {
    analyzer: Analyzer<P>,
    store: S,
    submissions_dir: PathBuf,
    audio_dir: PathBuf,
    locks: SpeakerLocks,
}

impl<S: ResultStore, P: AcousticProvider> SubmissionPipeline<S, P> {
    pub fn new(analyzer: Analyzer<P>, store: S, app: &AppConfig) -> Self {
        Self::with_dirs(analyzer, store, app.submissions_dir(), app.audio_dir())
    }

    pub fn with_dirs(
        analyzer: Analyzer<P>,
        store: S,
        submissions_dir: impl Into<PathBuf>,
        audio_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            analyzer,
            store,
            submissions_dir: submissions_dir.into(),
            audio_dir: audio_dir.into(),
            locks: SpeakerLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reference clip for `word`: the first existing `<word>.<ext>` in the
    /// audio directory, falling back to the `.mp3` name.
    pub fn reference_path(&self, word: &str) -> PathBuf {
        reference_path_in(&self.audio_dir, word)
    }

    /// Analyze submission `id` and store its result, replacing any earlier
    /// result for the same submission.
    ///
    /// The speaker history used for the scaling factor leaves out this
    /// submission's own stored result, so reanalysing it reproduces the
    /// first run's factor instead of feeding its own ratios back in.
    pub fn process_submission(&self, id: u64) -> Result<ProcessedSubmission> {
        let submission = self
            .store
            .submission(id)?
            .ok_or(AnalysisError::SubmissionNotFound(id))?;
        let span = info_span!("submission", id, speaker = %submission.speaker_id, word = %submission.word);
        let _entered = span.enter();

        let student_path = self.submissions_dir.join(&submission.file_path);
        let reference_path = self.reference_path(&submission.word);

        self.locks.with_speaker(&submission.speaker_id, || -> Result<ProcessedSubmission> {
            let history = self.store.speaker_history(&submission.speaker_id, Some(id))?;
            let report = self.analyzer.analyze(
                &student_path,
                &reference_path,
                &submission.stressed_vowel,
                &history,
                submission.noise_floor,
            )?;
            let outcome = self.store.upsert_result(&submission, &report.result)?;
            info!(?outcome, history = history.len(), "submission processed");
            Ok(ProcessedSubmission {
                submission_id: id,
                outcome,
                report,
            })
        })
    }

    /// [`Self::process_submission`] with failures folded into a status.
    pub fn run(&self, id: u64) -> ProcessingStatus {
        match self.process_submission(id) {
            Ok(processed) => ProcessingStatus::Succeeded(Box::new(processed)),
            Err(err) => {
                error!(id, %err, "submission failed");
                ProcessingStatus::Failed {
                    message: err.to_string(),
                    user_message: err.user_message().to_string(),
                }
            }
        }
    }

    /// Re-run every stored submission in id order. Individual failures are
    /// counted, not propagated.
    pub fn reprocess_all(&self) -> Result<ReprocessSummary> {
        let started = Instant::now();
        let submissions = self.store.submissions()?;
        let mut succeeded = 0;
        let mut failed = Vec::new();
        for submission in &submissions {
            if self.run(submission.id).is_success() {
                succeeded += 1;
            } else {
                failed.push(submission.id);
            }
        }
        let summary = ReprocessSummary {
            total: submissions.len(),
            succeeded,
            failed,
            elapsed: started.elapsed(),
        };
        if summary.failed.is_empty() {
            info!(total = summary.total, elapsed = ?summary.elapsed, "reprocessing finished");
        } else {
            warn!(
                total = summary.total,
                failed = summary.failed.len(),
                elapsed = ?summary.elapsed,
                "reprocessing finished with failures"
            );
        }
        Ok(summary)
    }
}

pub(crate) fn reference_path_in(audio_dir: &Path, word: &str) -> PathBuf {
    let stem = word.to_lowercase();
    REFERENCE_EXTENSIONS
        .iter()
        .map(|ext| audio_dir.join(format!("{stem}.{ext}")))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| audio_dir.join(format!("{stem}.mp3")))
}
