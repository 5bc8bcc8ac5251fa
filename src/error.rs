use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for results returned by the analysis engine.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Failures the engine reports to its caller.
///
/// A missing nucleus and a missing reference clip are not errors: both
/// degrade into NaN measurements further down the pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("unreadable audio in {source_name}: {reason}")]
    UnreadableAudio { source_name: String, reason: String },

    #[error("recording is clipped: {:.2}% of samples are saturated", .ratio * 100.0)]
    ClippingDetected { ratio: f64 },

    #[error("submission {0} not found")]
    SubmissionNotFound(u64),

    #[error("learner recording missing at {}", .0.display())]
    MissingStudentFile(PathBuf),

    #[error("failed to persist analysis result: {0}")]
    Persistence(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub(crate) fn unreadable(source_name: impl Into<String>, err: anyhow::Error) -> Self {
        Self::UnreadableAudio {
            source_name: source_name.into(),
            reason: format!("{err:#}"),
        }
    }

    /// Message suitable for showing to the person who made the recording.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ClippingDetected { .. } => {
                "Your recording is too loud and distorted. Please reduce microphone volume and try again."
            }
            Self::UnreadableAudio { .. } | Self::MissingStudentFile(_) => {
                "Your recording could not be read. Please record it again."
            }
            _ => "Analysis failed. Please try again later.",
        }
    }
}
