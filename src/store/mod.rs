//! Persistence boundary for submissions and their analysis results.

mod locks;

pub use locks::SpeakerLocks;

use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, error};

use crate::analysis::AnalysisResult;
use crate::error::{AnalysisError, Result};

/// One learner recording awaiting (or having had) analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: u64,
    pub speaker_id: String,
    pub word: String,
    pub stressed_vowel: String,
    /// Relative to the submissions directory.
    pub file_path: PathBuf,
    /// Client-measured background RMS, if the recorder reported one.
    #[serde(default)]
    pub noise_floor: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub submission_id: u64,
    pub speaker_id: String,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

pub trait ResultStore {
    fn submission(&self, id: u64) -> Result<Option<Submission>>;

    /// Every submission, ordered by id.
    fn submissions(&self) -> Result<Vec<Submission>>;

    /// Stored results for `speaker_id`, leaving out `excluding` if given.
    fn speaker_history(&self, speaker_id: &str, excluding: Option<u64>)
        -> Result<Vec<AnalysisResult>>;

    /// Insert or replace the single result for `submission`. Either the whole
    /// record is written or nothing changes.
    fn upsert_result(&self, submission: &Submission, result: &AnalysisResult)
        -> Result<UpsertOutcome>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    submissions: Vec<Submission>,
    #[serde(default)]
    results: Vec<StoredResult>,
}

/// JSON-file store. Every write replaces the file through a temporary file
/// and rename; the in-memory copy only changes once the write succeeded.
///
/// Writes are serialized within one process only. Two processes holding the
/// same file each write their own snapshot and the last rename wins, so run
/// one writer per data directory.
#[derive(Debug)]
pub struct JsonStore {
    path: Option<PathBuf>,
    state: Mutex<StoreState>,
}

impl JsonStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            serde_json::from_str(&json).map_err(|err| {
                AnalysisError::Persistence(format!("corrupt store {}: {err}", path.display()))
            })?
        } else {
            StoreState::default()
        };
        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Register a submission, replacing any with the same id.
    pub fn insert_submission(&self, submission: Submission) -> Result<()> {
        self.modify(|state| {
            state.submissions.retain(|s| s.id != submission.id);
            state.submissions.push(submission);
            state.submissions.sort_by_key(|s| s.id);
        })
    }

    pub fn results(&self) -> Vec<StoredResult> {
        self.state.lock().results.clone()
    }

    pub fn result_for(&self, submission_id: u64) -> Option<AnalysisResult> {
        self.state
            .lock()
            .results
            .iter()
            .find(|r| r.submission_id == submission_id)
            .map(|r| r.result.clone())
    }

    fn modify<T>(&self, change: impl FnOnce(&mut StoreState) -> T) -> Result<T> {
        let mut guard = self.state.lock();
        let mut next = guard.clone();
        let output = change(&mut next);
        if let Some(path) = &self.path {
            write_atomically(path, &next)?;
        }
        *guard = next;
        Ok(output)
    }
}

fn write_atomically(path: &Path, state: &StoreState) -> Result<()> {
    let persistence = |what: &str, err: &dyn std::fmt::Display| {
        error!(path = %path.display(), %err, "{what}");
        AnalysisError::Persistence(format!("{what} for {}: {err}", path.display()))
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let json = serde_json::to_vec_pretty(state)
        .map_err(|err| persistence("failed to serialize store", &err))?;
    let mut temp =
        NamedTempFile::new_in(dir).map_err(|err| persistence("failed to create temp file", &err))?;
    temp.write_all(&json)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|err| persistence("failed to write temp file", &err))?;
    temp.persist(path)
        .map_err(|err| persistence("failed to replace store file", &err.error))?;
    debug!(path = %path.display(), bytes = json.len(), "store written");
    Ok(())
}

impl ResultStore for JsonStore {
    fn submission(&self, id: u64) -> Result<Option<Submission>> {
        Ok(self
            .state
            .lock()
            .submissions
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    fn submissions(&self) -> Result<Vec<Submission>> {
        let mut all = self.state.lock().submissions.clone();
        all.sort_by_key(|s| s.id);
        Ok(all)
    }

    fn speaker_history(
        &self,
        speaker_id: &str,
        excluding: Option<u64>,
    ) -> Result<Vec<AnalysisResult>> {
        Ok(self
            .state
            .lock()
            .results
            .iter()
            .filter(|r| r.speaker_id == speaker_id && Some(r.submission_id) != excluding)
            .map(|r| r.result.clone())
            .collect())
    }

    fn upsert_result(
        &self,
        submission: &Submission,
        result: &AnalysisResult,
    ) -> Result<UpsertOutcome> {
        let record = StoredResult {
            submission_id: submission.id,
            speaker_id: submission.speaker_id.clone(),
            result: result.clone(),
        };
        self.modify(move |state| {
            match state
                .results
                .iter_mut()
                .find(|r| r.submission_id == record.submission_id)
            {
                Some(existing) => {
                    *existing = record;
                    UpsertOutcome::Updated
                }
                None => {
                    state.results.push(record);
                    UpsertOutcome::Created
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(id: u64, speaker: &str) -> Submission {
        Submission {
            id,
            speaker_id: speaker.to_string(),
            word: "food".to_string(),
            stressed_vowel: "uː".to_string(),
            file_path: PathBuf::from(format!("{speaker}/{id}.wav")),
            noise_floor: None,
        }
    }

    fn result(f1_raw: f64) -> AnalysisResult {
        AnalysisResult {
            f1_raw: Some(f1_raw),
            f1_ref: Some(500.0),
            ..AnalysisResult::default()
        }
    }

    #[test]
    fn second_upsert_updates_in_place() {
        let store = JsonStore::in_memory();
        let sub = submission(1, "ana");
        assert_eq!(store.upsert_result(&sub, &result(550.0)).unwrap(), UpsertOutcome::Created);
        assert_eq!(store.upsert_result(&sub, &result(600.0)).unwrap(), UpsertOutcome::Updated);
        assert_eq!(store.results().len(), 1);
        assert_eq!(store.result_for(1).unwrap().f1_raw, Some(600.0));
    }

    #[test]
    fn history_is_per_speaker_and_can_exclude_one() {
        let store = JsonStore::in_memory();
        store.upsert_result(&submission(1, "ana"), &result(550.0)).unwrap();
        store.upsert_result(&submission(2, "ana"), &result(560.0)).unwrap();
        store.upsert_result(&submission(3, "ben"), &result(700.0)).unwrap();

        assert_eq!(store.speaker_history("ana", None).unwrap().len(), 2);
        let without_two = store.speaker_history("ana", Some(2)).unwrap();
        assert_eq!(without_two, vec![result(550.0)]);
    }

    #[test]
    fn reopened_store_sees_written_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        {
            let store = JsonStore::open(&path).unwrap();
            store.insert_submission(submission(7, "ana")).unwrap();
            store.upsert_result(&submission(7, "ana"), &result(550.0)).unwrap();
        }
        let reopened = JsonStore::open(&path).unwrap();
        assert_eq!(reopened.submission(7).unwrap(), Some(submission(7, "ana")));
        assert_eq!(reopened.result_for(7).unwrap().f1_raw, Some(550.0));
    }

    #[test]
    fn failed_write_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("missing").join("store.json")).unwrap();
        let err = store.upsert_result(&submission(1, "ana"), &result(550.0)).unwrap_err();
        assert!(matches!(err, AnalysisError::Persistence(_)));
        assert!(store.results().is_empty());
    }
}
