use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Serializes work per speaker so two analyses for the same speaker never
/// read the same history snapshot.
#[derive(Debug, Default)]
pub struct SpeakerLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SpeakerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, speaker_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(speaker_id.to_string())
            .or_default()
            .clone()
    }

    /// Run `work` while holding `speaker_id`'s lock.
    pub fn with_speaker<T>(&self, speaker_id: &str, work: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(speaker_id);
        let _guard = lock.lock();
        work()
    }
}
