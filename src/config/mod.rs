mod engine;

pub use engine::{
    EngineConfig, FormantConfig, FrequencyRange, NucleusConfig, PreprocessConfig, ScoringConfig,
};

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

/// Environment variable naming the data root when no override is given.
pub const DATA_DIR_ENV: &str = "VOWELYZER_DATA_DIR";

/// On-disk layout of a deployment: learner uploads, reference clips and the
/// store.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_root: PathBuf,
}

impl AppConfig {
    pub fn from_override(path: Option<PathBuf>) -> Result<Self> {
        let root = match path {
            Some(custom) => canonicalize_dir(&custom)?,
            None => default_data_root()?,
        };
        Ok(Self { data_root: root })
    }

    /// Learner uploads, referenced by `Submission::file_path`.
    pub fn submissions_dir(&self) -> PathBuf {
        self.data_root.join("submissions")
    }

    /// Reference clips named `<word>.<ext>`.
    pub fn audio_dir(&self) -> PathBuf {
        self.data_root.join("audio")
    }

    /// JSON store holding submissions and their analysis results.
    pub fn store_path(&self) -> PathBuf {
        self.data_root.join("store.json")
    }
}

fn canonicalize_dir(path: &Path) -> Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to resolve data directory at {:?}", path))?;
    if canonical.is_dir() {
        Ok(canonical)
    } else {
        Err(anyhow!("data path {:?} is not a directory", canonical))
    }
}

fn default_data_root() -> Result<PathBuf> {
    if let Some(from_env) = std::env::var_os(DATA_DIR_ENV) {
        return canonicalize_dir(Path::new(&from_env));
    }
    let cwd = std::env::current_dir().context("unable to resolve current directory")?;
    canonicalize_dir(&cwd.join("data"))
}
