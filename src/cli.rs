use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Vowelyzer - vowel pronunciation scoring
///
/// Measures the stressed vowel of a learner recording, compares it with a
/// reference recording and reports distances, feedback and a score.
#[derive(Parser, Debug)]
#[command(name = "vowelyzer")]
#[command(version)]
#[command(about = "Vowel pronunciation scoring engine", long_about = None)]
pub struct Cli {
    /// Engine configuration file (JSON); defaults apply when omitted
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Data directory holding submissions/, audio/ and store.json
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score one learner recording against a reference recording
    Analyze {
        #[arg(value_name = "STUDENT")]
        student: PathBuf,

        #[arg(value_name = "REFERENCE")]
        reference: PathBuf,

        /// Stressed vowel symbol, e.g. "uː" or "aɪ"
        #[arg(long)]
        vowel: String,

        /// Client-measured background RMS
        #[arg(long, value_name = "RMS")]
        noise_floor: Option<f32>,
    },

    /// Standardize a recording and write it as 16-bit WAV
    Preprocess {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        #[arg(long, value_name = "RMS")]
        noise_floor: Option<f32>,
    },

    /// Analyze a stored submission and persist its result
    Process {
        #[arg(value_name = "ID")]
        id: u64,
    },

    /// Re-run every stored submission
    Reprocess,

    /// Measure a directory of learner recordings against reference clips
    Batch {
        #[arg(value_name = "RECORDINGS_DIR")]
        recordings: PathBuf,

        /// Word index with stressed vowels
        #[arg(long, value_name = "PATH")]
        index: PathBuf,

        /// Directory of reference clips; defaults to <data-dir>/audio
        #[arg(long, value_name = "DIR")]
        audio_dir: Option<PathBuf>,

        /// Write rows here instead of stdout
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}
