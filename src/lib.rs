//! Vowel pronunciation scoring engine.
//!
//! A learner's recording and a reference recording are standardized, the
//! vowel nucleus of each is located, F1/F2 are measured, the learner's
//! formants are normalized against their own history, and the result is
//! scored in Hz and Bark with articulatory feedback.

pub mod acoustics;
pub mod analysis;
pub mod audio;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod preprocess;
pub mod store;
pub mod types;

pub use error::{AnalysisError, Result};
