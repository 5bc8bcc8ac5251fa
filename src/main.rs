use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vowelyzer::analysis::Analyzer;
use vowelyzer::audio::encoder::encode_wav;
use vowelyzer::batch::{load_word_index, BatchRunner};
use vowelyzer::cli::{Cli, Command};
use vowelyzer::config::{AppConfig, EngineConfig};
use vowelyzer::pipeline::{ProcessingStatus, SubmissionPipeline};
use vowelyzer::preprocess::{PreprocessOutcome, Preprocessor};
use vowelyzer::store::JsonStore;

fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let engine = EngineConfig::load(cli.config.as_deref()).context("Failed to load engine configuration")?;

    match cli.command {
        Command::Analyze {
            student,
            reference,
            vowel,
            noise_floor,
        } => {
            let analyzer = Analyzer::new(engine);
            let report = analyzer
                .analyze(&student, &reference, &vowel, &[], noise_floor)
                .with_context(|| format!("Failed to analyze {}", student.display()))?;
            print_json(&report)
        }
        Command::Preprocess {
            input,
            output,
            noise_floor,
        } => {
            let preprocessor = Preprocessor::new(&engine);
            match preprocessor.process_path(&input, noise_floor)? {
                PreprocessOutcome::Processed(audio) => {
                    encode_wav(&audio, &output)
                        .with_context(|| format!("Failed to write {}", output.display()))?;
                    info!(output = %output.display(), seconds = audio.duration(), "standardized recording written");
                    Ok(())
                }
                PreprocessOutcome::Unprocessed { original, reason } => {
                    fs::write(&output, &original)
                        .with_context(|| format!("Failed to write {}", output.display()))?;
                    info!(%reason, "recording could not be decoded; original bytes kept");
                    Ok(())
                }
            }
        }
        Command::Process { id } => {
            let pipeline = open_pipeline(engine, cli.data_dir)?;
            let status = pipeline.run(id);
            print_json(&status)?;
            if let ProcessingStatus::Failed { message, .. } = status {
                bail!("Submission {id} failed: {message}");
            }
            Ok(())
        }
        Command::Reprocess => {
            let pipeline = open_pipeline(engine, cli.data_dir)?;
            let summary = pipeline.reprocess_all()?;
            print_json(&summary)
        }
        Command::Batch {
            recordings,
            index,
            audio_dir,
            output,
        } => {
            let audio_dir = match audio_dir {
                Some(dir) => dir,
                None => AppConfig::from_override(cli.data_dir)?.audio_dir(),
            };
            let words = load_word_index(&index)?;
            let analyzer = Analyzer::new(engine);
            let report = BatchRunner::new(&analyzer, words, audio_dir).run(&recordings)?;
            match output {
                Some(path) => write_json(&path, &report.rows),
                None => print_json(&report.rows),
            }
        }
    }
}

fn open_pipeline(
    engine: EngineConfig,
    data_dir: Option<std::path::PathBuf>,
) -> Result<SubmissionPipeline<JsonStore>> {
    let app = AppConfig::from_override(data_dir)?;
    let store = JsonStore::open(app.store_path())
        .with_context(|| format!("Failed to open store {}", app.store_path().display()))?;
    Ok(SubmissionPipeline::new(Analyzer::new(engine), store, &app))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value).context("Failed to serialize output")?;
    writeln!(handle)?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "batch rows written");
    Ok(())
}
