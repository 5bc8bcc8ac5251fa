use assert_cmd::Command;
use predicates::prelude::*;

fn vowelyzer() -> Command {
    let mut cmd = Command::cargo_bin("vowelyzer").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("VOWELYZER_DATA_DIR");
    cmd
}

#[test]
fn help_lists_subcommands() {
    vowelyzer()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze").and(predicate::str::contains("reprocess")));
}

#[test]
fn analyze_reports_missing_learner_file() {
    let dir = tempfile::tempdir().unwrap();
    vowelyzer()
        .arg("analyze")
        .arg(dir.path().join("nope.wav"))
        .arg(dir.path().join("ref.wav"))
        .args(["--vowel", "uː"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("learner recording missing"));
}

#[test]
fn unknown_submission_prints_failed_status() {
    let dir = tempfile::tempdir().unwrap();
    vowelyzer()
        .arg("--data-dir")
        .arg(dir.path())
        .args(["process", "9"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""status": "failed""#));
}

#[test]
fn reprocess_of_empty_store_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    vowelyzer()
        .arg("--data-dir")
        .arg(dir.path())
        .arg("reprocess")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""total": 0"#));
}

#[test]
fn batch_over_empty_directory_writes_no_rows() {
    let dir = tempfile::tempdir().unwrap();
    let index = dir.path().join("index.json");
    std::fs::write(&index, r#"{"words": []}"#).unwrap();
    let recordings = dir.path().join("cohort");
    std::fs::create_dir(&recordings).unwrap();

    vowelyzer()
        .arg("batch")
        .arg(&recordings)
        .arg("--index")
        .arg(&index)
        .arg("--audio-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[]"));
}

#[test]
fn invalid_engine_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("engine.json");
    std::fs::write(&config, r#"{"target_sample_rate": 0}"#).unwrap();
    vowelyzer()
        .arg("--config")
        .arg(&config)
        .arg("reprocess")
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("target_sample_rate"));
}
