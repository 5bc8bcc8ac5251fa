mod common;

use approx::assert_relative_eq;
use common::{silent_clip, ClipScript, ScriptedAcoustics};
use vowelyzer::analysis::distance::{self, hz_to_bark};
use vowelyzer::analysis::feedback::ScoreCategory;
use vowelyzer::analysis::vowel::VowelKind;
use vowelyzer::analysis::{AnalysisResult, Analyzer};
use vowelyzer::config::EngineConfig;
use vowelyzer::types::FormantPair;

const LEARNER: usize = 8_000;
const REFERENCE: usize = 9_600;

fn analyzer(learner: ClipScript, reference: ClipScript) -> Analyzer<ScriptedAcoustics> {
    let provider = ScriptedAcoustics::new()
        .clip(LEARNER, learner)
        .clip(REFERENCE, reference);
    Analyzer::with_provider(EngineConfig::default(), provider)
}

fn history_at_unity(count: usize) -> Vec<AnalysisResult> {
    (0..count)
        .map(|_| AnalysisResult {
            f1_raw: Some(500.0),
            f2_raw: Some(1500.0),
            f1_ref: Some(500.0),
            f2_ref: Some(1500.0),
            ..AnalysisResult::default()
        })
        .collect()
}

#[test]
fn proportionally_longer_tract_scores_as_a_match() {
    let engine = analyzer(ClipScript::vowel(550.0, 1650.0), ClipScript::vowel(500.0, 1500.0));
    let report = engine.analyze_audio(&silent_clip(LEARNER), Some(&silent_clip(REFERENCE)), "ɜː", &[]);
    let result = &report.result;

    assert_relative_eq!(result.scaling_factor.unwrap(), 1.1, epsilon = 1e-9);
    assert_relative_eq!(result.f1_norm.unwrap(), 500.0, epsilon = 1e-6);
    assert_relative_eq!(result.f2_norm.unwrap(), 1500.0, epsilon = 1e-6);
    assert_relative_eq!(result.distance_hz.unwrap(), 0.0, epsilon = 1e-6);
    assert_relative_eq!(result.distance_bark.unwrap(), 0.0, epsilon = 1e-6);
    assert!(!result.is_outlier);

    let card = report.score_card.expect("defined distance has a score card");
    assert_eq!(card.score, 100);
    assert_eq!(card.category, ScoreCategory::Success);
    assert!(report.feedback.is_empty());
}

#[test]
fn history_pins_the_scaling_factor() {
    let engine = analyzer(ClipScript::vowel(550.0, 1650.0), ClipScript::vowel(500.0, 1500.0));
    let report = engine.analyze_audio(
        &silent_clip(LEARNER),
        Some(&silent_clip(REFERENCE)),
        "ɜː",
        &history_at_unity(5),
    );
    let result = &report.result;

    assert_relative_eq!(result.scaling_factor.unwrap(), 1.0);
    assert_relative_eq!(result.f1_norm.unwrap(), 550.0);
    assert_relative_eq!(result.distance_hz.unwrap(), (50.0_f64.powi(2) + 150.0_f64.powi(2)).sqrt(), epsilon = 1e-9);
}

#[test]
fn far_vowel_is_flagged_as_outlier() {
    let engine = analyzer(ClipScript::vowel(800.0, 2600.0), ClipScript::vowel(300.0, 800.0));
    let report = engine.analyze_audio(
        &silent_clip(LEARNER),
        Some(&silent_clip(REFERENCE)),
        "ɪ",
        &history_at_unity(10),
    );
    assert!(report.result.distance_bark.unwrap() > 5.0);
    assert!(report.result.is_outlier);

    let card = report.score_card.unwrap();
    assert_eq!(card.category, ScoreCategory::Danger);
    assert_eq!(
        card.recommendation.as_deref(),
        Some("Try to move your tongue slightly back and raise your tongue slightly.")
    );
}

#[test]
fn back_vowel_with_high_f2_is_remeasured() {
    let engine = analyzer(
        ClipScript::vowel(320.0, 1800.0).lowered_to(320.0, 900.0),
        ClipScript::vowel(300.0, 850.0).lowered_to(300.0, 700.0),
    );
    let report = engine.analyze_audio(&silent_clip(LEARNER), Some(&silent_clip(REFERENCE)), "uː", &[]);

    assert!(report.result.is_deep_voice_corrected);
    assert_eq!(report.result.f2_raw, Some(900.0));
    assert!(!report.reference.as_ref().unwrap().formants.ceiling_retried);
    assert_eq!(report.result.f2_ref, Some(850.0));
}

#[test]
fn reference_uses_its_own_retry_threshold() {
    let script = ClipScript::vowel(300.0, 1550.0).lowered_to(300.0, 800.0);
    let engine = analyzer(script, script);
    let report = engine.analyze_audio(&silent_clip(LEARNER), Some(&silent_clip(REFERENCE)), "ʊ", &[]);

    assert_eq!(report.result.f2_raw, Some(800.0));
    assert_eq!(report.result.f2_ref, Some(1550.0));
}

#[test]
fn front_vowel_is_never_remeasured() {
    let engine = analyzer(
        ClipScript::vowel(280.0, 2300.0).lowered_to(280.0, 1100.0),
        ClipScript::vowel(280.0, 2250.0).lowered_to(280.0, 1100.0),
    );
    let report = engine.analyze_audio(&silent_clip(LEARNER), Some(&silent_clip(REFERENCE)), "iː", &[]);

    assert!(!report.result.is_deep_voice_corrected);
    assert_eq!(report.result.f2_raw, Some(2300.0));
}

#[test]
fn diphthong_is_sampled_twice() {
    let engine = analyzer(ClipScript::vowel(700.0, 1300.0), ClipScript::vowel(700.0, 1300.0));
    let report = engine.analyze_audio(&silent_clip(LEARNER), Some(&silent_clip(REFERENCE)), "aɪ", &[]);

    assert_eq!(report.vowel_kind, VowelKind::Diphthong);
    assert_eq!(report.learner.formants.points.len(), 2);
    assert_eq!(report.reference.unwrap().formants.points.len(), 2);
}

#[test]
fn unvoiced_learner_yields_undefined_result() {
    let engine = analyzer(ClipScript::unvoiced(), ClipScript::vowel(500.0, 1500.0));
    let report = engine.analyze_audio(&silent_clip(LEARNER), Some(&silent_clip(REFERENCE)), "ɜː", &[]);
    let result = &report.result;

    assert!(report.learner.nucleus.is_none());
    assert_eq!(result.f1_raw, None);
    assert_eq!(result.distance_hz, None);
    assert_eq!(result.distance_bark, None);
    assert_eq!(result.scaling_factor, Some(1.0));
    assert!(!result.is_outlier);
    assert!(report.score_card.is_none());
}

#[test]
fn missing_reference_keeps_learner_measurement() {
    let engine = analyzer(ClipScript::vowel(550.0, 1650.0), ClipScript::vowel(500.0, 1500.0));
    let report = engine.analyze_audio(&silent_clip(LEARNER), None, "ɜː", &[]);

    assert!(report.reference.is_none());
    assert_eq!(report.result.f1_raw, Some(550.0));
    assert_eq!(report.result.f1_ref, None);
    assert_eq!(report.result.distance_bark, None);
}

#[test]
fn implausible_f1_is_dropped() {
    let engine = analyzer(ClipScript::vowel(1500.0, 1500.0), ClipScript::vowel(500.0, 1400.0));
    let report = engine.analyze_audio(&silent_clip(LEARNER), Some(&silent_clip(REFERENCE)), "ɜː", &[]);

    assert_eq!(report.result.f1_raw, None);
    assert_eq!(report.result.f2_raw, Some(1500.0));
    assert_relative_eq!(report.result.scaling_factor.unwrap(), 1500.0 / 1400.0);
    assert_eq!(report.result.distance_hz, None);
    assert!(!report.result.is_outlier);
}

#[test]
fn bark_increases_with_frequency() {
    let barks: Vec<f64> = (1..=800).map(|i| hz_to_bark(i as f64 * 10.0)).collect();
    assert!(barks.iter().all(|b| b.is_finite()));
    assert!(barks.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn uniform_tract_scaling_normalizes_to_the_reference() {
    for k in [0.85, 1.1, 1.2] {
        let engine = analyzer(
            ClipScript::vowel(500.0 * k, 1500.0 * k),
            ClipScript::vowel(500.0, 1500.0),
        );
        let history: Vec<AnalysisResult> = [(400.0, 2000.0), (650.0, 1100.0)]
            .into_iter()
            .map(|(f1, f2)| AnalysisResult {
                f1_raw: Some(f1 * k),
                f2_raw: Some(f2 * k),
                f1_ref: Some(f1),
                f2_ref: Some(f2),
                ..AnalysisResult::default()
            })
            .collect();
        let report = engine.analyze_audio(
            &silent_clip(LEARNER),
            Some(&silent_clip(REFERENCE)),
            "ɜː",
            &history,
        );
        let result = &report.result;
        assert_relative_eq!(result.scaling_factor.unwrap(), k, epsilon = 1e-9);
        assert_relative_eq!(result.distance_hz.unwrap(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(result.distance_bark.unwrap(), 0.0, epsilon = 1e-9);
        assert!(!result.is_outlier);
    }
}

#[test]
fn outlier_threshold_is_exclusive() {
    let student = [FormantPair::new(800.0, 2600.0)];
    let reference = [FormantPair::new(300.0, 800.0)];
    let bark = distance::score(&student, &reference, 5.0).bark;

    assert!(!distance::score(&student, &reference, bark).is_outlier);
    assert!(distance::score(&student, &reference, bark - 1e-9).is_outlier);

    assert!(bark > 5.0);
    assert!(distance::score(&student, &reference, 5.0).is_outlier);
    assert!(!distance::score(&reference, &reference, 5.0).is_outlier);
}
