//! Learner-facing feedback: articulatory directions and the score card.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::config::ScoringConfig;
use crate::types::FormantPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Instruction {
    OpenMouthMore,
    CloseMouthSlightly,
    MoveTongueForward,
    MoveTongueBack,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::OpenMouthMore => "Open mouth more",
            Self::CloseMouthSlightly => "Close mouth slightly",
            Self::MoveTongueForward => "Move tongue forward",
            Self::MoveTongueBack => "Move tongue back",
        };
        f.write_str(text)
    }
}

/// Zero to two instructions, rendered joined by " & ".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feedback {
    pub instructions: Vec<Instruction>,
}

impl Feedback {
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, instruction) in self.instructions.iter().enumerate() {
            if i > 0 {
                f.write_str(" & ")?;
            }
            write!(f, "{instruction}")?;
        }
        Ok(())
    }
}

impl Serialize for Feedback {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// F1 tracks jaw opening, F2 tongue advancement. Compares the primary
/// sampling point only.
pub fn articulatory_feedback(
    normalized: FormantPair,
    reference: FormantPair,
    config: &ScoringConfig,
) -> Feedback {
    if !normalized.is_complete() || !reference.is_complete() {
        return Feedback::default();
    }
    let f1_diff = normalized.f1 - reference.f1;
    let f2_diff = normalized.f2 - reference.f2;

    let mut instructions = Vec::new();
    if f1_diff < -config.f1_feedback_hz {
        instructions.push(Instruction::OpenMouthMore);
    } else if f1_diff > config.f1_feedback_hz {
        instructions.push(Instruction::CloseMouthSlightly);
    }
    if f2_diff < -config.f2_feedback_hz {
        instructions.push(Instruction::MoveTongueForward);
    } else if f2_diff > config.f2_feedback_hz {
        instructions.push(Instruction::MoveTongueBack);
    }
    Feedback { instructions }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    /// 0 to 100, 20 points lost per Bark.
    pub score: u8,
    pub category: ScoreCategory,
    pub recommendation: Option<String>,
}

const SUCCESS_BELOW_BARK: f64 = 1.5;
const WARNING_BELOW_BARK: f64 = 3.0;
const FOCUS_FROM_BARK: f64 = 3.5;

/// Summary shown after a submission. `None` when the distance is undefined.
pub fn score_card(
    distance_bark: f64,
    normalized: FormantPair,
    reference: FormantPair,
    config: &ScoringConfig,
) -> Option<ScoreCard> {
    if !distance_bark.is_finite() {
        return None;
    }
    let score = (100.0 - distance_bark * 20.0).trunc().clamp(0.0, 100.0) as u8;
    let category = if distance_bark < SUCCESS_BELOW_BARK {
        ScoreCategory::Success
    } else if distance_bark < WARNING_BELOW_BARK {
        ScoreCategory::Warning
    } else {
        ScoreCategory::Danger
    };

    let recommendation = (distance_bark >= SUCCESS_BELOW_BARK).then(|| {
        let delta = |student: f64, target: f64| {
            let diff = student - target;
            if diff.is_finite() {
                diff
            } else {
                0.0
            }
        };
        let f1_diff = delta(normalized.f1, reference.f1);
        let f2_diff = delta(normalized.f2, reference.f2);

        let mut tips = Vec::new();
        if f2_diff.abs() > config.f2_feedback_hz {
            tips.push(if f2_diff > 0.0 {
                "move your tongue slightly back"
            } else {
                "move your tongue slightly forward"
            });
        }
        if f1_diff.abs() > config.f1_feedback_hz {
            tips.push(if f1_diff > 0.0 {
                "raise your tongue slightly"
            } else {
                "lower your tongue slightly"
            });
        }

        if !tips.is_empty() {
            format!("Try to {}.", tips.join(" and "))
        } else if distance_bark >= FOCUS_FROM_BARK {
            "Focus on matching the sample pronunciation more closely.".to_string()
        } else {
            "Good effort! Keep practicing.".to_string()
        }
    });

    Some(ScoreCard {
        score,
        category,
        recommendation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fb(student: (f64, f64), reference: (f64, f64)) -> Feedback {
        articulatory_feedback(
            FormantPair::new(student.0, student.1),
            FormantPair::new(reference.0, reference.1),
            &ScoringConfig::default(),
        )
    }

    #[test]
    fn jaw_feedback_from_f1() {
        assert_eq!(fb((400.0, 1500.0), (500.0, 1500.0)).to_string(), "Open mouth more");
        assert_eq!(fb((600.0, 1500.0), (500.0, 1500.0)).to_string(), "Close mouth slightly");
        assert!(fb((520.0, 1500.0), (500.0, 1500.0)).is_empty());
    }

    #[test]
    fn tongue_feedback_from_f2() {
        assert_eq!(fb((500.0, 1800.0), (500.0, 2000.0)).to_string(), "Move tongue forward");
        assert_eq!(fb((500.0, 2200.0), (500.0, 2000.0)).to_string(), "Move tongue back");
    }

    #[test]
    fn combined_feedback_is_joined() {
        assert_eq!(
            fb((400.0, 2200.0), (500.0, 2000.0)).to_string(),
            "Open mouth more & Move tongue back"
        );
    }

    #[test]
    fn undefined_input_gives_no_feedback() {
        assert!(fb((f64::NAN, 1500.0), (500.0, 1500.0)).is_empty());
    }

    #[test]
    fn score_card_bands() {
        let pair = FormantPair::new(500.0, 1500.0);
        let config = ScoringConfig::default();
        let good = score_card(1.0, pair, pair, &config).unwrap();
        assert_eq!((good.score, good.category), (80, ScoreCategory::Success));
        assert_eq!(good.recommendation, None);

        let middling = score_card(2.0, pair, pair, &config).unwrap();
        assert_eq!((middling.score, middling.category), (60, ScoreCategory::Warning));
        assert_eq!(middling.recommendation.as_deref(), Some("Good effort! Keep practicing."));

        let poor = score_card(6.0, pair, pair, &config).unwrap();
        assert_eq!((poor.score, poor.category), (0, ScoreCategory::Danger));
        assert_eq!(
            poor.recommendation.as_deref(),
            Some("Focus on matching the sample pronunciation more closely.")
        );
        assert!(score_card(f64::NAN, pair, pair, &config).is_none());
    }

    #[test]
    fn recommendation_lists_tongue_tips() {
        let card = score_card(
            2.5,
            FormantPair::new(600.0, 1700.0),
            FormantPair::new(500.0, 1500.0),
            &ScoringConfig::default(),
        )
        .unwrap();
        assert_eq!(
            card.recommendation.as_deref(),
            Some("Try to move your tongue slightly back and raise your tongue slightly.")
        );
    }
}
