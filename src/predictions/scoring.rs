//! Turning a final result into prediction points.

use serde::Serialize;
use time::OffsetDateTime;

use super::repo_types::Prediction;
use crate::matches::repo_types::{Match, Score};

pub const EXACT_SCORE_POINTS: i32 = 3;
pub const CORRECT_OUTCOME_POINTS: i32 = 1;

/// 1 / X / 2 reduction of a score pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl Outcome {
    pub fn of(score: Score) -> Self {
        use std::cmp::Ordering::*;
        match score.home.cmp(&score.away) {
            Greater => Outcome::HomeWin,
            Less => Outcome::AwayWin,
            Equal => Outcome::Draw,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Outcome::HomeWin => "1",
            Outcome::Draw => "X",
            Outcome::AwayWin => "2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionResult {
    ExactScore,
    CorrectOutcome,
    Incorrect,
}

impl PredictionResult {
    pub fn classify(predicted: Score, actual: Score) -> Self {
        if predicted == actual {
            PredictionResult::ExactScore
        } else if Outcome::of(predicted) == Outcome::of(actual) {
            PredictionResult::CorrectOutcome
        } else {
            PredictionResult::Incorrect
        }
    }

    pub fn points(&self) -> i32 {
        match self {
            PredictionResult::ExactScore => EXACT_SCORE_POINTS,
            PredictionResult::CorrectOutcome => CORRECT_OUTCOME_POINTS,
            PredictionResult::Incorrect => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PredictionResult::ExactScore => "exact score",
            PredictionResult::CorrectOutcome => "correct outcome",
            PredictionResult::Incorrect => "incorrect",
        }
    }
}

/// Points for `predicted` against the final `actual` score. Pure.
pub fn score_prediction(predicted: Score, actual: Score) -> i32 {
    PredictionResult::classify(predicted, actual).points()
}

/// Display classification; `None` until the match is past with a full score.
pub fn result_of(
    prediction: &Prediction,
    m: &Match,
    now: OffsetDateTime,
) -> Option<PredictionResult> {
    if !m.is_past(now) {
        return None;
    }
    m.final_score()
        .map(|actual| PredictionResult::classify(prediction.score(), actual))
}

/// Points for each prediction of a finished match, ready for a batch write.
pub fn score_all(predictions: &[Prediction], actual: Score) -> Vec<(uuid::Uuid, i32)> {
    predictions
        .iter()
        .map(|p| (p.id, score_prediction(p.score(), actual)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::repo_types::{fixtures::fixture, MatchStatus};
    use time::{macros::datetime, Duration};
    use uuid::Uuid;

    const NOW: OffsetDateTime = datetime!(2025-04-15 22:00 UTC);

    fn prediction(match_id: Uuid, home: i32, away: i32) -> Prediction {
        Prediction {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            match_id,
            home_score: home,
            away_score: away,
            comment: None,
            subject: None,
            points_earned: None,
            created_at: NOW - Duration::days(1),
            updated_at: NOW - Duration::days(1),
        }
    }

    #[test]
    fn outcome_classifier() {
        assert_eq!(Outcome::of(Score::new(2, 1)).symbol(), "1");
        assert_eq!(Outcome::of(Score::new(0, 3)).symbol(), "2");
        assert_eq!(Outcome::of(Score::new(1, 1)).symbol(), "X");
    }

    #[test]
    fn exact_score_is_three_points() {
        assert_eq!(score_prediction(Score::new(2, 1), Score::new(2, 1)), 3);
        assert_eq!(score_prediction(Score::new(0, 0), Score::new(0, 0)), 3);
    }

    #[test]
    fn correct_outcome_is_one_point() {
        assert_eq!(score_prediction(Score::new(3, 1), Score::new(2, 1)), 1);
        assert_eq!(score_prediction(Score::new(2, 2), Score::new(1, 1)), 1);
        assert_eq!(score_prediction(Score::new(0, 4), Score::new(1, 2)), 1);
    }

    #[test]
    fn wrong_outcome_is_zero() {
        assert_eq!(score_prediction(Score::new(1, 1), Score::new(2, 1)), 0);
        assert_eq!(score_prediction(Score::new(1, 2), Score::new(2, 1)), 0);
    }

    #[test]
    fn scoring_is_idempotent() {
        for (p, a) in [((2, 1), (2, 1)), ((3, 1), (2, 1)), ((1, 1), (2, 1))] {
            let (p, a) = (Score::new(p.0, p.1), Score::new(a.0, a.1));
            assert_eq!(score_prediction(p, a), score_prediction(p, a));
        }
    }

    #[test]
    fn no_result_before_match_is_past() {
        let mut m = fixture(NOW + Duration::hours(1), MatchStatus::Scheduled);
        m.home_score = Some(2);
        m.away_score = Some(1);
        let p = prediction(m.id, 2, 1);
        assert_eq!(result_of(&p, &m, NOW), None);
    }

    #[test]
    fn no_result_without_final_score() {
        let m = fixture(NOW - Duration::hours(1), MatchStatus::Live);
        let p = prediction(m.id, 2, 1);
        assert_eq!(result_of(&p, &m, NOW), None);
    }

    #[test]
    fn result_label_after_final_whistle() {
        let mut m = fixture(NOW - Duration::hours(2), MatchStatus::Finished);
        m.home_score = Some(2);
        m.away_score = Some(1);

        let exact = result_of(&prediction(m.id, 2, 1), &m, NOW).unwrap();
        assert_eq!(exact.label(), "exact score");
        let outcome = result_of(&prediction(m.id, 3, 1), &m, NOW).unwrap();
        assert_eq!(outcome.label(), "correct outcome");
        let wrong = result_of(&prediction(m.id, 1, 1), &m, NOW).unwrap();
        assert_eq!(wrong.label(), "incorrect");
    }

    #[test]
    fn score_all_covers_every_prediction() {
        let match_id = Uuid::new_v4();
        let preds = vec![
            prediction(match_id, 2, 1),
            prediction(match_id, 3, 1),
            prediction(match_id, 1, 1),
        ];
        let points = score_all(&preds, Score::new(2, 1));
        let got: Vec<i32> = points.iter().map(|(_, p)| *p).collect();
        assert_eq!(got, vec![3, 1, 0]);
        assert_eq!(points[0].0, preds[0].id);
    }
}
