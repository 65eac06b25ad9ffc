//! When a prediction may be created, edited or withdrawn.

use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewPrediction, Prediction};
use crate::{
    error::{AppError, AppResult},
    matches::{
        lifecycle::is_locked,
        repo_types::{Match, MatchStatus, Score},
    },
};

const MAX_SUBJECT_LEN: usize = 255;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionInput {
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub comment: Option<String>,
    pub subject: Option<String>,
}

/// Partial edit. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionPatch {
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub comment: Option<String>,
    pub subject: Option<String>,
}

fn goals(field: &str, value: Option<i32>) -> AppResult<i32> {
    match value {
        Some(v) if v >= 0 => Ok(v),
        Some(_) => Err(AppError::invalid(format!("{field} must be a non-negative integer"))),
        None => Err(AppError::invalid(format!("{field} is required"))),
    }
}

fn check_subject(subject: Option<&str>) -> AppResult<()> {
    match subject {
        Some(s) if s.chars().count() > MAX_SUBJECT_LEN => {
            Err(AppError::invalid("subject is too long"))
        }
        _ => Ok(()),
    }
}

/// Predictions are frozen from kickoff on, and also once a result is in.
pub fn ensure_open(m: &Match, now: OffsetDateTime) -> AppResult<()> {
    if is_locked(m, now) {
        return Err(AppError::LockedMatch(
            "Predictions are closed once the match has kicked off".into(),
        ));
    }
    if m.status == MatchStatus::Finished {
        return Err(AppError::LockedMatch(
            "Predictions are closed for a finished match".into(),
        ));
    }
    Ok(())
}

/// Checks a new prediction by `user_id` on `m`, in order: the match exists,
/// it is not locked, the user has not predicted it yet, the input is valid.
pub fn check_create(
    user_id: Uuid,
    m: Option<&Match>,
    already_predicted: bool,
    input: PredictionInput,
    now: OffsetDateTime,
) -> AppResult<NewPrediction> {
    let m = m.ok_or_else(|| AppError::not_found("Match not found"))?;
    ensure_open(m, now)?;
    if already_predicted {
        return Err(AppError::Conflict(
            "Prediction for this match already exists".into(),
        ));
    }
    let home = goals("home_score", input.home_score)?;
    let away = goals("away_score", input.away_score)?;
    check_subject(input.subject.as_deref())?;

    Ok(NewPrediction {
        user_id,
        match_id: m.id,
        score: Score::new(home, away),
        comment: input.comment,
        subject: input.subject,
    })
}

/// Applies `patch` to `current`, an already ownership-checked prediction on `m`.
/// `points_earned` is carried over untouched.
pub fn apply_edit(
    current: &Prediction,
    m: &Match,
    patch: PredictionPatch,
    now: OffsetDateTime,
) -> AppResult<Prediction> {
    ensure_open(m, now)?;

    let mut next = current.clone();
    if patch.home_score.is_some() {
        next.home_score = goals("home_score", patch.home_score)?;
    }
    if patch.away_score.is_some() {
        next.away_score = goals("away_score", patch.away_score)?;
    }
    if patch.comment.is_some() {
        next.comment = patch.comment;
    }
    if patch.subject.is_some() {
        check_subject(patch.subject.as_deref())?;
        next.subject = patch.subject;
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::repo_types::fixtures::fixture;
    use time::{macros::datetime, Duration};

    const NOW: OffsetDateTime = datetime!(2025-04-15 18:00 UTC);

    fn input(home: Option<i32>, away: Option<i32>) -> PredictionInput {
        PredictionInput {
            home_score: home,
            away_score: away,
            comment: Some("Real will win at home".into()),
            subject: None,
        }
    }

    fn stored(m: &Match, home: i32, away: i32) -> Prediction {
        Prediction {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            match_id: m.id,
            home_score: home,
            away_score: away,
            comment: Some("first thoughts".into()),
            subject: Some("derby".into()),
            points_earned: None,
            created_at: NOW - Duration::days(1),
            updated_at: NOW - Duration::days(1),
        }
    }

    #[test]
    fn creates_before_kickoff() {
        let m = fixture(NOW + Duration::hours(1), MatchStatus::Scheduled);
        let user = Uuid::new_v4();
        let p = check_create(user, Some(&m), false, input(Some(2), Some(1)), NOW).unwrap();
        assert_eq!(p.user_id, user);
        assert_eq!(p.match_id, m.id);
        assert_eq!(p.score, Score::new(2, 1));
    }

    #[test]
    fn missing_match_is_not_found() {
        let err = check_create(Uuid::new_v4(), None, false, input(Some(1), Some(0)), NOW)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn kicked_off_match_is_locked_even_if_scheduled() {
        let m = fixture(NOW - Duration::minutes(5), MatchStatus::Scheduled);
        let err = check_create(Uuid::new_v4(), Some(&m), false, input(Some(1), Some(0)), NOW)
            .unwrap_err();
        assert!(matches!(err, AppError::LockedMatch(_)));
    }

    #[test]
    fn finished_match_is_locked_before_kickoff() {
        let mut m = fixture(NOW + Duration::hours(1), MatchStatus::Finished);
        m.home_score = Some(1);
        m.away_score = Some(0);
        let err = check_create(Uuid::new_v4(), Some(&m), false, input(Some(1), Some(0)), NOW)
            .unwrap_err();
        assert!(matches!(err, AppError::LockedMatch(_)));
    }

    #[test]
    fn second_prediction_conflicts() {
        let m = fixture(NOW + Duration::hours(1), MatchStatus::Scheduled);
        let err = check_create(Uuid::new_v4(), Some(&m), true, input(Some(1), Some(0)), NOW)
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn lock_is_reported_before_duplicate() {
        let m = fixture(NOW - Duration::hours(1), MatchStatus::Live);
        let err = check_create(Uuid::new_v4(), Some(&m), true, input(Some(1), Some(0)), NOW)
            .unwrap_err();
        assert!(matches!(err, AppError::LockedMatch(_)));
    }

    #[test]
    fn scores_are_required_and_non_negative() {
        let m = fixture(NOW + Duration::hours(1), MatchStatus::Scheduled);
        for bad in [input(None, Some(1)), input(Some(1), None), input(Some(-1), Some(0))] {
            let err = check_create(Uuid::new_v4(), Some(&m), false, bad, NOW).unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)));
        }
    }

    #[test]
    fn subject_length_is_capped() {
        let m = fixture(NOW + Duration::hours(1), MatchStatus::Scheduled);
        let mut long = input(Some(1), Some(1));
        long.subject = Some("s".repeat(256));
        let err = check_create(Uuid::new_v4(), Some(&m), false, long, NOW).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn edit_keeps_omitted_fields() {
        let m = fixture(NOW + Duration::hours(1), MatchStatus::Scheduled);
        let current = stored(&m, 3, 1);
        let next = apply_edit(
            &current,
            &m,
            PredictionPatch {
                away_score: Some(2),
                ..Default::default()
            },
            NOW,
        )
        .unwrap();
        assert_eq!(next.home_score, 3);
        assert_eq!(next.away_score, 2);
        assert_eq!(next.comment, current.comment);
        assert_eq!(next.subject, current.subject);
        assert_eq!(next.points_earned, None);
    }

    #[test]
    fn edit_updates_comment_independently() {
        let m = fixture(NOW + Duration::hours(1), MatchStatus::Scheduled);
        let current = stored(&m, 3, 1);
        let next = apply_edit(
            &current,
            &m,
            PredictionPatch {
                comment: Some("changed my mind".into()),
                ..Default::default()
            },
            NOW,
        )
        .unwrap();
        assert_eq!(next.score(), current.score());
        assert_eq!(next.comment.as_deref(), Some("changed my mind"));
    }

    #[test]
    fn edit_after_kickoff_is_locked() {
        let m = fixture(NOW - Duration::seconds(1), MatchStatus::Scheduled);
        let current = stored(&m, 1, 0);
        let err = apply_edit(
            &current,
            &m,
            PredictionPatch {
                home_score: Some(2),
                ..Default::default()
            },
            NOW,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::LockedMatch(_)));
    }

    #[test]
    fn edit_rejects_negative_score() {
        let m = fixture(NOW + Duration::hours(1), MatchStatus::Scheduled);
        let current = stored(&m, 1, 0);
        let err = apply_edit(
            &current,
            &m,
            PredictionPatch {
                home_score: Some(-2),
                ..Default::default()
            },
            NOW,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
