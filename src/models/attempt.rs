// src/models/attempt.rs

//! Exam attempt lifecycle.
//!
//! An attempt row is either open (`completed_at` null) or closed. Every
//! mutation converts the row into an [`AttemptState`] and checks the
//! transition here before touching the database, so the rules can be tested
//! without one.

use std::collections::HashMap;

use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{error::AppError, models::user::CurrentUser};

/// Represents the 'exam_attempts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, SimpleObject)]
#[graphql(complex)]
pub struct ExamAttempt {
    pub id: i64,
    pub exam_id: i64,
    pub user_id: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
}

/// Represents the 'exam_answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, SimpleObject)]
#[graphql(complex)]
pub struct ExamAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_answer: String,
    #[graphql(skip)]
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
    /// Whether the viewer may see `is_correct`. Set by the resolver.
    #[sqlx(skip)]
    #[serde(skip)]
    #[graphql(skip)]
    pub reveal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum AttemptStatus {
    InProgress,
    Completed,
}

/// Lifecycle state of a persisted attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    InProgress { started_at: DateTime<Utc> },
    Completed { completed_at: DateTime<Utc>, score: i32 },
}

impl ExamAttempt {
    pub fn state(&self) -> AttemptState {
        match self.completed_at {
            None => AttemptState::InProgress {
                started_at: self.started_at,
            },
            Some(completed_at) => AttemptState::Completed {
                completed_at,
                score: self.score.unwrap_or(0),
            },
        }
    }
}

impl From<AttemptState> for AttemptStatus {
    fn from(state: AttemptState) -> Self {
        match state {
            AttemptState::InProgress { .. } => AttemptStatus::InProgress,
            AttemptState::Completed { .. } => AttemptStatus::Completed,
        }
    }
}

/// Upper bound for [`AttemptPolicy::grace_seconds`]: one day.
pub const MAX_GRACE_SECONDS: i64 = 86_400;

/// Server-side time-limit policy for attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPolicy {
    /// Reject answers submitted after the deadline.
    pub enforce_time_limit: bool,
    /// Seconds tolerated past `started_at + duration`.
    pub grace_seconds: i64,
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self {
            enforce_time_limit: true,
            grace_seconds: 30,
        }
    }
}

impl AttemptPolicy {
    /// When the exam's time runs out, not counting grace.
    pub fn deadline(&self, started_at: DateTime<Utc>, duration_minutes: i32) -> DateTime<Utc> {
        started_at + Duration::minutes(i64::from(duration_minutes))
    }

    pub fn is_expired(
        &self,
        started_at: DateTime<Utc>,
        duration_minutes: i32,
        now: DateTime<Utc>,
    ) -> bool {
        let grace = Duration::seconds(self.grace_seconds.clamp(0, MAX_GRACE_SECONDS));
        self.enforce_time_limit && now > self.deadline(started_at, duration_minutes) + grace
    }
}

fn ensure_owner(attempt: &ExamAttempt, user: &CurrentUser) -> Result<(), AppError> {
    if attempt.user_id != user.id {
        return Err(AppError::Unauthorized(
            "This attempt belongs to another user".to_string(),
        ));
    }
    Ok(())
}

/// Guards `submitExamAnswer`.
pub fn check_submit(
    attempt: &ExamAttempt,
    user: &CurrentUser,
    duration_minutes: i32,
    policy: &AttemptPolicy,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_owner(attempt, user)?;
    match attempt.state() {
        AttemptState::Completed { .. } => Err(AppError::InvalidState(
            "Attempt is already completed".to_string(),
        )),
        AttemptState::InProgress { started_at } => {
            if policy.is_expired(started_at, duration_minutes, now) {
                return Err(AppError::InvalidState(
                    "Time limit for this attempt has passed".to_string(),
                ));
            }
            Ok(())
        }
    }
}

/// Guards `completeExamAttempt`. Completion stays allowed past the deadline.
pub fn check_complete(attempt: &ExamAttempt, user: &CurrentUser) -> Result<(), AppError> {
    ensure_owner(attempt, user)?;
    match attempt.state() {
        AttemptState::Completed { .. } => Err(AppError::InvalidState(
            "Attempt is already completed".to_string(),
        )),
        AttemptState::InProgress { .. } => Ok(()),
    }
}

/// What `startExamAttempt` does about an attempt the user left open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAttempt {
    /// Nothing open; start a fresh attempt.
    None,
    /// The open attempt ran out of time; grade it, then start a fresh one.
    Expired(i64),
    /// The open attempt is still running.
    Active(i64),
}

pub fn classify_open_attempt(
    open: Option<&ExamAttempt>,
    duration_minutes: i32,
    policy: &AttemptPolicy,
    now: DateTime<Utc>,
) -> OpenAttempt {
    match open {
        None => OpenAttempt::None,
        Some(attempt) if policy.is_expired(attempt.started_at, duration_minutes, now) => {
            OpenAttempt::Expired(attempt.id)
        }
        Some(attempt) => OpenAttempt::Active(attempt.id),
    }
}

/// Marks a question is worth within one exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct MarkedQuestion {
    pub question_id: i64,
    pub marks: i32,
}

/// Correctness recorded for one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub is_correct: bool,
}

/// Sum of marks over questions answered correctly.
///
/// Unanswered questions count zero; answers to questions no longer in the
/// exam are ignored.
pub fn compute_score(questions: &[MarkedQuestion], answers: &[GradedAnswer]) -> i32 {
    let marks: HashMap<i64, i32> = questions
        .iter()
        .map(|q| (q.question_id, q.marks))
        .collect();

    answers
        .iter()
        .filter(|a| a.is_correct)
        .filter_map(|a| marks.get(&a.question_id))
        .sum()
}

/// Pass/fail for a finished attempt; `None` while in progress.
pub fn passed(score: Option<i32>, passing_marks: i32) -> Option<bool> {
    score.map(|s| s >= passing_marks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn student(id: i64) -> CurrentUser {
        CurrentUser { id, role: Role::Student }
    }

    fn open_attempt(started_at: DateTime<Utc>) -> ExamAttempt {
        ExamAttempt {
            id: 10,
            exam_id: 1,
            user_id: 7,
            started_at,
            completed_at: None,
            score: None,
        }
    }

    fn closed_attempt() -> ExamAttempt {
        ExamAttempt {
            completed_at: Some(Utc::now()),
            score: Some(5),
            ..open_attempt(Utc::now())
        }
    }

    #[test]
    fn test_state_from_row() {
        let now = Utc::now();
        assert_eq!(open_attempt(now).state(), AttemptState::InProgress { started_at: now });
        assert!(matches!(closed_attempt().state(), AttemptState::Completed { score: 5, .. }));
        assert_eq!(AttemptStatus::from(closed_attempt().state()), AttemptStatus::Completed);
    }

    #[test]
    fn test_score_two_question_scenario() {
        // Q1 worth 5 answered correctly, Q2 worth 10 answered wrong.
        let questions = [
            MarkedQuestion { question_id: 1, marks: 5 },
            MarkedQuestion { question_id: 2, marks: 10 },
        ];
        let answers = [
            GradedAnswer { question_id: 1, is_correct: true },
            GradedAnswer { question_id: 2, is_correct: false },
        ];
        assert_eq!(compute_score(&questions, &answers), 5);
    }

    #[test]
    fn test_score_after_resubmitting_wrong_answer() {
        let questions = [
            MarkedQuestion { question_id: 1, marks: 5 },
            MarkedQuestion { question_id: 2, marks: 10 },
        ];
        // Q1 resubmitted as "B" (wrong); Q2 unanswered.
        let answers = [GradedAnswer { question_id: 1, is_correct: false }];
        assert_eq!(compute_score(&questions, &answers), 0);
    }

    #[test]
    fn test_score_ignores_unanswered_and_foreign_questions() {
        let questions = [
            MarkedQuestion { question_id: 1, marks: 4 },
            MarkedQuestion { question_id: 2, marks: 6 },
            MarkedQuestion { question_id: 3, marks: 1 },
        ];
        let answers = [
            GradedAnswer { question_id: 2, is_correct: true },
            GradedAnswer { question_id: 99, is_correct: true },
        ];
        assert_eq!(compute_score(&questions, &answers), 6);
        assert_eq!(compute_score(&questions, &[]), 0);
    }

    #[test]
    fn test_submit_rejected_after_completion() {
        let policy = AttemptPolicy::default();
        let err =
            check_submit(&closed_attempt(), &student(7), 60, &policy, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn test_submit_rejected_for_other_user() {
        let err = check_submit(
            &open_attempt(Utc::now()),
            &student(8),
            60,
            &AttemptPolicy::default(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_submit_respects_time_limit_and_grace() {
        let policy = AttemptPolicy { enforce_time_limit: true, grace_seconds: 30 };
        let started = Utc::now() - Duration::minutes(60);
        let attempt = open_attempt(started);

        // Inside the grace window.
        let now = started + Duration::minutes(60) + Duration::seconds(20);
        assert!(check_submit(&attempt, &student(7), 60, &policy, now).is_ok());

        let late = started + Duration::minutes(60) + Duration::seconds(31);
        let err = check_submit(&attempt, &student(7), 60, &policy, late).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn test_out_of_range_grace_is_clamped() {
        let started = Utc::now() - Duration::days(3);
        let huge = AttemptPolicy { enforce_time_limit: true, grace_seconds: i64::MAX };
        assert!(huge.is_expired(started, 60, Utc::now()));

        let negative = AttemptPolicy { enforce_time_limit: true, grace_seconds: -600 };
        let deadline = negative.deadline(started, 60);
        assert!(!negative.is_expired(started, 60, deadline));
    }

    #[test]
    fn test_time_limit_can_be_disabled() {
        let policy = AttemptPolicy { enforce_time_limit: false, grace_seconds: 0 };
        let started = Utc::now() - Duration::days(2);
        assert!(check_submit(&open_attempt(started), &student(7), 60, &policy, Utc::now()).is_ok());
    }

    #[test]
    fn test_complete_twice_rejected() {
        assert!(check_complete(&open_attempt(Utc::now()), &student(7)).is_ok());
        let err = check_complete(&closed_attempt(), &student(7)).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn test_complete_allowed_after_deadline() {
        let started = Utc::now() - Duration::days(1);
        assert!(check_complete(&open_attempt(started), &student(7)).is_ok());
    }

    #[test]
    fn test_staff_cannot_act_on_learner_attempt() {
        let mentor = CurrentUser { id: 1, role: Role::Mentor };
        let err = check_complete(&open_attempt(Utc::now()), &mentor).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_classify_open_attempt() {
        let policy = AttemptPolicy::default();
        let now = Utc::now();
        assert_eq!(classify_open_attempt(None, 60, &policy, now), OpenAttempt::None);

        let fresh = open_attempt(now - Duration::minutes(5));
        assert_eq!(classify_open_attempt(Some(&fresh), 60, &policy, now), OpenAttempt::Active(10));

        let stale = open_attempt(now - Duration::minutes(90));
        assert_eq!(classify_open_attempt(Some(&stale), 60, &policy, now), OpenAttempt::Expired(10));
    }

    #[test]
    fn test_passed() {
        assert_eq!(passed(None, 40), None);
        assert_eq!(passed(Some(40), 40), Some(true));
        assert_eq!(passed(Some(39), 40), Some(false));
    }
}
