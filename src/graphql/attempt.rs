// src/graphql/attempt.rs

use async_graphql::{ComplexObject, Context, Object, Result, ResultExt};
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    graphql::context::{current_user, is_staff, pool},
    models::{
        attempt::{AttemptPolicy, AttemptStatus, ExamAnswer, ExamAttempt, passed},
        exam::Exam,
    },
    services::{attempts, exams},
};

fn policy<'a>(ctx: &Context<'a>) -> Result<&'a AttemptPolicy> {
    ctx.data::<AttemptPolicy>()
}

impl ExamAttempt {
    async fn load_exam(&self, ctx: &Context<'_>) -> Result<Exam> {
        exams::find(pool(ctx).extend()?, self.exam_id, true)
            .await
            .extend()?
            .ok_or_else(|| AppError::InternalServerError("Attempt without exam".to_string()))
            .extend()
    }
}

#[ComplexObject]
impl ExamAttempt {
    async fn status(&self) -> AttemptStatus {
        AttemptStatus::from(self.state())
    }

    /// When the time limit runs out, grace not included.
    async fn deadline(&self, ctx: &Context<'_>) -> Result<DateTime<Utc>> {
        let exam = self.load_exam(ctx).await?;
        Ok(policy(ctx)?.deadline(self.started_at, exam.duration_minutes))
    }

    /// Null while in progress.
    async fn passed(&self, ctx: &Context<'_>) -> Result<Option<bool>> {
        if self.score.is_none() {
            return Ok(None);
        }
        let exam = self.load_exam(ctx).await?;
        Ok(passed(self.score, exam.passing_marks))
    }

    async fn exam(&self, ctx: &Context<'_>) -> Result<Exam> {
        self.load_exam(ctx).await
    }

    /// Correctness is revealed to staff, and to the owner once the attempt is completed.
    async fn answers(&self, ctx: &Context<'_>) -> Result<Vec<ExamAnswer>> {
        // Attempts only resolve for their owner or staff.
        let reveal = is_staff(ctx) || self.completed_at.is_some();
        let mut answers = attempts::answers(pool(ctx).extend()?, self.id)
            .await
            .extend()?;
        for answer in &mut answers {
            answer.reveal = reveal;
        }
        Ok(answers)
    }
}

#[ComplexObject]
impl ExamAnswer {
    async fn is_correct(&self) -> Option<bool> {
        self.reveal.then_some(self.is_correct)
    }
}

#[derive(Default)]
pub struct AttemptQuery;

#[Object]
impl AttemptQuery {
    /// The owner or staff only.
    async fn exam_attempt(&self, ctx: &Context<'_>, id: i64) -> Result<Option<ExamAttempt>> {
        let user = current_user(ctx).await.extend()?;
        let attempt = attempts::find(pool(ctx).extend()?, id).await.extend()?;

        match attempt {
            Some(attempt) if !user.can_view(attempt.user_id) => {
                Err(AppError::Unauthorized("This attempt belongs to another user".to_string()))
                    .extend()
            }
            other => Ok(other),
        }
    }

    /// A user's attempts, newest first. Yourself, or any user for staff.
    async fn user_exam_attempts(
        &self,
        ctx: &Context<'_>,
        user_id: i64,
        exam_id: Option<i64>,
    ) -> Result<Vec<ExamAttempt>> {
        let user = current_user(ctx).await.extend()?;
        if !user.can_view(user_id) {
            return Err(AppError::Unauthorized(
                "Cannot list another user's attempts".to_string(),
            ))
            .extend();
        }
        attempts::for_user(pool(ctx).extend()?, user_id, exam_id)
            .await
            .extend()
    }

    async fn my_exam_attempts(
        &self,
        ctx: &Context<'_>,
        exam_id: Option<i64>,
    ) -> Result<Vec<ExamAttempt>> {
        let user = current_user(ctx).await.extend()?;
        attempts::for_user(pool(ctx).extend()?, user.id, exam_id)
            .await
            .extend()
    }
}

#[derive(Default)]
pub struct AttemptMutation;

#[Object]
impl AttemptMutation {
    /// Starts an attempt for the signed-in user.
    async fn start_exam_attempt(&self, ctx: &Context<'_>, exam_id: i64) -> Result<ExamAttempt> {
        let user = current_user(ctx).await.extend()?;
        attempts::start(pool(ctx).extend()?, &user, exam_id, policy(ctx)?)
            .await
            .extend()
    }

    /// Records an answer; resubmitting the same question overwrites it.
    async fn submit_exam_answer(
        &self,
        ctx: &Context<'_>,
        attempt_id: i64,
        question_id: i64,
        selected_answer: String,
    ) -> Result<ExamAnswer> {
        let user = current_user(ctx).await.extend()?;
        attempts::submit_answer(
            pool(ctx).extend()?,
            &user,
            attempt_id,
            question_id,
            &selected_answer,
            policy(ctx)?,
        )
        .await
        .extend()
    }

    /// Scores and closes the attempt.
    async fn complete_exam_attempt(
        &self,
        ctx: &Context<'_>,
        attempt_id: i64,
    ) -> Result<ExamAttempt> {
        let user = current_user(ctx).await.extend()?;
        attempts::complete(pool(ctx).extend()?, &user, attempt_id)
            .await
            .extend()
    }
}
