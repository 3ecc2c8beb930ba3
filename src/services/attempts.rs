// src/services/attempts.rs

//! Attempt persistence. Transition rules live in `models::attempt`; this
//! module runs them inside transactions that hold the attempt row lock.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        attempt::{
            AttemptPolicy, ExamAnswer, ExamAttempt, GradedAnswer, MarkedQuestion, OpenAttempt,
            check_complete, check_submit, classify_open_attempt, compute_score,
        },
        question::Question,
        user::CurrentUser,
    },
};

pub const COLUMNS: &str = "id, exam_id, user_id, started_at, completed_at, score";
const ANSWER_COLUMNS: &str =
    "id, attempt_id, question_id, selected_answer, is_correct, answered_at";

/// Longest answer text accepted.
const MAX_ANSWER_LEN: usize = 1000;

/// Fields of the exam that attempt rules depend on.
#[derive(Debug, sqlx::FromRow)]
struct ExamTiming {
    duration_minutes: i32,
    is_published: bool,
}

async fn exam_timing(
    conn: &mut PgConnection,
    exam_id: i64,
) -> Result<Option<ExamTiming>, AppError> {
    let timing = sqlx::query_as::<_, ExamTiming>(
        "SELECT duration_minutes, is_published FROM exams WHERE id = $1",
    )
    .bind(exam_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(timing)
}

async fn lock_attempt(conn: &mut PgConnection, attempt_id: i64) -> Result<ExamAttempt, AppError> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts WHERE id = $1 FOR UPDATE"
    ))
    .bind(attempt_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))
}

/// Scores the attempt against the exam's current question set and closes it.
/// The caller holds the row lock and has checked the transition.
async fn finalize(
    conn: &mut PgConnection,
    attempt_id: i64,
    exam_id: i64,
) -> Result<ExamAttempt, AppError> {
    let questions = sqlx::query_as::<_, MarkedQuestion>(
        "SELECT question_id, marks FROM exam_questions WHERE exam_id = $1",
    )
    .bind(exam_id)
    .fetch_all(&mut *conn)
    .await?;

    let answers = sqlx::query_as::<_, GradedAnswer>(
        "SELECT question_id, is_correct FROM exam_answers WHERE attempt_id = $1",
    )
    .bind(attempt_id)
    .fetch_all(&mut *conn)
    .await?;

    let score = compute_score(&questions, &answers);

    let attempt = sqlx::query_as::<_, ExamAttempt>(&format!(
        "UPDATE exam_attempts SET completed_at = NOW(), score = $2
         WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(attempt_id)
    .bind(score)
    .fetch_one(&mut *conn)
    .await?;

    tracing::info!(
        attempt_id,
        exam_id,
        score,
        answered = answers.len(),
        questions = questions.len(),
        "Attempt completed"
    );
    Ok(attempt)
}

/// Starts an attempt for the caller.
///
/// An open attempt past its deadline is graded and closed first; a still
/// running one blocks the start.
pub async fn start(
    pool: &PgPool,
    user: &CurrentUser,
    exam_id: i64,
    policy: &AttemptPolicy,
) -> Result<ExamAttempt, AppError> {
    let mut tx = pool.begin().await?;

    let exam = exam_timing(&mut *tx, exam_id)
        .await?
        .filter(|e| e.is_published)
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

    let question_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM exam_questions WHERE exam_id = $1")
            .bind(exam_id)
            .fetch_one(&mut *tx)
            .await?;
    if question_count == 0 {
        return Err(AppError::InvalidState("Exam has no questions yet".to_string()));
    }

    let open = sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts \
         WHERE user_id = $1 AND exam_id = $2 AND completed_at IS NULL FOR UPDATE"
    ))
    .bind(user.id)
    .bind(exam_id)
    .fetch_optional(&mut *tx)
    .await?;

    match classify_open_attempt(open.as_ref(), exam.duration_minutes, policy, Utc::now()) {
        OpenAttempt::None => {}
        OpenAttempt::Expired(stale_id) => {
            tracing::info!(attempt_id = stale_id, "Closing expired attempt before restart");
            finalize(&mut *tx, stale_id, exam_id).await?;
        }
        OpenAttempt::Active(open_id) => {
            return Err(AppError::InvalidState(format!(
                "Attempt {open_id} on this exam is still in progress"
            )));
        }
    }

    let attempt = sqlx::query_as::<_, ExamAttempt>(&format!(
        "INSERT INTO exam_attempts (exam_id, user_id) VALUES ($1, $2) RETURNING {COLUMNS}"
    ))
    .bind(exam_id)
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        // A concurrent start won the partial unique index.
        if is_unique_violation(&e) {
            return AppError::InvalidState(
                "An attempt on this exam is already in progress".to_string(),
            );
        }
        AppError::from(e)
    })?;

    tx.commit().await?;
    tracing::info!(attempt_id = attempt.id, exam_id, user_id = user.id, "Attempt started");
    Ok(attempt)
}

/// Records (or overwrites) the caller's answer to one question.
pub async fn submit_answer(
    pool: &PgPool,
    user: &CurrentUser,
    attempt_id: i64,
    question_id: i64,
    selected_answer: &str,
    policy: &AttemptPolicy,
) -> Result<ExamAnswer, AppError> {
    if selected_answer.chars().count() > MAX_ANSWER_LEN {
        return Err(AppError::InvalidInput(format!(
            "Answer must be at most {MAX_ANSWER_LEN} characters"
        )));
    }

    let mut tx = pool.begin().await?;
    let attempt = lock_attempt(&mut *tx, attempt_id).await?;

    let exam = exam_timing(&mut *tx, attempt.exam_id)
        .await?
        .ok_or_else(|| AppError::InternalServerError("Attempt without exam".to_string()))?;
    check_submit(&attempt, user, exam.duration_minutes, policy, Utc::now())?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT q.id, q.question_text, q.question_type, q.options, q.correct_answer,
               q.explanation, q.difficulty, q.subject_id, q.topic_id, q.created_at, q.updated_at
        FROM questions q
        JOIN exam_questions eq ON eq.question_id = q.id
        WHERE eq.exam_id = $1 AND q.id = $2
        "#,
    )
    .bind(attempt.exam_id)
    .bind(question_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        AppError::InvalidReference(format!("Question {question_id} is not part of this exam"))
    })?;

    let is_correct = question.grade(selected_answer);

    let answer = sqlx::query_as::<_, ExamAnswer>(&format!(
        r#"
        INSERT INTO exam_answers (attempt_id, question_id, selected_answer, is_correct)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (attempt_id, question_id) DO UPDATE
        SET selected_answer = EXCLUDED.selected_answer,
            is_correct = EXCLUDED.is_correct,
            answered_at = NOW()
        RETURNING {ANSWER_COLUMNS}
        "#
    ))
    .bind(attempt_id)
    .bind(question_id)
    .bind(selected_answer)
    .bind(is_correct)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::debug!(attempt_id, question_id, "Answer recorded");
    Ok(answer)
}

/// Grades and closes the caller's attempt. Allowed past the deadline.
pub async fn complete(
    pool: &PgPool,
    user: &CurrentUser,
    attempt_id: i64,
) -> Result<ExamAttempt, AppError> {
    let mut tx = pool.begin().await?;
    let attempt = lock_attempt(&mut *tx, attempt_id).await?;
    check_complete(&attempt, user)?;

    let completed = finalize(&mut *tx, attempt.id, attempt.exam_id).await?;
    tx.commit().await?;
    Ok(completed)
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<ExamAttempt>, AppError> {
    let attempt = sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(attempt)
}

/// A user's attempts, newest first.
pub async fn for_user(
    pool: &PgPool,
    user_id: i64,
    exam_id: Option<i64>,
) -> Result<Vec<ExamAttempt>, AppError> {
    let attempts = sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts \
         WHERE user_id = $1 AND ($2::BIGINT IS NULL OR exam_id = $2) \
         ORDER BY started_at DESC, id DESC"
    ))
    .bind(user_id)
    .bind(exam_id)
    .fetch_all(pool)
    .await?;
    Ok(attempts)
}

pub async fn answers(pool: &PgPool, attempt_id: i64) -> Result<Vec<ExamAnswer>, AppError> {
    let answers = sqlx::query_as::<_, ExamAnswer>(&format!(
        "SELECT {ANSWER_COLUMNS} FROM exam_answers WHERE attempt_id = $1 ORDER BY question_id"
    ))
    .bind(attempt_id)
    .fetch_all(pool)
    .await?;
    Ok(answers)
}
