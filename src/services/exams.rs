// src/services/exams.rs

//! Exam assembly: exams, their ordered question sets, and course links.

use sqlx::{PgConnection, PgPool};

use crate::{
    error::{AppError, is_unique_violation},
    models::exam::{
        CourseExam, Exam, ExamDraft, ExamQuestion, UpdateExamInput, validate_question_marks,
    },
    utils::ordering::{self, Ordered},
};

pub const COLUMNS: &str = "id, title, description, duration_minutes, total_marks, passing_marks, \
                           exam_type, set_number, is_published, created_at, updated_at";
const EXAM_QUESTION_COLUMNS: &str = "id, exam_id, question_id, marks, position";
const COURSE_EXAM_COLUMNS: &str = "course_id, exam_id, display_order, is_required";

pub async fn find(
    pool: &PgPool,
    id: i64,
    include_unpublished: bool,
) -> Result<Option<Exam>, AppError> {
    let exam = sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE id = $1 AND ($2 OR is_published)"
    ))
    .bind(id)
    .bind(include_unpublished)
    .fetch_optional(pool)
    .await?;
    Ok(exam)
}

pub async fn list(pool: &PgPool, include_unpublished: bool) -> Result<Vec<Exam>, AppError> {
    let exams = sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE ($1 OR is_published) ORDER BY created_at DESC, id"
    ))
    .bind(include_unpublished)
    .fetch_all(pool)
    .await?;
    Ok(exams)
}

/// Locks the exam row so structural edits to its question set serialize.
async fn lock_exam(conn: &mut PgConnection, exam_id: i64) -> Result<(), AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM exams WHERE id = $1 FOR UPDATE")
        .bind(exam_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;
    Ok(())
}

/// New exams start unpublished.
pub async fn create(pool: &PgPool, draft: ExamDraft) -> Result<Exam, AppError> {
    let draft = draft.checked()?;
    let exam = sqlx::query_as::<_, Exam>(&format!(
        r#"
        INSERT INTO exams
            (title, description, duration_minutes, total_marks, passing_marks,
             exam_type, set_number)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.duration_minutes)
    .bind(draft.total_marks)
    .bind(draft.passing_marks)
    .bind(draft.exam_type)
    .bind(draft.set_number)
    .fetch_one(pool)
    .await?;

    tracing::info!(exam_id = exam.id, title = %exam.title, "Exam created");
    Ok(exam)
}

/// Merges the patch into the stored exam and re-validates the whole record.
pub async fn update(pool: &PgPool, id: i64, patch: UpdateExamInput) -> Result<Exam, AppError> {
    let mut tx = pool.begin().await?;
    let existing = sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

    let draft = ExamDraft::from_existing(&existing, patch).checked()?;
    let exam = sqlx::query_as::<_, Exam>(&format!(
        r#"
        UPDATE exams
        SET title = $2, description = $3, duration_minutes = $4, total_marks = $5,
            passing_marks = $6, exam_type = $7, set_number = $8, updated_at = NOW()
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.duration_minutes)
    .bind(draft.total_marks)
    .bind(draft.passing_marks)
    .bind(draft.exam_type)
    .bind(draft.set_number)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(exam_id = id, "Exam updated");
    Ok(exam)
}

pub async fn set_published(pool: &PgPool, id: i64, published: bool) -> Result<Exam, AppError> {
    let exam = sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET is_published = $2, updated_at = NOW() WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(published)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

    tracing::info!(exam_id = id, published, "Exam publication changed");
    Ok(exam)
}

/// Attempts keep their exam; an exam with attempts cannot be deleted.
pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    lock_exam(&mut *tx, id).await?;

    let attempted = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM exam_attempts WHERE exam_id = $1)",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    if attempted {
        return Err(AppError::Conflict(
            "Exam has attempts; unpublish it instead".to_string(),
        ));
    }

    sqlx::query("DELETE FROM exams WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(exam_id = id, "Exam deleted");
    Ok(())
}

// --- Question set ---

pub async fn questions(pool: &PgPool, exam_id: i64) -> Result<Vec<ExamQuestion>, AppError> {
    let rows = sqlx::query_as::<_, ExamQuestion>(&format!(
        "SELECT {EXAM_QUESTION_COLUMNS} FROM exam_questions
         WHERE exam_id = $1 ORDER BY position, id"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Sum of marks over the exam's questions.
pub async fn assigned_marks(pool: &PgPool, exam_id: i64) -> Result<i64, AppError> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(marks), 0)::BIGINT FROM exam_questions WHERE exam_id = $1",
    )
    .bind(exam_id)
    .fetch_one(pool)
    .await?;
    Ok(total)
}

/// Appends a question to the exam at position `n`.
pub async fn add_question(
    pool: &PgPool,
    exam_id: i64,
    question_id: i64,
    marks: i32,
) -> Result<ExamQuestion, AppError> {
    validate_question_marks(marks)?;

    let mut tx = pool.begin().await?;
    lock_exam(&mut *tx, exam_id).await?;

    let question_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM questions WHERE id = $1)")
            .bind(question_id)
            .fetch_one(&mut *tx)
            .await?;
    if !question_exists {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    let position = ordering::next_position(&mut *tx, Ordered::ExamQuestions, exam_id).await?;
    let row = sqlx::query_as::<_, ExamQuestion>(&format!(
        r#"
        INSERT INTO exam_questions (exam_id, question_id, marks, position)
        VALUES ($1, $2, $3, $4)
        RETURNING {EXAM_QUESTION_COLUMNS}
        "#
    ))
    .bind(exam_id)
    .bind(question_id)
    .bind(marks)
    .bind(position)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            return AppError::Conflict("Question is already in this exam".to_string());
        }
        AppError::from(e)
    })?;

    tx.commit().await?;
    tracing::info!(exam_id, question_id, marks, position, "Question added to exam");
    Ok(row)
}

pub async fn update_question_marks(
    pool: &PgPool,
    exam_id: i64,
    question_id: i64,
    marks: i32,
) -> Result<ExamQuestion, AppError> {
    validate_question_marks(marks)?;
    sqlx::query_as::<_, ExamQuestion>(&format!(
        "UPDATE exam_questions SET marks = $3 WHERE exam_id = $1 AND question_id = $2 \
         RETURNING {EXAM_QUESTION_COLUMNS}"
    ))
    .bind(exam_id)
    .bind(question_id)
    .bind(marks)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Question is not part of this exam".to_string()))
}

/// Removes the association and renumbers the remaining questions `0..n-1`.
pub async fn remove_question(
    pool: &PgPool,
    exam_id: i64,
    question_id: i64,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    lock_exam(&mut *tx, exam_id).await?;

    let result = sqlx::query("DELETE FROM exam_questions WHERE exam_id = $1 AND question_id = $2")
        .bind(exam_id)
        .bind(question_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question is not part of this exam".to_string()));
    }

    ordering::compact(&mut *tx, Ordered::ExamQuestions, exam_id).await?;
    tx.commit().await?;

    tracing::info!(exam_id, question_id, "Question removed from exam");
    Ok(())
}

/// `question_ids` must be a permutation of the exam's current question ids.
pub async fn reorder_questions(
    pool: &PgPool,
    exam_id: i64,
    question_ids: &[i64],
) -> Result<Vec<ExamQuestion>, AppError> {
    let mut tx = pool.begin().await?;
    lock_exam(&mut *tx, exam_id).await?;
    ordering::reorder(&mut *tx, Ordered::ExamQuestions, exam_id, question_ids).await?;
    tx.commit().await?;

    questions(pool, exam_id).await
}

// --- Course links ---

/// Links the exam to a course, or updates an existing link.
pub async fn link_course(
    pool: &PgPool,
    exam_id: i64,
    course_id: i64,
    display_order: i32,
    is_required: bool,
) -> Result<CourseExam, AppError> {
    let mut tx = pool.begin().await?;
    lock_exam(&mut *tx, exam_id).await?;

    let course_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM courses WHERE id = $1)")
            .bind(course_id)
            .fetch_one(&mut *tx)
            .await?;
    if !course_exists {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    let link = sqlx::query_as::<_, CourseExam>(&format!(
        r#"
        INSERT INTO course_exams (course_id, exam_id, display_order, is_required)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (course_id, exam_id) DO UPDATE
        SET display_order = EXCLUDED.display_order, is_required = EXCLUDED.is_required
        RETURNING {COURSE_EXAM_COLUMNS}
        "#
    ))
    .bind(course_id)
    .bind(exam_id)
    .bind(display_order)
    .bind(is_required)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(exam_id, course_id, "Exam linked to course");
    Ok(link)
}

pub async fn unlink_course(pool: &PgPool, exam_id: i64, course_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM course_exams WHERE exam_id = $1 AND course_id = $2")
        .bind(exam_id)
        .bind(course_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam is not linked to this course".to_string()));
    }
    Ok(())
}

/// A course's exam links in display order; learners only see published exams.
pub async fn links_for_course(
    pool: &PgPool,
    course_id: i64,
    include_unpublished: bool,
) -> Result<Vec<CourseExam>, AppError> {
    let links = sqlx::query_as::<_, CourseExam>(
        r#"
        SELECT ce.course_id, ce.exam_id, ce.display_order, ce.is_required
        FROM course_exams ce
        JOIN exams e ON e.id = ce.exam_id
        WHERE ce.course_id = $1 AND ($2 OR e.is_published)
        ORDER BY ce.display_order, ce.exam_id
        "#,
    )
    .bind(course_id)
    .bind(include_unpublished)
    .fetch_all(pool)
    .await?;
    Ok(links)
}

pub async fn links_for_exam(pool: &PgPool, exam_id: i64) -> Result<Vec<CourseExam>, AppError> {
    let links = sqlx::query_as::<_, CourseExam>(&format!(
        "SELECT {COURSE_EXAM_COLUMNS} FROM course_exams WHERE exam_id = $1 ORDER BY course_id"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await?;
    Ok(links)
}
