// src/services/questions.rs

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::{AppError, is_foreign_key_violation},
    models::question::{
        CreateQuestionInput, Question, QuestionDraft, QuestionFilter, UpdateQuestionInput,
    },
};

pub const COLUMNS: &str = "id, question_text, question_type, options, correct_answer, \
                           explanation, difficulty, subject_id, topic_id, created_at, updated_at";

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Clamps client paging to `1..=MAX_PAGE_SIZE` rows from a non-negative offset.
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Question>, AppError> {
    let question = sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(question)
}

pub async fn list(
    pool: &PgPool,
    filter: &QuestionFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Question>, AppError> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {COLUMNS} FROM questions WHERE 1=1"));

    if let Some(subject_id) = filter.subject_id {
        builder.push(" AND subject_id = ").push_bind(subject_id);
    }
    if let Some(topic_id) = filter.topic_id {
        builder.push(" AND topic_id = ").push_bind(topic_id);
    }
    if let Some(difficulty) = filter.difficulty {
        builder.push(" AND difficulty = ").push_bind(difficulty);
    }
    if let Some(question_type) = filter.question_type {
        builder.push(" AND question_type = ").push_bind(question_type);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder
            .push(" AND question_text ILIKE ")
            .push_bind(format!("%{}%", escape_like(search)));
    }

    builder
        .push(" ORDER BY id LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let questions = builder.build_query_as::<Question>().fetch_all(pool).await?;
    Ok(questions)
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// The subject must exist and the topic, if any, must belong to it.
async fn check_references(
    conn: &mut PgConnection,
    subject_id: i64,
    topic_id: Option<i64>,
) -> Result<(), AppError> {
    let subject_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM subjects WHERE id = $1)")
            .bind(subject_id)
            .fetch_one(&mut *conn)
            .await?;
    if !subject_exists {
        return Err(AppError::InvalidReference(format!(
            "Subject {subject_id} does not exist"
        )));
    }

    if let Some(topic_id) = topic_id {
        let owner = sqlx::query_scalar::<_, i64>("SELECT subject_id FROM topics WHERE id = $1")
            .bind(topic_id)
            .fetch_optional(&mut *conn)
            .await?;
        match owner {
            None => {
                return Err(AppError::InvalidReference(format!(
                    "Topic {topic_id} does not exist"
                )));
            }
            Some(owner) if owner != subject_id => {
                return Err(AppError::InvalidReference(format!(
                    "Topic {topic_id} does not belong to subject {subject_id}"
                )));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

pub async fn create(pool: &PgPool, input: CreateQuestionInput) -> Result<Question, AppError> {
    let question = QuestionDraft::from(input).into_canonical()?;
    let mut tx = pool.begin().await?;
    check_references(&mut *tx, question.subject_id, question.topic_id).await?;

    let created = sqlx::query_as::<_, Question>(&format!(
        r#"
        INSERT INTO questions
            (question_text, question_type, options, correct_answer, explanation,
             difficulty, subject_id, topic_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&question.question_text)
    .bind(question.question_type)
    .bind(Json(&question.options))
    .bind(&question.correct_answer)
    .bind(&question.explanation)
    .bind(question.difficulty)
    .bind(question.subject_id)
    .bind(question.topic_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(question_id = created.id, "Question created");
    Ok(created)
}

/// Merges the patch into the stored question, re-validates and saves it.
pub async fn update(
    pool: &PgPool,
    id: i64,
    patch: UpdateQuestionInput,
) -> Result<Question, AppError> {
    let mut tx = pool.begin().await?;
    let existing = sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    let question = QuestionDraft::from_existing(&existing, patch).into_canonical()?;
    check_references(&mut *tx, question.subject_id, question.topic_id).await?;

    let updated = sqlx::query_as::<_, Question>(&format!(
        r#"
        UPDATE questions
        SET question_text = $2, question_type = $3, options = $4, correct_answer = $5,
            explanation = $6, difficulty = $7, subject_id = $8, topic_id = $9,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&question.question_text)
    .bind(question.question_type)
    .bind(Json(&question.options))
    .bind(&question.correct_answer)
    .bind(&question.explanation)
    .bind(question.difficulty)
    .bind(question.subject_id)
    .bind(question.topic_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(question_id = id, "Question updated");
    Ok(updated)
}

/// Fails with `Conflict` while an exam includes the question or an answer points at it.
pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let in_exam = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM exam_questions WHERE question_id = $1)",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    if in_exam {
        return Err(AppError::Conflict(
            "Question is part of an exam; remove it from the exam first".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                return AppError::Conflict("Question has recorded answers".to_string());
            }
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }
    tracing::info!(question_id = id, "Question deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds_defaults_and_clamps() {
        assert_eq!(page_bounds(None, None), (50, 0));
        assert_eq!(page_bounds(Some(1000), Some(-3)), (200, 0));
        assert_eq!(page_bounds(Some(0), Some(40)), (1, 40));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_sure\\"), "100\\%\\_sure\\\\");
    }
}
