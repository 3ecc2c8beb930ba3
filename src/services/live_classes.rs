// src/services/live_classes.rs

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, is_foreign_key_violation},
    models::live_class::{LiveClass, LiveClassDraft, UpdateLiveClassInput, check_cancel},
};

pub const COLUMNS: &str = "id, course_id, mentor_id, title, description, scheduled_at, \
                           duration_minutes, meeting_url, is_cancelled, created_at";

/// Ordered by start time. `upcoming_only` drops cancelled and finished classes.
pub async fn list(
    pool: &PgPool,
    course_id: Option<i64>,
    upcoming_only: bool,
) -> Result<Vec<LiveClass>, AppError> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {COLUMNS} FROM live_classes WHERE 1=1"));
    if let Some(course_id) = course_id {
        builder.push(" AND course_id = ").push_bind(course_id);
    }
    if upcoming_only {
        builder.push(
            " AND NOT is_cancelled \
             AND scheduled_at + make_interval(mins => duration_minutes) > NOW()",
        );
    }
    builder.push(" ORDER BY scheduled_at, id");

    let classes = builder.build_query_as::<LiveClass>().fetch_all(pool).await?;
    Ok(classes)
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<LiveClass>, AppError> {
    let class = sqlx::query_as::<_, LiveClass>(&format!(
        "SELECT {COLUMNS} FROM live_classes WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(class)
}

async fn lock(conn: &mut PgConnection, id: i64) -> Result<LiveClass, AppError> {
    sqlx::query_as::<_, LiveClass>(&format!(
        "SELECT {COLUMNS} FROM live_classes WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Live class not found".to_string()))
}

fn write_error(e: sqlx::Error) -> AppError {
    if is_foreign_key_violation(&e) {
        return AppError::InvalidReference("Course does not exist".to_string());
    }
    AppError::from(e)
}

/// Schedules a class hosted by `mentor_id`.
pub async fn schedule(
    pool: &PgPool,
    mentor_id: i64,
    draft: LiveClassDraft,
) -> Result<LiveClass, AppError> {
    let draft = draft.checked()?;
    let class = sqlx::query_as::<_, LiveClass>(&format!(
        r#"
        INSERT INTO live_classes
            (course_id, mentor_id, title, description, scheduled_at, duration_minutes, meeting_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(draft.course_id)
    .bind(mentor_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.scheduled_at)
    .bind(draft.duration_minutes)
    .bind(&draft.meeting_url)
    .fetch_one(pool)
    .await
    .map_err(write_error)?;

    tracing::info!(live_class_id = class.id, mentor_id, "Live class scheduled");
    Ok(class)
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    patch: UpdateLiveClassInput,
) -> Result<LiveClass, AppError> {
    let mut tx = pool.begin().await?;
    let existing = lock(&mut *tx, id).await?;
    let draft = LiveClassDraft::from_existing(&existing, patch).checked()?;

    let class = sqlx::query_as::<_, LiveClass>(&format!(
        r#"
        UPDATE live_classes
        SET course_id = $2, title = $3, description = $4, scheduled_at = $5,
            duration_minutes = $6, meeting_url = $7
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(draft.course_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.scheduled_at)
    .bind(draft.duration_minutes)
    .bind(&draft.meeting_url)
    .fetch_one(&mut *tx)
    .await
    .map_err(write_error)?;

    tx.commit().await?;
    Ok(class)
}

pub async fn cancel(pool: &PgPool, id: i64) -> Result<LiveClass, AppError> {
    let mut tx = pool.begin().await?;
    let class = lock(&mut *tx, id).await?;
    check_cancel(&class)?;

    let cancelled = sqlx::query_as::<_, LiveClass>(&format!(
        "UPDATE live_classes SET is_cancelled = TRUE WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(live_class_id = id, "Live class cancelled");
    Ok(cancelled)
}
