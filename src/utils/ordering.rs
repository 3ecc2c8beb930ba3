// src/utils/ordering.rs

//! Dense `position` columns for ordered children (chapters in a course,
//! lessons in a chapter, questions in an exam).
//!
//! Positions always form `0..n-1`. Every structural change (insert, delete,
//! reorder) goes through here inside the caller's transaction.

use std::collections::HashSet;

use sqlx::PgConnection;

use crate::error::AppError;

/// An ordered child table: rows keyed by `key` inside a `parent` group.
#[derive(Debug, Clone, Copy)]
pub enum Ordered {
    Chapters,
    Lessons,
    ExamQuestions,
}

impl Ordered {
    fn table(self) -> &'static str {
        match self {
            Ordered::Chapters => "chapters",
            Ordered::Lessons => "lessons",
            Ordered::ExamQuestions => "exam_questions",
        }
    }

    fn parent(self) -> &'static str {
        match self {
            Ordered::Chapters => "course_id",
            Ordered::Lessons => "chapter_id",
            Ordered::ExamQuestions => "exam_id",
        }
    }

    /// Exam questions are addressed by question id, the rest by row id.
    fn key(self) -> &'static str {
        match self {
            Ordered::ExamQuestions => "question_id",
            Ordered::Chapters | Ordered::Lessons => "id",
        }
    }
}

/// Checks that `requested` lists exactly the ids in `current`, once each.
pub fn validate_permutation(current: &[i64], requested: &[i64]) -> Result<(), AppError> {
    if current.len() != requested.len() {
        return Err(AppError::InvalidInput(format!(
            "Expected {} ids, got {}",
            current.len(),
            requested.len()
        )));
    }

    let mut seen = HashSet::with_capacity(requested.len());
    for id in requested {
        if !seen.insert(*id) {
            return Err(AppError::InvalidInput(format!("Id {id} appears more than once")));
        }
    }

    let existing: HashSet<i64> = current.iter().copied().collect();
    if let Some(stranger) = requested.iter().find(|id| !existing.contains(id)) {
        return Err(AppError::InvalidInput(format!(
            "Id {stranger} does not belong to this collection"
        )));
    }

    Ok(())
}

/// Pairs each key with its index.
pub fn dense_positions(ordered_keys: &[i64]) -> Vec<(i64, i32)> {
    ordered_keys
        .iter()
        .enumerate()
        .map(|(idx, key)| (*key, idx as i32))
        .collect()
}

/// Keys of a parent group in display order.
pub async fn load_keys(
    conn: &mut PgConnection,
    ordered: Ordered,
    parent_id: i64,
) -> Result<Vec<i64>, AppError> {
    let sql = format!(
        "SELECT {key} FROM {table} WHERE {parent} = $1 ORDER BY position, id",
        key = ordered.key(),
        table = ordered.table(),
        parent = ordered.parent(),
    );

    let keys = sqlx::query_scalar::<_, i64>(&sql)
        .bind(parent_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(keys)
}

/// Rewrites `position` so it matches the index of each key in `ordered_keys`.
pub async fn write_positions(
    conn: &mut PgConnection,
    ordered: Ordered,
    parent_id: i64,
    ordered_keys: &[i64],
) -> Result<(), AppError> {
    if ordered_keys.is_empty() {
        return Ok(());
    }

    let (keys, positions): (Vec<i64>, Vec<i32>) = dense_positions(ordered_keys).into_iter().unzip();
    let sql = format!(
        r#"
        UPDATE {table} AS t
        SET position = data.pos
        FROM UNNEST($2::BIGINT[], $3::INT[]) AS data(key, pos)
        WHERE t.{parent} = $1 AND t.{key} = data.key
        "#,
        table = ordered.table(),
        parent = ordered.parent(),
        key = ordered.key(),
    );

    sqlx::query(&sql)
        .bind(parent_id)
        .bind(keys)
        .bind(positions)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Closes gaps left by a delete.
pub async fn compact(
    conn: &mut PgConnection,
    ordered: Ordered,
    parent_id: i64,
) -> Result<(), AppError> {
    let keys = load_keys(conn, ordered, parent_id).await?;
    write_positions(conn, ordered, parent_id, &keys).await
}

/// Validates `requested` against the stored order, then applies it.
pub async fn reorder(
    conn: &mut PgConnection,
    ordered: Ordered,
    parent_id: i64,
    requested: &[i64],
) -> Result<(), AppError> {
    let current = load_keys(conn, ordered, parent_id).await?;
    validate_permutation(&current, requested)?;
    write_positions(conn, ordered, parent_id, requested).await
}

/// Position for a row appended to the group.
pub async fn next_position(
    conn: &mut PgConnection,
    ordered: Ordered,
    parent_id: i64,
) -> Result<i32, AppError> {
    let sql = format!(
        "SELECT COUNT(*) FROM {table} WHERE {parent} = $1",
        table = ordered.table(),
        parent = ordered.parent(),
    );

    let count = sqlx::query_scalar::<_, i64>(&sql)
        .bind(parent_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(count as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permutation_accepts_reordering() {
        assert!(validate_permutation(&[4, 7, 9], &[9, 4, 7]).is_ok());
        assert!(validate_permutation(&[], &[]).is_ok());
    }

    #[test]
    fn test_permutation_rejects_missing_or_extra_ids() {
        assert!(validate_permutation(&[4, 7, 9], &[9, 4]).is_err());
        assert!(validate_permutation(&[4, 7], &[4, 8]).is_err());
    }

    #[test]
    fn test_permutation_rejects_duplicates() {
        let err = validate_permutation(&[4, 7], &[4, 4]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_dense_positions_follow_index() {
        assert_eq!(dense_positions(&[12, 3, 40]), vec![(12, 0), (3, 1), (40, 2)]);
    }
}
