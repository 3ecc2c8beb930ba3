// tests/ordering_tests.rs

//! Position bookkeeping under concurrency, driven through the service layer.
//! Skipped when `DATABASE_URL` is not set.

use std::time::Duration;

use entrance_pathway::{
    models::catalog::{
        ChapterDraft, CourseDraft, CreateCourseInput, CreateLessonInput, LessonDraft,
    },
    services::catalog,
};
use sqlx::{PgPool, postgres::PgPoolOptions};

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some(pool)
}

async fn course_with_chapters(pool: &PgPool, count: usize) -> (i64, Vec<i64>) {
    let slug = format!("course-{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let course = catalog::create_course(
        pool,
        CourseDraft::from(CreateCourseInput {
            title: "Chemistry".to_string(),
            slug,
            description: None,
            thumbnail_url: None,
        }),
    )
    .await
    .unwrap();

    let mut ids = Vec::new();
    for n in 0..count {
        let draft = ChapterDraft::new(format!("Chapter {n}"), None);
        let chapter = catalog::create_chapter(pool, course.id, draft).await.unwrap();
        ids.push(chapter.id);
    }
    (course.id, ids)
}

async fn positions(pool: &PgPool, sql: &str, parent_id: i64) -> Vec<i32> {
    sqlx::query_scalar::<_, i32>(sql)
        .bind(parent_id)
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn chapter_delete_waits_for_a_concurrent_append() {
    let Some(pool) = test_pool().await else { return };
    let (course_id, chapters) = course_with_chapters(&pool, 3).await;

    // An append in flight: course locked, next position already counted.
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
        .bind(course_id)
        .execute(&mut *tx)
        .await
        .unwrap();
    let next: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chapters WHERE course_id = $1")
        .bind(course_id)
        .fetch_one(&mut *tx)
        .await
        .unwrap();

    let delete_pool = pool.clone();
    let first = chapters[0];
    let delete =
        tokio::spawn(async move { catalog::delete_chapter(&delete_pool, first).await });

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!delete.is_finished(), "delete must wait for the course lock");

    sqlx::query("INSERT INTO chapters (course_id, title, position) VALUES ($1, 'Appended', $2)")
        .bind(course_id)
        .bind(next as i32)
        .execute(&mut *tx)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    delete.await.unwrap().unwrap();

    let stored = positions(
        &pool,
        "SELECT position FROM chapters WHERE course_id = $1 ORDER BY position",
        course_id,
    )
    .await;
    assert_eq!(stored, vec![0, 1, 2]);
}

#[tokio::test]
async fn lesson_delete_waits_for_a_concurrent_append() {
    let Some(pool) = test_pool().await else { return };
    let (_, chapters) = course_with_chapters(&pool, 1).await;
    let chapter_id = chapters[0];

    let mut lessons = Vec::new();
    for n in 0..3 {
        let draft = LessonDraft::from(CreateLessonInput {
            chapter_id,
            title: format!("Lesson {n}"),
            content: None,
            video_url: None,
            duration_minutes: None,
        });
        let lesson = catalog::create_lesson(&pool, chapter_id, draft).await.unwrap();
        lessons.push(lesson.id);
    }

    let mut tx = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM chapters WHERE id = $1 FOR UPDATE")
        .bind(chapter_id)
        .execute(&mut *tx)
        .await
        .unwrap();

    let delete_pool = pool.clone();
    let middle = lessons[1];
    let delete = tokio::spawn(async move { catalog::delete_lesson(&delete_pool, middle).await });

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!delete.is_finished(), "delete must wait for the chapter lock");

    sqlx::query("INSERT INTO lessons (chapter_id, title, position) VALUES ($1, 'Appended', 3)")
        .bind(chapter_id)
        .execute(&mut *tx)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    delete.await.unwrap().unwrap();

    let stored = positions(
        &pool,
        "SELECT position FROM lessons WHERE chapter_id = $1 ORDER BY position",
        chapter_id,
    )
    .await;
    assert_eq!(stored, vec![0, 1, 2]);
}

#[tokio::test]
async fn deleting_a_missing_chapter_is_not_found() {
    let Some(pool) = test_pool().await else { return };
    let err = catalog::delete_chapter(&pool, i64::MAX).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}
