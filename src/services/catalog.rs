// src/services/catalog.rs

//! Courses, chapters, lessons, subjects, topics and notes.
//!
//! Every list takes `include_unpublished`; learners pass `false` and never
//! see draft content.

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, is_foreign_key_violation, is_unique_violation},
    models::catalog::{
        Chapter, ChapterDraft, Course, CourseDraft, Lesson, LessonDraft, NamedDraft, Note,
        NoteDraft, Subject, Topic, UpdateChapterInput, UpdateCourseInput, UpdateLessonInput,
        UpdateNamedInput, UpdateNoteInput,
    },
    utils::ordering::{self, Ordered},
};

const SUBJECT_COLUMNS: &str = "id, name, description, created_at";
const TOPIC_COLUMNS: &str = "id, subject_id, name, description, created_at";
const COURSE_COLUMNS: &str =
    "id, title, slug, description, thumbnail_url, is_published, created_at, updated_at";
const CHAPTER_COLUMNS: &str =
    "id, course_id, title, description, position, is_published, created_at";
const LESSON_COLUMNS: &str = "id, chapter_id, title, content, video_url, duration_minutes, \
                              position, is_published, created_at";
const NOTE_COLUMNS: &str =
    "id, title, description, file_url, subject_id, course_id, is_published, created_at";

// --- Subjects ---

pub async fn list_subjects(pool: &PgPool) -> Result<Vec<Subject>, AppError> {
    let subjects = sqlx::query_as::<_, Subject>(&format!(
        "SELECT {SUBJECT_COLUMNS} FROM subjects ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;
    Ok(subjects)
}

pub async fn find_subject(pool: &PgPool, id: i64) -> Result<Option<Subject>, AppError> {
    let subject = sqlx::query_as::<_, Subject>(&format!(
        "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(subject)
}

pub async fn create_subject(pool: &PgPool, draft: NamedDraft) -> Result<Subject, AppError> {
    let draft = draft.checked()?;
    let subject = sqlx::query_as::<_, Subject>(&format!(
        "INSERT INTO subjects (name, description) VALUES ($1, $2) RETURNING {SUBJECT_COLUMNS}"
    ))
    .bind(&draft.name)
    .bind(&draft.description)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            return AppError::Conflict(format!("Subject '{}' already exists", draft.name));
        }
        AppError::from(e)
    })?;

    tracing::info!(subject_id = subject.id, "Subject created");
    Ok(subject)
}

pub async fn update_subject(
    pool: &PgPool,
    id: i64,
    patch: UpdateNamedInput,
) -> Result<Subject, AppError> {
    let mut tx = pool.begin().await?;
    let existing = sqlx::query_as::<_, Subject>(&format!(
        "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Subject not found".to_string()))?;

    let draft =
        NamedDraft::patched(&existing.name, existing.description.as_deref(), patch).checked()?;
    let subject = sqlx::query_as::<_, Subject>(&format!(
        "UPDATE subjects SET name = $2, description = $3 WHERE id = $1 RETURNING {SUBJECT_COLUMNS}"
    ))
    .bind(id)
    .bind(&draft.name)
    .bind(&draft.description)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            return AppError::Conflict(format!("Subject '{}' already exists", draft.name));
        }
        AppError::from(e)
    })?;

    tx.commit().await?;
    Ok(subject)
}

/// Fails with `Conflict` while questions still reference the subject.
pub async fn delete_subject(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                return AppError::Conflict(
                    "Subject is still referenced by questions".to_string(),
                );
            }
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Subject not found".to_string()));
    }
    tracing::info!(subject_id = id, "Subject deleted");
    Ok(())
}

// --- Topics ---

pub async fn topics_for_subject(pool: &PgPool, subject_id: i64) -> Result<Vec<Topic>, AppError> {
    let topics = sqlx::query_as::<_, Topic>(&format!(
        "SELECT {TOPIC_COLUMNS} FROM topics WHERE subject_id = $1 ORDER BY name"
    ))
    .bind(subject_id)
    .fetch_all(pool)
    .await?;
    Ok(topics)
}

pub async fn find_topic(pool: &PgPool, id: i64) -> Result<Option<Topic>, AppError> {
    let topic = sqlx::query_as::<_, Topic>(&format!(
        "SELECT {TOPIC_COLUMNS} FROM topics WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(topic)
}

fn topic_write_error(e: sqlx::Error, name: &str) -> AppError {
    if is_unique_violation(&e) {
        return AppError::Conflict(format!("Topic '{name}' already exists in this subject"));
    }
    if is_foreign_key_violation(&e) {
        return AppError::InvalidReference("Subject does not exist".to_string());
    }
    AppError::from(e)
}

pub async fn create_topic(
    pool: &PgPool,
    subject_id: i64,
    draft: NamedDraft,
) -> Result<Topic, AppError> {
    let draft = draft.checked()?;
    let topic = sqlx::query_as::<_, Topic>(&format!(
        "INSERT INTO topics (subject_id, name, description) VALUES ($1, $2, $3) \
         RETURNING {TOPIC_COLUMNS}"
    ))
    .bind(subject_id)
    .bind(&draft.name)
    .bind(&draft.description)
    .fetch_one(pool)
    .await
    .map_err(|e| topic_write_error(e, &draft.name))?;

    tracing::info!(topic_id = topic.id, subject_id, "Topic created");
    Ok(topic)
}

pub async fn update_topic(
    pool: &PgPool,
    id: i64,
    patch: UpdateNamedInput,
) -> Result<Topic, AppError> {
    let mut tx = pool.begin().await?;
    let existing = sqlx::query_as::<_, Topic>(&format!(
        "SELECT {TOPIC_COLUMNS} FROM topics WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Topic not found".to_string()))?;

    let draft =
        NamedDraft::patched(&existing.name, existing.description.as_deref(), patch).checked()?;
    let topic = sqlx::query_as::<_, Topic>(&format!(
        "UPDATE topics SET name = $2, description = $3 WHERE id = $1 RETURNING {TOPIC_COLUMNS}"
    ))
    .bind(id)
    .bind(&draft.name)
    .bind(&draft.description)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| topic_write_error(e, &draft.name))?;

    tx.commit().await?;
    Ok(topic)
}

/// Questions tagged with the topic keep their subject and lose the tag.
pub async fn delete_topic(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM topics WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Topic not found".to_string()));
    }
    Ok(())
}

// --- Courses ---

pub async fn list_courses(
    pool: &PgPool,
    include_unpublished: bool,
) -> Result<Vec<Course>, AppError> {
    let courses = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses
         WHERE ($1 OR is_published) ORDER BY created_at DESC, id"
    ))
    .bind(include_unpublished)
    .fetch_all(pool)
    .await?;
    Ok(courses)
}

pub async fn find_course(
    pool: &PgPool,
    id: i64,
    include_unpublished: bool,
) -> Result<Option<Course>, AppError> {
    let course = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 AND ($2 OR is_published)"
    ))
    .bind(id)
    .bind(include_unpublished)
    .fetch_optional(pool)
    .await?;
    Ok(course)
}

pub async fn find_course_by_slug(
    pool: &PgPool,
    slug: &str,
    include_unpublished: bool,
) -> Result<Option<Course>, AppError> {
    let course = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE slug = $1 AND ($2 OR is_published)"
    ))
    .bind(slug)
    .bind(include_unpublished)
    .fetch_optional(pool)
    .await?;
    Ok(course)
}

fn course_write_error(e: sqlx::Error, slug: &str) -> AppError {
    if is_unique_violation(&e) {
        return AppError::Conflict(format!("Slug '{slug}' is already taken"));
    }
    AppError::from(e)
}

/// New courses start unpublished.
pub async fn create_course(pool: &PgPool, draft: CourseDraft) -> Result<Course, AppError> {
    let draft = draft.checked()?;
    let course = sqlx::query_as::<_, Course>(&format!(
        r#"
        INSERT INTO courses (title, slug, description, thumbnail_url)
        VALUES ($1, $2, $3, $4)
        RETURNING {COURSE_COLUMNS}
        "#
    ))
    .bind(&draft.title)
    .bind(&draft.slug)
    .bind(&draft.description)
    .bind(&draft.thumbnail_url)
    .fetch_one(pool)
    .await
    .map_err(|e| course_write_error(e, &draft.slug))?;

    tracing::info!(course_id = course.id, slug = %course.slug, "Course created");
    Ok(course)
}

pub async fn update_course(
    pool: &PgPool,
    id: i64,
    patch: UpdateCourseInput,
) -> Result<Course, AppError> {
    let mut tx = pool.begin().await?;
    let existing = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    let draft = CourseDraft::from_existing(&existing, patch).checked()?;
    let course = sqlx::query_as::<_, Course>(&format!(
        r#"
        UPDATE courses
        SET title = $2, slug = $3, description = $4, thumbnail_url = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING {COURSE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&draft.title)
    .bind(&draft.slug)
    .bind(&draft.description)
    .bind(&draft.thumbnail_url)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| course_write_error(e, &draft.slug))?;

    tx.commit().await?;
    tracing::info!(course_id = id, "Course updated");
    Ok(course)
}

pub async fn set_course_published(
    pool: &PgPool,
    id: i64,
    published: bool,
) -> Result<Course, AppError> {
    sqlx::query_as::<_, Course>(&format!(
        "UPDATE courses SET is_published = $2, updated_at = NOW() WHERE id = $1 \
         RETURNING {COURSE_COLUMNS}"
    ))
    .bind(id)
    .bind(published)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Course not found".to_string()))
}

/// Chapters, lessons and exam links cascade; notes and live classes are detached.
pub async fn delete_course(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Course not found".to_string()));
    }
    tracing::info!(course_id = id, "Course deleted");
    Ok(())
}

// --- Chapters ---

pub async fn chapters_for_course(
    pool: &PgPool,
    course_id: i64,
    include_unpublished: bool,
) -> Result<Vec<Chapter>, AppError> {
    let chapters = sqlx::query_as::<_, Chapter>(&format!(
        "SELECT {CHAPTER_COLUMNS} FROM chapters \
         WHERE course_id = $1 AND ($2 OR is_published) ORDER BY position, id"
    ))
    .bind(course_id)
    .bind(include_unpublished)
    .fetch_all(pool)
    .await?;
    Ok(chapters)
}

pub async fn find_chapter(pool: &PgPool, id: i64) -> Result<Option<Chapter>, AppError> {
    let chapter = sqlx::query_as::<_, Chapter>(&format!(
        "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(chapter)
}

/// Appends the chapter after the course's last one.
pub async fn create_chapter(
    pool: &PgPool,
    course_id: i64,
    draft: ChapterDraft,
) -> Result<Chapter, AppError> {
    let draft = draft.checked()?;
    let mut tx = pool.begin().await?;

    // Serializes concurrent appends to the same course.
    sqlx::query_scalar::<_, i64>("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    let position = ordering::next_position(&mut *tx, Ordered::Chapters, course_id).await?;
    let chapter = sqlx::query_as::<_, Chapter>(&format!(
        r#"
        INSERT INTO chapters (course_id, title, description, position, is_published)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {CHAPTER_COLUMNS}
        "#
    ))
    .bind(course_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(position)
    .bind(draft.is_published)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(chapter_id = chapter.id, course_id, position, "Chapter created");
    Ok(chapter)
}

pub async fn update_chapter(
    pool: &PgPool,
    id: i64,
    patch: UpdateChapterInput,
) -> Result<Chapter, AppError> {
    let mut tx = pool.begin().await?;
    let existing = sqlx::query_as::<_, Chapter>(&format!(
        "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Chapter not found".to_string()))?;

    let draft = ChapterDraft::from_existing(&existing, patch).checked()?;
    let chapter = sqlx::query_as::<_, Chapter>(&format!(
        "UPDATE chapters SET title = $2, description = $3, is_published = $4 WHERE id = $1 \
         RETURNING {CHAPTER_COLUMNS}"
    ))
    .bind(id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.is_published)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(chapter)
}

/// Deletes the chapter (and its lessons) and closes the gap in positions.
///
/// Holds the course lock like appends and reorders do, so positions stay dense.
pub async fn delete_chapter(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let course_id = sqlx::query_scalar::<_, i64>("SELECT course_id FROM chapters WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Chapter not found".to_string()))?;

    sqlx::query("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
        .bind(course_id)
        .execute(&mut *tx)
        .await?;

    // A concurrent delete may have won while this one waited for the lock.
    let deleted = sqlx::query("DELETE FROM chapters WHERE id = $1 AND course_id = $2")
        .bind(id)
        .bind(course_id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Chapter not found".to_string()));
    }

    ordering::compact(&mut *tx, Ordered::Chapters, course_id).await?;
    tx.commit().await?;
    tracing::info!(chapter_id = id, course_id, "Chapter deleted");
    Ok(())
}

pub async fn reorder_chapters(
    pool: &PgPool,
    course_id: i64,
    chapter_ids: &[i64],
) -> Result<Vec<Chapter>, AppError> {
    let mut tx = pool.begin().await?;
    sqlx::query_scalar::<_, i64>("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    ordering::reorder(&mut *tx, Ordered::Chapters, course_id, chapter_ids).await?;
    tx.commit().await?;
    chapters_for_course(pool, course_id, true).await
}

// --- Lessons ---

pub async fn lessons_for_chapter(
    pool: &PgPool,
    chapter_id: i64,
    include_unpublished: bool,
) -> Result<Vec<Lesson>, AppError> {
    let lessons = sqlx::query_as::<_, Lesson>(&format!(
        "SELECT {LESSON_COLUMNS} FROM lessons \
         WHERE chapter_id = $1 AND ($2 OR is_published) ORDER BY position, id"
    ))
    .bind(chapter_id)
    .bind(include_unpublished)
    .fetch_all(pool)
    .await?;
    Ok(lessons)
}

pub async fn find_lesson(pool: &PgPool, id: i64) -> Result<Option<Lesson>, AppError> {
    let lesson = sqlx::query_as::<_, Lesson>(&format!(
        "SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(lesson)
}

pub async fn create_lesson(
    pool: &PgPool,
    chapter_id: i64,
    draft: LessonDraft,
) -> Result<Lesson, AppError> {
    let draft = draft.checked()?;
    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, i64>("SELECT id FROM chapters WHERE id = $1 FOR UPDATE")
        .bind(chapter_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Chapter not found".to_string()))?;

    let position = ordering::next_position(&mut *tx, Ordered::Lessons, chapter_id).await?;
    let lesson = sqlx::query_as::<_, Lesson>(&format!(
        r#"
        INSERT INTO lessons
            (chapter_id, title, content, video_url, duration_minutes, position, is_published)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {LESSON_COLUMNS}
        "#
    ))
    .bind(chapter_id)
    .bind(&draft.title)
    .bind(&draft.content)
    .bind(&draft.video_url)
    .bind(draft.duration_minutes)
    .bind(position)
    .bind(draft.is_published)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(lesson_id = lesson.id, chapter_id, position, "Lesson created");
    Ok(lesson)
}

pub async fn update_lesson(
    pool: &PgPool,
    id: i64,
    patch: UpdateLessonInput,
) -> Result<Lesson, AppError> {
    let mut tx = pool.begin().await?;
    let existing = sqlx::query_as::<_, Lesson>(&format!(
        "SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Lesson not found".to_string()))?;

    let draft = LessonDraft::from_existing(&existing, patch).checked()?;
    let lesson = sqlx::query_as::<_, Lesson>(&format!(
        r#"
        UPDATE lessons
        SET title = $2, content = $3, video_url = $4, duration_minutes = $5, is_published = $6
        WHERE id = $1
        RETURNING {LESSON_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&draft.title)
    .bind(&draft.content)
    .bind(&draft.video_url)
    .bind(draft.duration_minutes)
    .bind(draft.is_published)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(lesson)
}

/// Deletes the lesson under its chapter's lock and closes the gap in positions.
pub async fn delete_lesson(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let chapter_id = sqlx::query_scalar::<_, i64>("SELECT chapter_id FROM lessons WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lesson not found".to_string()))?;

    sqlx::query("SELECT id FROM chapters WHERE id = $1 FOR UPDATE")
        .bind(chapter_id)
        .execute(&mut *tx)
        .await?;

    let deleted = sqlx::query("DELETE FROM lessons WHERE id = $1 AND chapter_id = $2")
        .bind(id)
        .bind(chapter_id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Lesson not found".to_string()));
    }

    ordering::compact(&mut *tx, Ordered::Lessons, chapter_id).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn reorder_lessons(
    pool: &PgPool,
    chapter_id: i64,
    lesson_ids: &[i64],
) -> Result<Vec<Lesson>, AppError> {
    let mut tx = pool.begin().await?;
    sqlx::query_scalar::<_, i64>("SELECT id FROM chapters WHERE id = $1 FOR UPDATE")
        .bind(chapter_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Chapter not found".to_string()))?;

    ordering::reorder(&mut *tx, Ordered::Lessons, chapter_id, lesson_ids).await?;
    tx.commit().await?;
    lessons_for_chapter(pool, chapter_id, true).await
}

// --- Notes ---

pub async fn list_notes(
    pool: &PgPool,
    subject_id: Option<i64>,
    course_id: Option<i64>,
    include_unpublished: bool,
) -> Result<Vec<Note>, AppError> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {NOTE_COLUMNS} FROM notes WHERE 1=1"));
    if !include_unpublished {
        builder.push(" AND is_published");
    }
    if let Some(subject_id) = subject_id {
        builder.push(" AND subject_id = ").push_bind(subject_id);
    }
    if let Some(course_id) = course_id {
        builder.push(" AND course_id = ").push_bind(course_id);
    }
    builder.push(" ORDER BY created_at DESC, id DESC");

    let notes = builder.build_query_as::<Note>().fetch_all(pool).await?;
    Ok(notes)
}

pub async fn find_note(pool: &PgPool, id: i64) -> Result<Option<Note>, AppError> {
    let note = sqlx::query_as::<_, Note>(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(note)
}

fn note_write_error(e: sqlx::Error) -> AppError {
    if is_foreign_key_violation(&e) {
        return AppError::InvalidReference("Subject or course does not exist".to_string());
    }
    AppError::from(e)
}

pub async fn create_note(pool: &PgPool, draft: NoteDraft) -> Result<Note, AppError> {
    let draft = draft.checked()?;
    let note = sqlx::query_as::<_, Note>(&format!(
        r#"
        INSERT INTO notes (title, description, file_url, subject_id, course_id, is_published)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {NOTE_COLUMNS}
        "#
    ))
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.file_url)
    .bind(draft.subject_id)
    .bind(draft.course_id)
    .bind(draft.is_published)
    .fetch_one(pool)
    .await
    .map_err(note_write_error)?;

    tracing::info!(note_id = note.id, "Note created");
    Ok(note)
}

pub async fn update_note(
    pool: &PgPool,
    id: i64,
    patch: UpdateNoteInput,
) -> Result<Note, AppError> {
    let mut tx = pool.begin().await?;
    let existing = sqlx::query_as::<_, Note>(&format!(
        "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

    let draft = NoteDraft::from_existing(&existing, patch).checked()?;
    let note = sqlx::query_as::<_, Note>(&format!(
        r#"
        UPDATE notes
        SET title = $2, description = $3, file_url = $4, subject_id = $5, course_id = $6,
            is_published = $7
        WHERE id = $1
        RETURNING {NOTE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.file_url)
    .bind(draft.subject_id)
    .bind(draft.course_id)
    .bind(draft.is_published)
    .fetch_one(&mut *tx)
    .await
    .map_err(note_write_error)?;

    tx.commit().await?;
    Ok(note)
}

pub async fn delete_note(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM notes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Note not found".to_string()));
    }
    Ok(())
}
