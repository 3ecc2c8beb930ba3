// src/models/catalog.rs

use async_graphql::{InputObject, MaybeUndefined, SimpleObject};
use serde::Serialize;
use sqlx::FromRow;
use validator::Validate;

use crate::{
    error::AppError,
    models::apply_patch,
    utils::{
        html::clean_optional_html,
        validation::{validate_not_blank, validate_slug, validate_url_string},
    },
};

/// Represents the 'subjects' table.
#[derive(Debug, Clone, FromRow, Serialize, SimpleObject)]
#[graphql(complex)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'topics' table.
#[derive(Debug, Clone, FromRow, Serialize, SimpleObject)]
pub struct Topic {
    pub id: i64,
    pub subject_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'courses' table.
#[derive(Debug, Clone, FromRow, Serialize, SimpleObject)]
#[graphql(complex)]
pub struct Course {
    pub id: i64,
    pub title: String,
    /// URL-friendly unique handle, e.g. "engineering-entrance-2082".
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'chapters' table.
#[derive(Debug, Clone, FromRow, Serialize, SimpleObject)]
#[graphql(complex)]
pub struct Chapter {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'lessons' table.
#[derive(Debug, Clone, FromRow, Serialize, SimpleObject)]
pub struct Lesson {
    pub id: i64,
    pub chapter_id: i64,
    pub title: String,
    /// Sanitized HTML.
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub duration_minutes: Option<i32>,
    pub position: i32,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'notes' table: downloadable study notes.
#[derive(Debug, Clone, FromRow, Serialize, SimpleObject)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub subject_id: Option<i64>,
    pub course_id: Option<i64>,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// Subjects and topics

#[derive(Debug, InputObject)]
pub struct SubjectInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, InputObject)]
pub struct CreateTopicInput {
    pub subject_id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// Partial update for a subject or a topic.
#[derive(Debug, Default, InputObject)]
pub struct UpdateNamedInput {
    pub name: Option<String>,
    pub description: MaybeUndefined<String>,
}

/// Shared by subjects and topics.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct NamedDraft {
    #[validate(
        length(min = 1, max = 100, message = "must be 1 to 100 characters"),
        custom(function = validate_not_blank)
    )]
    pub name: String,
    #[validate(length(max = 2000, message = "at most 2000 characters"))]
    pub description: Option<String>,
}

impl From<SubjectInput> for NamedDraft {
    fn from(input: SubjectInput) -> Self {
        Self {
            name: input.name,
            description: input.description,
        }
    }
}

impl From<CreateTopicInput> for NamedDraft {
    fn from(input: CreateTopicInput) -> Self {
        Self {
            name: input.name,
            description: input.description,
        }
    }
}

impl NamedDraft {
    pub fn patched(name: &str, description: Option<&str>, patch: UpdateNamedInput) -> Self {
        let mut draft = Self {
            name: name.to_string(),
            description: description.map(str::to_string),
        };
        if let Some(name) = patch.name {
            draft.name = name;
        }
        apply_patch(&mut draft.description, patch.description);
        draft
    }

    pub fn checked(mut self) -> Result<Self, AppError> {
        self.validate()?;
        self.name = self.name.trim().to_string();
        Ok(self)
    }
}

// Courses

#[derive(Debug, InputObject)]
pub struct CreateCourseInput {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Default, InputObject)]
pub struct UpdateCourseInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: MaybeUndefined<String>,
    pub thumbnail_url: MaybeUndefined<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct CourseDraft {
    #[validate(
        length(min = 1, max = 200, message = "must be 1 to 200 characters"),
        custom(function = validate_not_blank)
    )]
    pub title: String,
    #[validate(
        length(min = 1, max = 100, message = "must be 1 to 100 characters"),
        custom(function = validate_slug)
    )]
    pub slug: String,
    #[validate(length(max = 5000, message = "at most 5000 characters"))]
    pub description: Option<String>,
    #[validate(
        length(max = 500, message = "at most 500 characters"),
        custom(function = validate_url_string)
    )]
    pub thumbnail_url: Option<String>,
}

impl From<CreateCourseInput> for CourseDraft {
    fn from(input: CreateCourseInput) -> Self {
        Self {
            title: input.title,
            slug: input.slug,
            description: input.description,
            thumbnail_url: input.thumbnail_url,
        }
    }
}

impl CourseDraft {
    pub fn from_existing(existing: &Course, patch: UpdateCourseInput) -> Self {
        let mut draft = Self {
            title: existing.title.clone(),
            slug: existing.slug.clone(),
            description: existing.description.clone(),
            thumbnail_url: existing.thumbnail_url.clone(),
        };
        if let Some(title) = patch.title {
            draft.title = title;
        }
        if let Some(slug) = patch.slug {
            draft.slug = slug;
        }
        apply_patch(&mut draft.description, patch.description);
        apply_patch(&mut draft.thumbnail_url, patch.thumbnail_url);
        draft
    }

    pub fn checked(mut self) -> Result<Self, AppError> {
        self.validate()?;
        self.title = self.title.trim().to_string();
        Ok(self)
    }
}

// Chapters

#[derive(Debug, InputObject)]
pub struct CreateChapterInput {
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, InputObject)]
pub struct UpdateChapterInput {
    pub title: Option<String>,
    pub description: MaybeUndefined<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct ChapterDraft {
    #[validate(
        length(min = 1, max = 200, message = "must be 1 to 200 characters"),
        custom(function = validate_not_blank)
    )]
    pub title: String,
    #[validate(length(max = 5000, message = "at most 5000 characters"))]
    pub description: Option<String>,
    pub is_published: bool,
}

impl ChapterDraft {
    pub fn new(title: String, description: Option<String>) -> Self {
        Self {
            title,
            description,
            is_published: false,
        }
    }

    pub fn from_existing(existing: &Chapter, patch: UpdateChapterInput) -> Self {
        let mut draft = Self {
            title: existing.title.clone(),
            description: existing.description.clone(),
            is_published: existing.is_published,
        };
        if let Some(title) = patch.title {
            draft.title = title;
        }
        apply_patch(&mut draft.description, patch.description);
        if let Some(published) = patch.is_published {
            draft.is_published = published;
        }
        draft
    }

    pub fn checked(mut self) -> Result<Self, AppError> {
        self.validate()?;
        self.title = self.title.trim().to_string();
        Ok(self)
    }
}

// Lessons

#[derive(Debug, InputObject)]
pub struct CreateLessonInput {
    pub chapter_id: i64,
    pub title: String,
    /// HTML; sanitized before storage.
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Default, InputObject)]
pub struct UpdateLessonInput {
    pub title: Option<String>,
    pub content: MaybeUndefined<String>,
    pub video_url: MaybeUndefined<String>,
    pub duration_minutes: MaybeUndefined<i32>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct LessonDraft {
    #[validate(
        length(min = 1, max = 200, message = "must be 1 to 200 characters"),
        custom(function = validate_not_blank)
    )]
    pub title: String,
    #[validate(length(max = 100000, message = "at most 100000 characters"))]
    pub content: Option<String>,
    #[validate(
        length(max = 500, message = "at most 500 characters"),
        custom(function = validate_url_string)
    )]
    pub video_url: Option<String>,
    #[validate(range(min = 0, max = 1440, message = "must be between 0 and 1440 minutes"))]
    pub duration_minutes: Option<i32>,
    pub is_published: bool,
}

impl From<CreateLessonInput> for LessonDraft {
    fn from(input: CreateLessonInput) -> Self {
        Self {
            title: input.title,
            content: input.content,
            video_url: input.video_url,
            duration_minutes: input.duration_minutes,
            is_published: false,
        }
    }
}

impl LessonDraft {
    pub fn from_existing(existing: &Lesson, patch: UpdateLessonInput) -> Self {
        let mut draft = Self {
            title: existing.title.clone(),
            content: existing.content.clone(),
            video_url: existing.video_url.clone(),
            duration_minutes: existing.duration_minutes,
            is_published: existing.is_published,
        };
        if let Some(title) = patch.title {
            draft.title = title;
        }
        apply_patch(&mut draft.content, patch.content);
        apply_patch(&mut draft.video_url, patch.video_url);
        apply_patch(&mut draft.duration_minutes, patch.duration_minutes);
        if let Some(published) = patch.is_published {
            draft.is_published = published;
        }
        draft
    }

    /// Validates, trims the title and sanitizes the HTML body.
    pub fn checked(mut self) -> Result<Self, AppError> {
        self.validate()?;
        self.title = self.title.trim().to_string();
        self.content = clean_optional_html(self.content.as_deref());
        Ok(self)
    }
}

// Notes

#[derive(Debug, InputObject)]
pub struct CreateNoteInput {
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub subject_id: Option<i64>,
    pub course_id: Option<i64>,
}

#[derive(Debug, Default, InputObject)]
pub struct UpdateNoteInput {
    pub title: Option<String>,
    pub description: MaybeUndefined<String>,
    pub file_url: Option<String>,
    pub subject_id: MaybeUndefined<i64>,
    pub course_id: MaybeUndefined<i64>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct NoteDraft {
    #[validate(
        length(min = 1, max = 200, message = "must be 1 to 200 characters"),
        custom(function = validate_not_blank)
    )]
    pub title: String,
    #[validate(length(max = 2000, message = "at most 2000 characters"))]
    pub description: Option<String>,
    #[validate(
        length(min = 1, max = 500, message = "must be 1 to 500 characters"),
        custom(function = validate_url_string)
    )]
    pub file_url: String,
    pub subject_id: Option<i64>,
    pub course_id: Option<i64>,
    pub is_published: bool,
}

impl From<CreateNoteInput> for NoteDraft {
    fn from(input: CreateNoteInput) -> Self {
        Self {
            title: input.title,
            description: input.description,
            file_url: input.file_url,
            subject_id: input.subject_id,
            course_id: input.course_id,
            is_published: false,
        }
    }
}

impl NoteDraft {
    pub fn from_existing(existing: &Note, patch: UpdateNoteInput) -> Self {
        let mut draft = Self {
            title: existing.title.clone(),
            description: existing.description.clone(),
            file_url: existing.file_url.clone(),
            subject_id: existing.subject_id,
            course_id: existing.course_id,
            is_published: existing.is_published,
        };
        if let Some(title) = patch.title {
            draft.title = title;
        }
        apply_patch(&mut draft.description, patch.description);
        if let Some(url) = patch.file_url {
            draft.file_url = url;
        }
        apply_patch(&mut draft.subject_id, patch.subject_id);
        apply_patch(&mut draft.course_id, patch.course_id);
        if let Some(published) = patch.is_published {
            draft.is_published = published;
        }
        draft
    }

    pub fn checked(mut self) -> Result<Self, AppError> {
        self.validate()?;
        self.title = self.title.trim().to_string();
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> Course {
        Course {
            id: 1,
            title: "Engineering Entrance".to_string(),
            slug: "engineering-entrance".to_string(),
            description: Some("IOE prep".to_string()),
            thumbnail_url: None,
            is_published: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_course_slug_and_thumbnail_are_checked() {
        let mut draft = CourseDraft::from(CreateCourseInput {
            title: "Medical Entrance".to_string(),
            slug: "Medical Entrance".to_string(),
            description: None,
            thumbnail_url: Some("not-a-url".to_string()),
        });
        let err = draft.clone().checked().unwrap_err();
        match err {
            AppError::Validation(errors) => {
                let fields = errors.field_errors();
                assert!(fields.keys().any(|k| k == "slug"));
                assert!(fields.keys().any(|k| k == "thumbnail_url"));
            }
            other => panic!("unexpected {other:?}"),
        }

        draft.slug = "medical-entrance".to_string();
        draft.thumbnail_url = Some("https://cdn.example.com/med.png".to_string());
        assert!(draft.checked().is_ok());
    }

    #[test]
    fn test_course_patch_keeps_untouched_fields() {
        let patch = UpdateCourseInput {
            title: Some("  Engineering Entrance 2082 ".to_string()),
            description: MaybeUndefined::Null,
            ..Default::default()
        };
        let draft = CourseDraft::from_existing(&course(), patch).checked().unwrap();
        assert_eq!(draft.title, "Engineering Entrance 2082");
        assert_eq!(draft.slug, "engineering-entrance");
        assert_eq!(draft.description, None);
    }

    #[test]
    fn test_lesson_content_is_sanitized() {
        let draft = LessonDraft::from(CreateLessonInput {
            chapter_id: 1,
            title: "Kinematics".to_string(),
            content: Some("<h2>Motion</h2><img src=x onerror=alert(1)>".to_string()),
            video_url: Some("https://video.example.com/k1".to_string()),
            duration_minutes: Some(25),
        })
        .checked()
        .unwrap();
        let content = draft.content.unwrap();
        assert!(content.contains("<h2>Motion</h2>"));
        assert!(!content.contains("onerror"));
    }

    #[test]
    fn test_lesson_rejects_negative_duration() {
        let draft = LessonDraft::from(CreateLessonInput {
            chapter_id: 1,
            title: "Kinematics".to_string(),
            content: None,
            video_url: None,
            duration_minutes: Some(-1),
        });
        assert!(draft.checked().is_err());
    }

    #[test]
    fn test_note_requires_valid_file_url() {
        let draft = NoteDraft::from(CreateNoteInput {
            title: "Organic chemistry summary".to_string(),
            description: None,
            file_url: "summary.pdf".to_string(),
            subject_id: None,
            course_id: None,
        });
        assert!(draft.checked().is_err());
    }

    #[test]
    fn test_named_draft_trims_and_patches() {
        let patch = UpdateNamedInput {
            name: Some(" Physics ".to_string()),
            description: MaybeUndefined::Undefined,
        };
        let draft = NamedDraft::patched("Phys", Some("Mechanics"), patch).checked().unwrap();
        assert_eq!(draft.name, "Physics");
        assert_eq!(draft.description.as_deref(), Some("Mechanics"));

        let blank = NamedDraft { name: "  ".to_string(), description: None };
        assert!(blank.checked().is_err());
    }
}
