// src/models/exam.rs

use async_graphql::{Enum, InputObject, MaybeUndefined, SimpleObject};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use crate::{
    error::AppError,
    models::apply_patch,
    utils::validation::validate_not_blank,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Enum)]
#[sqlx(type_name = "exam_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExamType {
    FullModel,
    Subject,
    Chapter,
    Practice,
    PreviousYear,
}

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, SimpleObject)]
#[graphql(complex)]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub total_marks: i32,
    pub passing_marks: i32,
    pub exam_type: Option<ExamType>,
    pub set_number: Option<i32>,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'exam_questions' table: a question placed in an exam.
#[derive(Debug, Clone, FromRow, Serialize, SimpleObject)]
#[graphql(complex)]
pub struct ExamQuestion {
    pub id: i64,
    pub exam_id: i64,
    pub question_id: i64,
    pub marks: i32,
    pub position: i32,
}

/// Represents the 'course_exams' table.
#[derive(Debug, Clone, FromRow, Serialize, SimpleObject)]
#[graphql(complex)]
pub struct CourseExam {
    pub course_id: i64,
    pub exam_id: i64,
    pub display_order: i32,
    pub is_required: bool,
}

/// DTO for creating a new exam.
#[derive(Debug, InputObject)]
pub struct CreateExamInput {
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub total_marks: i32,
    pub passing_marks: i32,
    pub exam_type: Option<ExamType>,
    pub set_number: Option<i32>,
}

/// DTO for updating an exam. Absent fields keep their stored value.
#[derive(Debug, Default, InputObject)]
pub struct UpdateExamInput {
    pub title: Option<String>,
    pub description: MaybeUndefined<String>,
    pub duration_minutes: Option<i32>,
    pub total_marks: Option<i32>,
    pub passing_marks: Option<i32>,
    pub exam_type: MaybeUndefined<ExamType>,
    pub set_number: MaybeUndefined<i32>,
}

/// An exam's editable fields, validated as a whole on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
#[validate(schema(function = validate_marks, skip_on_field_errors = false))]
pub struct ExamDraft {
    #[validate(
        length(min = 1, max = 200, message = "must be 1 to 200 characters"),
        custom(function = validate_not_blank)
    )]
    pub title: String,
    #[validate(length(max = 5000, message = "at most 5000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440, message = "must be between 1 and 1440 minutes"))]
    pub duration_minutes: i32,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub total_marks: i32,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub passing_marks: i32,
    pub exam_type: Option<ExamType>,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub set_number: Option<i32>,
}

/// Passing marks can never exceed total marks.
fn validate_marks(draft: &ExamDraft) -> Result<(), ValidationError> {
    if draft.passing_marks > draft.total_marks {
        return Err(ValidationError::new("passing_exceeds_total")
            .with_message("passing marks must not exceed total marks".into()));
    }
    Ok(())
}

impl From<CreateExamInput> for ExamDraft {
    fn from(input: CreateExamInput) -> Self {
        Self {
            title: input.title,
            description: input.description,
            duration_minutes: input.duration_minutes,
            total_marks: input.total_marks,
            passing_marks: input.passing_marks,
            exam_type: input.exam_type,
            set_number: input.set_number,
        }
    }
}

impl ExamDraft {
    pub fn from_existing(existing: &Exam, patch: UpdateExamInput) -> Self {
        let mut draft = Self {
            title: existing.title.clone(),
            description: existing.description.clone(),
            duration_minutes: existing.duration_minutes,
            total_marks: existing.total_marks,
            passing_marks: existing.passing_marks,
            exam_type: existing.exam_type,
            set_number: existing.set_number,
        };

        if let Some(title) = patch.title {
            draft.title = title;
        }
        apply_patch(&mut draft.description, patch.description);
        if let Some(minutes) = patch.duration_minutes {
            draft.duration_minutes = minutes;
        }
        if let Some(total) = patch.total_marks {
            draft.total_marks = total;
        }
        if let Some(passing) = patch.passing_marks {
            draft.passing_marks = passing;
        }
        apply_patch(&mut draft.exam_type, patch.exam_type);
        apply_patch(&mut draft.set_number, patch.set_number);

        draft
    }

    /// Runs field and cross-field checks; trims the title.
    pub fn checked(mut self) -> Result<Self, AppError> {
        self.validate()?;
        self.title = self.title.trim().to_string();
        Ok(self)
    }
}

/// Marks for a single exam question must be a positive integer.
pub fn validate_question_marks(marks: i32) -> Result<(), AppError> {
    if marks < 1 {
        return Err(AppError::InvalidInput("Marks must be a positive integer".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ExamDraft {
        ExamDraft {
            title: "Physics Model Set 1".to_string(),
            description: None,
            duration_minutes: 120,
            total_marks: 100,
            passing_marks: 40,
            exam_type: Some(ExamType::FullModel),
            set_number: Some(1),
        }
    }

    fn exam() -> Exam {
        let d = draft();
        Exam {
            id: 3,
            title: d.title,
            description: Some("old".to_string()),
            duration_minutes: d.duration_minutes,
            total_marks: d.total_marks,
            passing_marks: d.passing_marks,
            exam_type: d.exam_type,
            set_number: d.set_number,
            is_published: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(draft().checked().is_ok());
    }

    #[test]
    fn test_passing_marks_above_total_rejected() {
        let mut d = draft();
        d.passing_marks = 101;
        match d.checked().unwrap_err() {
            AppError::Validation(errors) => {
                let all = errors.field_errors();
                let codes: Vec<_> = all.values().flat_map(|errs| errs.iter()).collect();
                assert!(codes.iter().any(|e| e.code == "passing_exceeds_total"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_passing_equal_to_total_is_allowed() {
        let mut d = draft();
        d.passing_marks = 100;
        assert!(d.checked().is_ok());
    }

    #[test]
    fn test_duration_and_total_must_be_positive() {
        let mut d = draft();
        d.duration_minutes = 0;
        assert!(d.checked().is_err());

        let mut d = draft();
        d.total_marks = 0;
        d.passing_marks = 0;
        assert!(d.checked().is_err());
    }

    #[test]
    fn test_update_revalidates_merged_record() {
        let patch = UpdateExamInput {
            total_marks: Some(30),
            ..Default::default()
        };
        // Stored passing marks (40) now exceed the new total.
        assert!(ExamDraft::from_existing(&exam(), patch).checked().is_err());
    }

    #[test]
    fn test_update_clears_nullable_fields() {
        let patch = UpdateExamInput {
            description: MaybeUndefined::Null,
            exam_type: MaybeUndefined::Null,
            ..Default::default()
        };
        let d = ExamDraft::from_existing(&exam(), patch);
        assert_eq!(d.description, None);
        assert_eq!(d.exam_type, None);
        assert_eq!(d.set_number, Some(1));
    }

    #[test]
    fn test_question_marks_positive() {
        assert!(validate_question_marks(1).is_ok());
        assert!(validate_question_marks(0).is_err());
        assert!(validate_question_marks(-5).is_err());
    }
}
