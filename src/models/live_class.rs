// src/models/live_class.rs

use async_graphql::{InputObject, MaybeUndefined, SimpleObject};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use validator::Validate;

use crate::{
    error::AppError,
    models::apply_patch,
    utils::validation::{validate_not_blank, validate_url_string},
};

/// Represents the 'live_classes' table: a scheduled session hosted by a mentor.
#[derive(Debug, Clone, FromRow, Serialize, SimpleObject)]
#[graphql(complex)]
pub struct LiveClass {
    pub id: i64,
    pub course_id: Option<i64>,
    pub mentor_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub meeting_url: String,
    pub is_cancelled: bool,
    pub created_at: DateTime<Utc>,
}

impl LiveClass {
    pub fn finishes_at(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Not cancelled and not yet over.
    pub fn is_upcoming_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_cancelled && self.finishes_at() > now
    }
}

#[derive(Debug, InputObject)]
pub struct ScheduleLiveClassInput {
    pub course_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub meeting_url: String,
}

#[derive(Debug, Default, InputObject)]
pub struct UpdateLiveClassInput {
    pub course_id: MaybeUndefined<i64>,
    pub title: Option<String>,
    pub description: MaybeUndefined<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub meeting_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct LiveClassDraft {
    pub course_id: Option<i64>,
    #[validate(
        length(min = 1, max = 200, message = "must be 1 to 200 characters"),
        custom(function = validate_not_blank)
    )]
    pub title: String,
    #[validate(length(max = 2000, message = "at most 2000 characters"))]
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    #[validate(range(min = 1, max = 1440, message = "must be between 1 and 1440 minutes"))]
    pub duration_minutes: i32,
    #[validate(
        length(min = 1, max = 500, message = "must be 1 to 500 characters"),
        custom(function = validate_url_string)
    )]
    pub meeting_url: String,
}

impl From<ScheduleLiveClassInput> for LiveClassDraft {
    fn from(input: ScheduleLiveClassInput) -> Self {
        Self {
            course_id: input.course_id,
            title: input.title,
            description: input.description,
            scheduled_at: input.scheduled_at,
            duration_minutes: input.duration_minutes,
            meeting_url: input.meeting_url,
        }
    }
}

impl LiveClassDraft {
    pub fn from_existing(existing: &LiveClass, patch: UpdateLiveClassInput) -> Self {
        let mut draft = Self {
            course_id: existing.course_id,
            title: existing.title.clone(),
            description: existing.description.clone(),
            scheduled_at: existing.scheduled_at,
            duration_minutes: existing.duration_minutes,
            meeting_url: existing.meeting_url.clone(),
        };
        apply_patch(&mut draft.course_id, patch.course_id);
        if let Some(title) = patch.title {
            draft.title = title;
        }
        apply_patch(&mut draft.description, patch.description);
        if let Some(at) = patch.scheduled_at {
            draft.scheduled_at = at;
        }
        if let Some(minutes) = patch.duration_minutes {
            draft.duration_minutes = minutes;
        }
        if let Some(url) = patch.meeting_url {
            draft.meeting_url = url;
        }
        draft
    }

    pub fn checked(mut self) -> Result<Self, AppError> {
        self.validate()?;
        self.title = self.title.trim().to_string();
        Ok(self)
    }
}

/// Cancelling is one-way; a second cancel is a state error.
pub fn check_cancel(class: &LiveClass) -> Result<(), AppError> {
    if class.is_cancelled {
        return Err(AppError::InvalidState("Live class is already cancelled".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(start_offset_minutes: i64, duration: i32) -> LiveClass {
        let now = Utc::now();
        LiveClass {
            id: 1,
            course_id: None,
            mentor_id: 2,
            title: "Organic reactions Q&A".to_string(),
            description: None,
            scheduled_at: now + Duration::minutes(start_offset_minutes),
            duration_minutes: duration,
            meeting_url: "https://meet.example.com/abc".to_string(),
            is_cancelled: false,
            created_at: now,
        }
    }

    #[test]
    fn test_upcoming_includes_classes_in_progress() {
        let now = Utc::now();
        assert!(class(60, 45).is_upcoming_at(now));
        // Started 30 minutes ago, runs 45.
        assert!(class(-30, 45).is_upcoming_at(now));
        assert!(!class(-90, 45).is_upcoming_at(now));
    }

    #[test]
    fn test_cancelled_class_is_not_upcoming_and_cannot_cancel_twice() {
        let mut c = class(60, 45);
        assert!(check_cancel(&c).is_ok());
        c.is_cancelled = true;
        assert!(!c.is_upcoming_at(Utc::now()));
        assert!(matches!(check_cancel(&c), Err(AppError::InvalidState(_))));
    }

    #[test]
    fn test_draft_rejects_bad_meeting_url_and_duration() {
        let draft = LiveClassDraft::from(ScheduleLiveClassInput {
            course_id: None,
            title: "Physics doubts".to_string(),
            description: None,
            scheduled_at: Utc::now(),
            duration_minutes: 0,
            meeting_url: "zoom meeting".to_string(),
        });
        match draft.checked().unwrap_err() {
            AppError::Validation(errors) => {
                let fields = errors.field_errors();
                assert!(fields.keys().any(|k| k == "duration_minutes"));
                assert!(fields.keys().any(|k| k == "meeting_url"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_patch_moves_schedule_only() {
        let existing = class(60, 45);
        let later = existing.scheduled_at + Duration::days(1);
        let patch = UpdateLiveClassInput {
            scheduled_at: Some(later),
            ..Default::default()
        };
        let draft = LiveClassDraft::from_existing(&existing, patch).checked().unwrap();
        assert_eq!(draft.scheduled_at, later);
        assert_eq!(draft.duration_minutes, 45);
        assert_eq!(draft.meeting_url, existing.meeting_url);
    }
}
