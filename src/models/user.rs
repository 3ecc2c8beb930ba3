// src/models/user.rs

use async_graphql::{Enum, SimpleObject};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Platform role, as asserted by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Enum)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Mentor,
    Admin,
}

impl Role {
    /// Maps the raw `role` claim; missing or unknown values mean student.
    pub fn from_claim(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("admin") => Role::Admin,
            Some("mentor") => Role::Mentor,
            _ => Role::Student,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Mentor => "mentor",
            Role::Admin => "admin",
        }
    }

    /// Mentors and admins manage content and see answer keys.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Mentor | Role::Admin)
    }
}

/// Represents the 'users' table: a mirror of identities seen in tokens.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, SimpleObject)]
pub struct User {
    pub id: i64,

    /// The identity provider's subject id.
    pub external_id: String,

    pub email: Option<String>,

    pub display_name: Option<String>,

    pub role: Role,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub last_seen_at: chrono::DateTime<chrono::Utc>,
}

/// The caller of an operation, resolved from verified token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub role: Role,
}

impl CurrentUser {
    /// Owners and staff may read an attempt; only the owner may change it.
    pub fn can_view(&self, owner_id: i64) -> bool {
        self.id == owner_id || self.role.is_staff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_claim() {
        assert_eq!(Role::from_claim(Some("Admin")), Role::Admin);
        assert_eq!(Role::from_claim(Some("mentor")), Role::Mentor);
        assert_eq!(Role::from_claim(Some("tutor")), Role::Student);
        assert_eq!(Role::from_claim(None), Role::Student);
    }

    #[test]
    fn test_staff_roles() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Mentor.is_staff());
        assert!(!Role::Student.is_staff());
    }

    #[test]
    fn test_can_view_attempt() {
        let student = CurrentUser { id: 7, role: Role::Student };
        let mentor = CurrentUser { id: 8, role: Role::Mentor };
        assert!(student.can_view(7));
        assert!(!student.can_view(9));
        assert!(mentor.can_view(9));
    }
}
