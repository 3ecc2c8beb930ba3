// src/services/users.rs

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    models::user::{Role, User},
    utils::jwt::Claims,
};

pub const COLUMNS: &str = "id, external_id, email, display_name, role, created_at, last_seen_at";

/// Mirrors a verified identity into `users`.
///
/// The token is authoritative for the role; email and name only overwrite
/// stored values when the token carries them.
pub async fn sync_from_claims(pool: &PgPool, claims: &Claims) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (external_id, email, display_name, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (external_id) DO UPDATE
        SET email = COALESCE(EXCLUDED.email, users.email),
            display_name = COALESCE(EXCLUDED.display_name, users.display_name),
            role = EXCLUDED.role,
            last_seen_at = NOW()
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&claims.sub)
    .bind(&claims.email)
    .bind(&claims.name)
    .bind(claims.role())
    .fetch_one(pool)
    .await?;

    tracing::debug!(user_id = user.id, role = user.role.as_str(), "Synced identity");
    Ok(user)
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn list(pool: &PgPool, role: Option<Role>) -> Result<Vec<User>, AppError> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {COLUMNS} FROM users"));
    if let Some(role) = role {
        builder.push(" WHERE role = ").push_bind(role);
    }
    builder.push(" ORDER BY created_at, id");

    let users = builder.build_query_as::<User>().fetch_all(pool).await?;
    Ok(users)
}
