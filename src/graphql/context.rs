// src/graphql/context.rs

//! Per-request caller information available to resolvers.

use async_graphql::Context;
use sqlx::PgPool;
use tokio::sync::OnceCell;

use crate::{
    error::AppError,
    models::user::{CurrentUser, Role},
    services::users,
    utils::jwt::{Claims, Identity},
};

static ANONYMOUS: Identity = Identity::Anonymous;

/// Attached to every GraphQL request by the HTTP handler.
pub struct RequestContext {
    identity: Identity,
    /// Filled the first time a resolver needs the internal user id.
    user: OnceCell<CurrentUser>,
}

impl RequestContext {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            user: OnceCell::new(),
        }
    }
}

pub fn identity<'a>(ctx: &Context<'a>) -> &'a Identity {
    ctx.data_opt::<RequestContext>()
        .map(|request| &request.identity)
        .unwrap_or(&ANONYMOUS)
}

/// Role from the verified token; `None` for anonymous callers.
pub fn role(ctx: &Context<'_>) -> Option<Role> {
    identity(ctx).claims().map(Claims::role)
}

pub fn is_staff(ctx: &Context<'_>) -> bool {
    role(ctx).is_some_and(Role::is_staff)
}

fn require_claims<'a>(ctx: &Context<'a>) -> Result<&'a Claims, AppError> {
    identity(ctx)
        .claims()
        .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))
}

/// Mentors and admins.
pub fn require_staff(ctx: &Context<'_>) -> Result<(), AppError> {
    let claims = require_claims(ctx)?;
    if !claims.role().is_staff() {
        return Err(AppError::Unauthorized("Staff access required".to_string()));
    }
    Ok(())
}

pub fn require_admin(ctx: &Context<'_>) -> Result<(), AppError> {
    let claims = require_claims(ctx)?;
    if claims.role() != Role::Admin {
        return Err(AppError::Unauthorized("Admin access required".to_string()));
    }
    Ok(())
}

pub fn pool<'a>(ctx: &Context<'a>) -> Result<&'a PgPool, AppError> {
    ctx.data::<PgPool>()
        .map_err(|e| AppError::InternalServerError(e.message))
}

/// The caller as a `users` row, synced from the token on first use.
pub async fn current_user(ctx: &Context<'_>) -> Result<CurrentUser, AppError> {
    let claims = require_claims(ctx)?;
    let request = ctx
        .data_opt::<RequestContext>()
        .ok_or_else(|| AppError::InternalServerError("Request context missing".to_string()))?;
    let pool = pool(ctx)?;

    let user = request
        .user
        .get_or_try_init(|| async {
            let row = users::sync_from_claims(pool, claims).await?;
            Ok::<_, AppError>(CurrentUser {
                id: row.id,
                role: claims.role(),
            })
        })
        .await?;

    Ok(*user)
}
