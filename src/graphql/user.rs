// src/graphql/user.rs

use async_graphql::{Context, Object, Result, ResultExt};

use crate::{
    error::AppError,
    graphql::context::{current_user, pool, require_admin},
    models::user::{Role, User},
    services::users,
};

#[derive(Default)]
pub struct UserQuery;

#[Object]
impl UserQuery {
    /// The signed-in user.
    async fn me(&self, ctx: &Context<'_>) -> Result<User> {
        let user = current_user(ctx).await.extend()?;
        users::find(pool(ctx).extend()?, user.id)
            .await
            .extend()?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
            .extend()
    }

    /// Admin only.
    async fn users(&self, ctx: &Context<'_>, role: Option<Role>) -> Result<Vec<User>> {
        require_admin(ctx).extend()?;
        users::list(pool(ctx).extend()?, role).await.extend()
    }
}
