// src/graphql/live_class.rs

use async_graphql::{ComplexObject, Context, Object, Result, ResultExt};
use chrono::{DateTime, Utc};

use crate::{
    graphql::context::{current_user, pool, require_staff},
    models::live_class::{
        LiveClass, LiveClassDraft, ScheduleLiveClassInput, UpdateLiveClassInput,
    },
    services::live_classes,
};

#[ComplexObject]
impl LiveClass {
    async fn ends_at(&self) -> DateTime<Utc> {
        self.finishes_at()
    }

    async fn is_upcoming(&self) -> bool {
        self.is_upcoming_at(Utc::now())
    }
}

#[derive(Default)]
pub struct LiveClassQuery;

#[Object]
impl LiveClassQuery {
    /// Classes ordered by start time. By default only those not cancelled and not yet over.
    async fn live_classes(
        &self,
        ctx: &Context<'_>,
        course_id: Option<i64>,
        #[graphql(default = true)] upcoming_only: bool,
    ) -> Result<Vec<LiveClass>> {
        live_classes::list(pool(ctx).extend()?, course_id, upcoming_only)
            .await
            .extend()
    }

    async fn live_class(&self, ctx: &Context<'_>, id: i64) -> Result<Option<LiveClass>> {
        live_classes::find(pool(ctx).extend()?, id).await.extend()
    }
}

#[derive(Default)]
pub struct LiveClassMutation;

#[Object]
impl LiveClassMutation {
    /// Schedules a class hosted by the caller. Staff only.
    async fn schedule_live_class(
        &self,
        ctx: &Context<'_>,
        input: ScheduleLiveClassInput,
    ) -> Result<LiveClass> {
        require_staff(ctx).extend()?;
        let host = current_user(ctx).await.extend()?;
        live_classes::schedule(pool(ctx).extend()?, host.id, LiveClassDraft::from(input))
            .await
            .extend()
    }

    async fn update_live_class(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: UpdateLiveClassInput,
    ) -> Result<LiveClass> {
        require_staff(ctx).extend()?;
        live_classes::update(pool(ctx).extend()?, id, input)
            .await
            .extend()
    }

    async fn cancel_live_class(&self, ctx: &Context<'_>, id: i64) -> Result<LiveClass> {
        require_staff(ctx).extend()?;
        live_classes::cancel(pool(ctx).extend()?, id).await.extend()
    }
}
