// src/graphql/mod.rs

use async_graphql::{EmptySubscription, MergedObject, Schema};
use sqlx::PgPool;

use crate::models::attempt::AttemptPolicy;

pub mod attempt;
pub mod catalog;
pub mod context;
pub mod exam;
pub mod live_class;
pub mod question;
pub mod user;

/// Nested selections deeper than this are rejected before execution.
const MAX_QUERY_DEPTH: usize = 12;

#[derive(MergedObject, Default)]
pub struct QueryRoot(
    catalog::CatalogQuery,
    question::QuestionQuery,
    exam::ExamQuery,
    attempt::AttemptQuery,
    live_class::LiveClassQuery,
    user::UserQuery,
);

#[derive(MergedObject, Default)]
pub struct MutationRoot(
    catalog::CatalogMutation,
    question::QuestionMutation,
    exam::ExamMutation,
    attempt::AttemptMutation,
    live_class::LiveClassMutation,
);

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(pool: PgPool, policy: AttemptPolicy) -> AppSchema {
    Schema::build(
        QueryRoot::default(),
        MutationRoot::default(),
        EmptySubscription,
    )
    .data(pool)
    .data(policy)
    .limit_depth(MAX_QUERY_DEPTH)
    .finish()
}
