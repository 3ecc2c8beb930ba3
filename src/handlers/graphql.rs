// src/handlers/graphql.rs

use async_graphql::http::GraphiQLSource;
use axum::{
    Extension, Json,
    extract::State,
    response::{Html, IntoResponse},
};

use crate::{
    graphql::{AppSchema, context::RequestContext},
    utils::jwt::Identity,
};

/// Executes a query or mutation on behalf of the caller resolved by `auth_middleware`.
pub async fn graphql_handler(
    State(schema): State<AppSchema>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let request = request.data(RequestContext::new(identity));
    Json(schema.execute(request).await)
}

/// Serves the GraphiQL IDE.
pub async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}
