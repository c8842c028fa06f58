use std::time::Duration;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse, GraphQLSubscription};
use axum::{
    extract::State,
    middleware::from_fn_with_state,
    response::{Html, IntoResponse},
    routing::{get, post},
    Extension, Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::Claims;
use crate::error::AppError;
use crate::gql::AppSchema;
use crate::middleware::jwt_middleware;
use crate::routes::{accounts, notifications};
use crate::state::AppState;

/// Build the Axum router: GraphQL (HTTP and WebSocket), the e-mail link
/// routes and the health check.
pub fn build_router(state: AppState, schema: AppSchema) -> Router {
    let gql_ws = GraphQLSubscription::new(schema.clone());

    Router::new()
        .route("/health", get(health))
        .route("/graphql", post(graphql_handler).get_service(gql_ws))
        .route("/graphiql", get(graphiql))
        .route(
            "/accounts/setup",
            get(accounts::setup_page).post(accounts::complete_setup),
        )
        .route(
            "/notifications/track/:receipt_id",
            get(notifications::track_open),
        )
        .layer(from_fn_with_state(state.clone(), jwt_middleware))
        .layer(Extension(schema))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CorsLayer::permissive())
}

/// Runs a GraphQL request with the caller's claims, when the bearer token
/// was valid.
async fn graphql_handler(
    Extension(schema): Extension<AppSchema>,
    claims: Option<Extension<Claims>>,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = request.into_inner();
    if let Some(Extension(claims)) = claims {
        request = request.data(claims);
    }
    schema.execute(request).await.into()
}

async fn graphiql() -> impl IntoResponse {
    Html(
        GraphiQLSource::build()
            .endpoint("/graphql")
            .subscription_endpoint("/graphql")
            .finish(),
    )
}

/// Liveness plus a database round trip.
async fn health(State(state): State<AppState>) -> Result<&'static str, AppError> {
    infra::db::ping(&state.db).await?;
    Ok("ok")
}
