use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Verifies a bearer token when present and stores its claims in the request
/// extensions. Requests without a valid token go through anonymously.
pub async fn jwt_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| match state.jwt_service().verify_token(token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!("rejected bearer token: {}", e);
                None
            }
        });

    if let Some(claims) = claims {
        request.extensions_mut().insert(claims);
    }

    next.run(request).await
}
