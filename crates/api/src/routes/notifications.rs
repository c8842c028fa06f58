use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use infra::repos::NotificationRepo;

/// Transparent 1x1 GIF.
static PIXEL: Lazy<Vec<u8>> = Lazy::new(|| {
    STANDARD
        .decode("R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7")
        .unwrap_or_default()
});

/// GET /notifications/track/:receipt_id - open tracking pixel
pub async fn track_open(
    State(state): State<AppState>,
    Path(receipt_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let found = NotificationRepo::new(state.db.clone())
        .mark_opened(receipt_id)
        .await?;
    if !found {
        tracing::debug!(%receipt_id, "tracking pixel for unknown receipt");
    }

    Ok((
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-store, max-age=0"),
        ],
        PIXEL.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_is_a_gif() {
        assert!(PIXEL.starts_with(b"GIF89a"));
    }
}
