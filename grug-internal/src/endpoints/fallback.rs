use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::persona;

pub async fn handle_404() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": persona::NOT_FOUND_MESSAGE })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_route_shape() {
        let response = handle_404().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
