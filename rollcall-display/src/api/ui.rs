//! Kiosk page serving

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};

const INDEX_HTML: &str = include_str!("../ui/index.html");
const KIOSK_JS: &str = include_str!("../ui/kiosk.js");

/// GET /
pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /static/kiosk.js
pub async fn serve_kiosk_js() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript")],
        KIOSK_JS,
    )
        .into_response()
}
