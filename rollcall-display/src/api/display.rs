//! Display state and operator controls

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rollcall_common::api::ErrorResponse;
use tracing::warn;

use crate::error::DisplayError;
use crate::slot::DisplaySnapshot;
use crate::AppState;

/// Operator command could not be delivered
#[derive(Debug)]
pub struct DisplayApiError(DisplayError);

impl From<DisplayError> for DisplayApiError {
    fn from(err: DisplayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for DisplayApiError {
    fn into_response(self) -> Response {
        warn!("Display command failed: {}", self.0);
        let status = match self.0 {
            DisplayError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

/// GET /api/display
pub async fn get_display(State(state): State<AppState>) -> Json<DisplaySnapshot> {
    Json(state.display.snapshot())
}

/// POST /api/display/reset
///
/// Clears the slot and all record memory; the next poll result is treated
/// as the boot record again.
pub async fn reset_display(State(state): State<AppState>) -> Result<StatusCode, DisplayApiError> {
    state.display.reset().await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/display/test
pub async fn test_display(State(state): State<AppState>) -> Result<StatusCode, DisplayApiError> {
    state.display.show_test().await?;
    Ok(StatusCode::ACCEPTED)
}
