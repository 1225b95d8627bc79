use crate::models::TransferRequest;
use crate::service::{TransferError, TransferService};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use common::{auth::AuthUser, AppState};
use serde_json::json;
use std::sync::Arc;

impl IntoResponse for TransferError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            TransferError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            TransferError::OwnershipMismatch => (StatusCode::FORBIDDEN, self.to_string()),
            TransferError::InvalidAmount
            | TransferError::InactiveCard
            | TransferError::SameCardTransfer
            | TransferError::InsufficientFunds => (StatusCode::BAD_REQUEST, self.to_string()),
            TransferError::Conflict => (StatusCode::CONFLICT, self.to_string()),
            TransferError::Infrastructure(msg) => {
                tracing::error!("transfer handler error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn transfers_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(transfer))
        .with_state(state)
}

async fn transfer(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<TransferRequest>,
) -> Result<impl IntoResponse, TransferError> {
    let receipt = TransferService::transfer(&state.db, &auth, payload).await?;
    Ok(Json(receipt))
}
