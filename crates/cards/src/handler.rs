use crate::models::{CardSearchQuery, CreateCardRequest};
use crate::service::{CardError, CardService};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use common::{auth::AuthUser, AppState};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

impl IntoResponse for CardError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            CardError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            CardError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            CardError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            CardError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            CardError::Infrastructure(msg) => {
                tracing::error!("card handler error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn cards_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        // Specific routes first
        .route("/", get(list_cards).post(create_card))
        .route("/search", get(search_cards))
        .route("/user/{id}", get(cards_for_user))
        // Then parameterized routes
        .route("/{id}", get(get_card).delete(delete_card))
        .route("/{id}/block", patch(block_card))
        .route("/{id}/activate", patch(activate_card))
        .with_state(state)
}

async fn list_cards(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, CardError> {
    auth.require_admin()?;
    let cards = CardService::list_cards(&state.db).await?;
    Ok(Json(cards))
}

async fn get_card(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, CardError> {
    auth.require_admin()?;
    let card = CardService::get_card(&state.db, id).await?;
    Ok(Json(card))
}

async fn cards_for_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, CardError> {
    let cards = CardService::list_cards_for_user(&state.db, user_id, &auth).await?;
    Ok(Json(cards))
}

async fn create_card(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<CreateCardRequest>,
) -> Result<impl IntoResponse, CardError> {
    auth.require_admin()?;
    payload
        .validate()
        .map_err(|e| CardError::InvalidInput(e.to_string()))?;

    let card = CardService::create_card(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

async fn block_card(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, CardError> {
    auth.require_admin()?;
    let card = CardService::block_card(&state.db, id).await?;
    Ok(Json(card))
}

async fn activate_card(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, CardError> {
    auth.require_admin()?;
    let card = CardService::activate_card(&state.db, id).await?;
    Ok(Json(card))
}

async fn delete_card(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, CardError> {
    auth.require_admin()?;
    CardService::delete_card(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn search_cards(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<CardSearchQuery>,
) -> Result<impl IntoResponse, CardError> {
    auth.require_admin()?;
    let page = CardService::search(&state.db, query).await?;
    Ok(Json(page))
}
