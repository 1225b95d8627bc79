use crate::models::{LoginRequest, SignupRequest, UpdateUserRequest};
use crate::service::{UserError, UserService};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use common::{auth::AuthUser, AppState};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            UserError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            UserError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            UserError::Conflict => (StatusCode::CONFLICT, self.to_string()),
            UserError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            UserError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            UserError::Infrastructure(msg) => {
                tracing::error!("user handler error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

/// Public routes: registration and token issuance.
pub fn auth_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .with_state(state)
}

/// Admin-only user administration.
pub fn users_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .with_state(state)
}

async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, UserError> {
    payload
        .validate()
        .map_err(|e| UserError::InvalidInput(e.to_string()))?;

    let user = UserService::register(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn signin(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, UserError> {
    let resp = UserService::authenticate(&state.db, &state.config, payload).await?;
    Ok(Json(resp))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, UserError> {
    auth.require_admin()?;
    let users = UserService::list_users(&state.db).await?;
    Ok(Json(users))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, UserError> {
    auth.require_admin()?;
    let user = UserService::get_user(&state.db, id).await?;
    Ok(Json(user))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, UserError> {
    auth.require_admin()?;
    payload
        .validate()
        .map_err(|e| UserError::InvalidInput(e.to_string()))?;

    let user = UserService::update_user(&state.db, id, payload).await?;
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, UserError> {
    auth.require_admin()?;
    UserService::delete_user(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
