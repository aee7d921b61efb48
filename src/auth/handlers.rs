use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, SignupRequest, SignupResponse},
        jwt::{AuthUser, JwtKeys},
        services,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let res = services::signup(state.store.as_ref(), &keys, payload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let res = services::login(state.store.as_ref(), &keys, payload).await?;
    Ok(Json(res))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<PublicUser>> {
    let Some(found) = state.store.find_by_id(user.id).await? else {
        warn!(user_id = %user.id, "token subject not found");
        return Err(AppError::Unauthorized("user not found"));
    };
    Ok(Json(found.into()))
}
