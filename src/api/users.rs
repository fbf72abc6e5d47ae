//! User endpoints

use axum::{extract::State, response::Json};

use super::dto::{
    ApiJson, LoginRequest, RegisterRequest, RequestEnvelope, UpdateUserRequest, UserEnvelope,
    UserResponse,
};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::AccountService;

fn build_account_service(state: &AppState) -> AccountService {
    AccountService::new(
        state.db.clone(),
        state.tokens.clone(),
        state.config.auth.password_hash_cost,
    )
}

/// POST /api/users
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RequestEnvelope<RegisterRequest>>,
) -> Result<Json<UserEnvelope>, AppError> {
    let service = build_account_service(&state);
    let (account, token) = service.register(req.user.into()).await?;

    Ok(Json(UserResponse::new(account, token).into()))
}

/// POST /api/users/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RequestEnvelope<LoginRequest>>,
) -> Result<Json<UserEnvelope>, AppError> {
    let service = build_account_service(&state);
    let (account, token) = service.login(req.user.into()).await?;

    Ok(Json(UserResponse::new(account, token).into()))
}

/// GET /api/user
pub async fn current_user(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<UserEnvelope>, AppError> {
    let service = build_account_service(&state);
    let account = service.current(&identity.account_id).await?;

    Ok(Json(UserResponse::new(account, identity.token).into()))
}

/// PUT /api/user
///
/// Responds with the presented token; updates never reissue one.
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    ApiJson(req): ApiJson<RequestEnvelope<UpdateUserRequest>>,
) -> Result<Json<UserEnvelope>, AppError> {
    let service = build_account_service(&state);
    let account = service
        .update(&identity.account_id, req.user.into())
        .await?;

    Ok(Json(UserResponse::new(account, identity.token).into()))
}
