//! Profile endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use super::dto::ProfileEnvelope;
use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::AppError;
use crate::service::ProfileService;

fn build_profile_service(state: &AppState) -> ProfileService {
    ProfileService::new(state.db.clone())
}

/// GET /api/profiles/:username
pub async fn get_profile(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileEnvelope>, AppError> {
    let profile = build_profile_service(&state)
        .get_profile(&username, viewer.as_ref())
        .await?;
    Ok(Json(profile.into()))
}

/// POST /api/profiles/:username/follow
pub async fn follow(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileEnvelope>, AppError> {
    let profile = build_profile_service(&state)
        .follow(&username, &viewer)
        .await?;
    Ok(Json(profile.into()))
}

/// DELETE /api/profiles/:username/follow
pub async fn unfollow(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileEnvelope>, AppError> {
    let profile = build_profile_service(&state)
        .unfollow(&username, &viewer)
        .await?;
    Ok(Json(profile.into()))
}
