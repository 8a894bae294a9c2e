use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::{Listing, ListingSummary, User, UserResponse};
use crate::AppState;

use super::error::ApiError;

/// Public profile of any user
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    User::find_by_id(&state.db, &id)
        .await?
        .map(|u| Json(UserResponse::from(u)))
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// Listings published by a user
pub async fn get_user_listings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ListingSummary>>, ApiError> {
    if User::find_by_id(&state.db, &id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(Listing::list_by_owner(&state.db, &id).await?))
}
