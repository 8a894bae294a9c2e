use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::db::{Favorite, Listing, ListingSummary};
use crate::AppState;

use super::auth::CurrentUser;
use super::error::ApiError;

pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ListingSummary>>, ApiError> {
    Ok(Json(Favorite::list_for_user(&state.db, &user.id).await?))
}

/// Save a listing; saving it again is a no-op
pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(listing_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if Listing::find_by_id(&state.db, &listing_id).await?.is_none() {
        return Err(ApiError::not_found("Listing not found"));
    }

    Favorite::add(&state.db, &user.id, &listing_id).await?;
    debug!(user_id = %user.id, listing_id = %listing_id, "Saved favorite");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(listing_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !Favorite::remove(&state.db, &user.id, &listing_id).await? {
        return Err(ApiError::not_found("Favorite not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
