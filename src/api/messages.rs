use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::conversations::{self, Conversation};
use crate::db::{Message, SendMessageRequest, User};
use crate::AppState;

use super::auth::CurrentUser;
use super::error::ApiError;
use super::validation::validate_message;

/// One entry per counterpart, newest conversation first
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    Ok(Json(conversations::list_for_user(&state.db, &user.id).await?))
}

/// Full exchange with one counterpart, oldest first
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(other_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(Message::thread(&state.db, &user.id, &other_id).await?))
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    validate_message(&req)?;

    if User::find_by_id(&state.db, &req.receiver_id).await?.is_none() {
        return Err(ApiError::not_found("Recipient not found"));
    }

    let message = Message::create(&state.db, &user.id, &req.receiver_id, req.body.trim()).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
