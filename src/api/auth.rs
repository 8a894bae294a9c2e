use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::ApiError;
use super::validation::validate_register;
use crate::db::{LoginRequest, LoginResponse, RegisterRequest, Role, Session, User, UserResponse};
use crate::AppState;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random bearer token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage; only the hash ever reaches the database
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Bearer token from the Authorization header
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Open a session for `user` and hand back the raw token
async fn start_session(state: &AppState, user: User) -> Result<LoginResponse, ApiError> {
    let token = generate_token();
    let expires_at = chrono::Utc::now()
        .checked_add_signed(state.config.auth.session_ttl())
        .ok_or_else(|| ApiError::internal("Session expiry is out of range"))?;

    Session::create(&state.db, &user.id, &hash_token(&token), expires_at).await?;

    Ok(LoginResponse {
        token,
        user: UserResponse::from(user),
    })
}

/// Register endpoint; signs the new user in right away
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError> {
    validate_register(&request)?;

    let email = request.email.trim().to_lowercase();
    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let user = User::create(
        &state.db,
        &email,
        &password_hash,
        request.name.as_deref().map(str::trim),
        request.image.as_deref(),
        Role::User,
    )
    .await?;

    info!(user_id = %user.id, "Registered new user");

    let response = start_session(&state, user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = User::find_by_email(&state.db, request.email.trim()).await?;

    let user = match user {
        Some(user) if verify_password(&request.password, &user.password_hash) => user,
        _ => {
            warn!("Failed login attempt");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    info!(user_id = %user.id, "User logged in");
    Ok(Json(start_session(&state, user).await?))
}

/// Logout endpoint; revokes the presented token
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = extract_token(&headers).ok_or_else(|| ApiError::unauthorized("Missing token"))?;
    Session::delete_by_token_hash(&state.db, &hash_token(token)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user's profile
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Resolve a bearer token to its user, if the session is still live
pub async fn get_current_user(pool: &sqlx::SqlitePool, token: &str) -> Result<User, ApiError> {
    let session = Session::find_active(pool, &hash_token(token))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session expired or invalid"))?;

    User::find_by_id(pool, &session.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session expired or invalid"))
}

/// Extractor for the authenticated user behind a request
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        get_current_user(&state.db, token).await.map(CurrentUser)
    }
}
