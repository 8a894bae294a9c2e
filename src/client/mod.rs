//! Typed HTTP client for the marketplace API.
//!
//! Requests carry the bearer token of the attached [`AuthSession`] whenever
//! it is authenticated. Any non-2xx response is turned into
//! [`ClientError::Api`] using the server's error envelope.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::api::error::ErrorResponse;
use crate::conversations::Conversation;
use crate::db::{
    BookingDetails, BookingWithListing, CreateBookingRequest, ListingDetail, ListingFilters,
    ListingWithRelations, LoginRequest, LoginResponse, Message, RegisterRequest,
    SendMessageRequest, UserResponse,
};
use crate::session::AuthSession;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("not signed in")]
    NotAuthenticated,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Option<Arc<AuthSession>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: None,
        })
    }

    /// Authenticate requests with the token held by `session`
    pub fn with_session(mut self, session: Arc<AuthSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "API request");

        let builder = self.http.request(method, url);
        match self.session.as_ref().and_then(|s| s.token()) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let signed_in = self
            .session
            .as_ref()
            .map(|s| s.is_authenticated())
            .unwrap_or(false);
        if !signed_in {
            return Err(ClientError::NotAuthenticated);
        }
        Ok(self.request(method, path))
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    status.canonical_reason().unwrap_or("error").to_string()
                } else {
                    body
                }
            });

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        builder: RequestBuilder,
        body: &B,
    ) -> Result<T, ClientError> {
        Self::json(builder.json(body)).await
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<LoginResponse, ClientError> {
        Self::send_json(self.request(Method::POST, "/api/auth/register"), req).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        Self::send_json(self.request(Method::POST, "/api/auth/login"), &req).await
    }

    /// Revoke the current token on the server
    pub async fn logout(&self) -> Result<(), ClientError> {
        let builder = self.authed(Method::POST, "/api/auth/logout")?;
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    pub async fn me(&self) -> Result<UserResponse, ClientError> {
        Self::json(self.authed(Method::GET, "/api/auth/me")?).await
    }

    pub async fn listings(
        &self,
        category: &str,
        filters: &ListingFilters,
    ) -> Result<Vec<ListingWithRelations>, ClientError> {
        let mut query: Vec<(&str, String)> = vec![("category", category.to_string())];
        if let Some(v) = &filters.listing_type {
            query.push(("listing_type", v.clone()));
        }
        if let Some(v) = filters.min_price {
            query.push(("min_price", v.to_string()));
        }
        if let Some(v) = filters.max_price {
            query.push(("max_price", v.to_string()));
        }
        if let Some(v) = &filters.location {
            query.push(("location", v.clone()));
        }
        if let Some(v) = &filters.search {
            query.push(("search", v.clone()));
        }

        Self::json(self.request(Method::GET, "/api/listings").query(&query)).await
    }

    pub async fn listing(&self, id: &str) -> Result<ListingDetail, ClientError> {
        Self::json(self.request(Method::GET, &format!("/api/listings/{}", id))).await
    }

    pub async fn conversations(&self) -> Result<Vec<Conversation>, ClientError> {
        Self::json(self.authed(Method::GET, "/api/conversations")?).await
    }

    pub async fn send_message(&self, receiver_id: &str, body: &str) -> Result<Message, ClientError> {
        let req = SendMessageRequest {
            receiver_id: receiver_id.to_string(),
            body: body.to_string(),
        };
        Self::send_json(self.authed(Method::POST, "/api/messages")?, &req).await
    }

    pub async fn bookings(&self) -> Result<Vec<BookingWithListing>, ClientError> {
        Self::json(self.authed(Method::GET, "/api/bookings")?).await
    }

    pub async fn create_booking(
        &self,
        req: &CreateBookingRequest,
    ) -> Result<BookingDetails, ClientError> {
        Self::send_json(self.authed(Method::POST, "/api/bookings")?, req).await
    }
}
