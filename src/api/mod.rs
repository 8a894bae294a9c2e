pub mod auth;
mod bookings;
pub mod error;
mod favorites;
mod listings;
mod messages;
mod users;
pub mod validation;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Session handling; `me` and `logout` need a bearer token
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    // Handlers that take `CurrentUser` reject anonymous requests themselves
    let api_routes = Router::new()
        // Listings
        .route(
            "/listings",
            get(listings::list_listings).post(listings::create_listing),
        )
        .route("/listings/:id", get(listings::get_listing))
        .route("/listings/:id/reviews", post(listings::create_review))
        // Users
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/listings", get(users::get_user_listings))
        // Favorites
        .route("/favorites", get(favorites::list_favorites))
        .route(
            "/favorites/:listing_id",
            put(favorites::add_favorite).delete(favorites::remove_favorite),
        )
        // Bookings
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        // Messaging
        .route("/conversations", get(messages::list_conversations))
        .route("/conversations/:user_id", get(messages::get_thread))
        .route("/messages", post(messages::send_message));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let pool = db::init_memory().await.unwrap();
        create_router(Arc::new(AppState::new(Config::default(), pool)))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    /// Registers a user and returns (token, user id)
    async fn register(app: &Router, email: &str, name: &str) -> (String, String) {
        let response = send(
            app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": email, "password": "hunter22x", "name": name })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn create_listing(app: &Router, token: &str, title: &str, category: &str) -> String {
        let response = send(
            app,
            "POST",
            "/api/listings",
            Some(token),
            Some(json!({
                "title": title,
                "description": "A fine place",
                "category": category,
                "listing_type": "for_rent",
                "price": 120.0,
                "location": "Miami, FL",
                "coordinates": { "latitude": 25.76, "longitude": -80.19 }
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_app().await;
        let response = send(&app, "GET", "/health", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_register_login_me_logout() {
        let app = test_app().await;
        let (token, user_id) = register(&app, "Ada@Example.com", "Ada").await;

        let me = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(me.status(), StatusCode::OK);
        let me = body_json(me).await;
        assert_eq!(me["id"], user_id.as_str());
        assert_eq!(me["email"], "ada@example.com");
        assert!(me.get("password_hash").is_none());

        let login = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "hunter22x" })),
        )
        .await;
        assert_eq!(login.status(), StatusCode::OK);

        let logout = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
        assert_eq!(logout.status(), StatusCode::NO_CONTENT);

        let me = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_oversized_session_ttl_still_signs_in() {
        let pool = db::init_memory().await.unwrap();
        let mut config = Config::default();
        config.auth.session_ttl_days = 1_000_000_000;
        let app = create_router(Arc::new(AppState::new(config, pool)));

        let (token, _) = register(&app, "ada@example.com", "Ada").await;
        let me = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(me.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let app = test_app().await;
        register(&app, "ada@example.com", "Ada").await;

        let response = send(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "ADA@example.com", "password": "hunter22x" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["error"]["code"], "conflict");
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let app = test_app().await;
        register(&app, "ada@example.com", "Ada").await;

        let response = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong-pass1" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_listings_require_category() {
        let app = test_app().await;

        let response = send(&app, "GET", "/api/listings", None, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "validation_error");
        assert!(body["error"]["details"]["category"].is_array());

        let response = send(&app, "GET", "/api/listings?category=boat", None, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_browse_category_with_relations() {
        let app = test_app().await;
        let (token, user_id) = register(&app, "host@example.com", "Host").await;
        let hotel = create_listing(&app, &token, "Grand Luxury Resort & Spa", "hotel").await;
        create_listing(&app, &token, "Beach Condo", "property").await;

        let response = send(&app, "GET", "/api/listings?category=Hotel", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], hotel.as_str());
        assert_eq!(items[0]["user"]["id"], user_id.as_str());
        assert_eq!(items[0]["coordinates"]["latitude"], 25.76);
        assert!(items[0]["reviews"].as_array().unwrap().is_empty());

        let response = send(
            &app,
            "GET",
            "/api/listings?category=hotel&max_price=100",
            None,
            None,
        )
        .await;
        assert!(body_json(response).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_listing_requires_auth() {
        let app = test_app().await;
        let response = send(
            &app,
            "POST",
            "/api/listings",
            None,
            Some(json!({
                "title": "x", "description": "y", "category": "car",
                "listing_type": "for_sale", "price": 1.0, "location": "z"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_review_updates_rating() {
        let app = test_app().await;
        let (host, _) = register(&app, "host@example.com", "Host").await;
        let (guest, guest_id) = register(&app, "guest@example.com", "Guest").await;
        let listing = create_listing(&app, &host, "Cabin", "property").await;

        for rating in [5, 4] {
            let response = send(
                &app,
                "POST",
                &format!("/api/listings/{}/reviews", listing),
                Some(&guest),
                Some(json!({ "rating": rating, "comment": "Lovely" })),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let detail = body_json(send(&app, "GET", &format!("/api/listings/{}", listing), None, None).await).await;
        assert_eq!(detail["rating"], 4.5);
        assert_eq!(detail["review_count"], 2);
        assert_eq!(detail["reviews"][0]["user"]["id"], guest_id.as_str());

        let response = send(
            &app,
            "POST",
            "/api/listings/missing/reviews",
            Some(&guest),
            Some(json!({ "rating": 3, "comment": "?" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_listing_is_404() {
        let app = test_app().await;
        let response = send(&app, "GET", "/api/listings/nope", None, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn test_favorites_flow() {
        let app = test_app().await;
        let (token, _) = register(&app, "ada@example.com", "Ada").await;
        let listing = create_listing(&app, &token, "Cabin", "property").await;
        let uri = format!("/api/favorites/{}", listing);

        assert_eq!(send(&app, "PUT", &uri, Some(&token), None).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(send(&app, "PUT", &uri, Some(&token), None).await.status(), StatusCode::NO_CONTENT);

        let list = body_json(send(&app, "GET", "/api/favorites", Some(&token), None).await).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        assert_eq!(send(&app, "DELETE", &uri, Some(&token), None).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(send(&app, "DELETE", &uri, Some(&token), None).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            send(&app, "PUT", "/api/favorites/missing", Some(&token), None).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_booking_flow() {
        let app = test_app().await;
        let (host, _) = register(&app, "host@example.com", "Host").await;
        let (guest, guest_id) = register(&app, "guest@example.com", "Guest").await;
        let listing = create_listing(&app, &host, "Resort", "hotel").await;

        let response = send(
            &app,
            "POST",
            "/api/bookings",
            Some(&guest),
            Some(json!({
                "listing_id": listing,
                "start_date": "2026-12-01",
                "end_date": "2026-12-04",
                "guests": 2,
                "total_price": 1050.0
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["status"], "pending");
        assert_eq!(created["user"]["id"], guest_id.as_str());
        assert_eq!(created["listing"]["id"], listing.as_str());

        let list = body_json(send(&app, "GET", "/api/bookings", Some(&guest), None).await).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        let host_list = body_json(send(&app, "GET", "/api/bookings", Some(&host), None).await).await;
        assert!(host_list.as_array().unwrap().is_empty());

        let response = send(
            &app,
            "POST",
            "/api/bookings",
            Some(&guest),
            Some(json!({
                "listing_id": listing,
                "start_date": "2026-12-04",
                "end_date": "2026-12-01"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_messaging_and_conversations() {
        let app = test_app().await;
        let (ada, ada_id) = register(&app, "ada@example.com", "Ada").await;
        let (bob, bob_id) = register(&app, "bob@example.com", "Bob").await;
        let (_, cy_id) = register(&app, "cy@example.com", "Cy").await;

        for (token, to, body) in [
            (&ada, &bob_id, "hi bob"),
            (&bob, &ada_id, "hey ada"),
            (&ada, &cy_id, "hi cy"),
        ] {
            let response = send(
                &app,
                "POST",
                "/api/messages",
                Some(token.as_str()),
                Some(json!({ "receiver_id": to, "body": body })),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let convos = body_json(send(&app, "GET", "/api/conversations", Some(&ada), None).await).await;
        let convos = convos.as_array().unwrap();
        assert_eq!(convos.len(), 2);
        let with_bob = convos.iter().find(|c| c["user"]["id"] == bob_id.as_str()).unwrap();
        assert_eq!(with_bob["last_message"]["body"], "hey ada");

        let thread = body_json(
            send(&app, "GET", &format!("/api/conversations/{}", bob_id), Some(&ada), None).await,
        )
        .await;
        let bodies: Vec<&str> = thread
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["body"].as_str().unwrap())
            .collect();
        assert_eq!(bodies, vec!["hi bob", "hey ada"]);

        let response = send(
            &app,
            "POST",
            "/api/messages",
            Some(&ada),
            Some(json!({ "receiver_id": "ghost", "body": "anyone?" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_user_profile_and_listings() {
        let app = test_app().await;
        let (token, user_id) = register(&app, "host@example.com", "Host").await;
        create_listing(&app, &token, "Cabin", "property").await;

        let profile = body_json(send(&app, "GET", &format!("/api/users/{}", user_id), None, None).await).await;
        assert_eq!(profile["name"], "Host");

        let listings = body_json(
            send(&app, "GET", &format!("/api/users/{}/listings", user_id), None, None).await,
        )
        .await;
        assert_eq!(listings.as_array().unwrap().len(), 1);

        let missing = send(&app, "GET", "/api/users/nope", None, None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
