//! User and session models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use super::common::select_where_in;

/// Account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a user; never carries the password hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            image: user.image,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

impl User {
    pub async fn find_by_id(db: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE email = ? COLLATE NOCASE")
            .bind(email)
            .fetch_optional(db)
            .await
    }

    /// Fetch several users at once, in no particular order
    pub async fn find_many(db: &SqlitePool, ids: &[String]) -> Result<Vec<User>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = select_where_in("SELECT * FROM users", "id", ids);
        query.build_query_as().fetch_all(db).await
    }

    pub async fn create(
        db: &SqlitePool,
        email: &str,
        password_hash: &str,
        name: Option<&str>,
        image: Option<&str>,
        role: Role,
    ) -> Result<User, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, image, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(image)
        .bind(role.as_str())
        .bind(now)
        .bind(now)
        .execute(db)
        .await?;

        Self::find_by_id(db, &id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }
}

impl Session {
    pub async fn create(
        db: &SqlitePool,
        user_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, sqlx::Error> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            token_hash: token_hash.to_string(),
            expires_at,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.token_hash)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(db)
        .await?;

        Ok(session)
    }

    /// Look up a session that has not expired yet
    pub async fn find_active(
        db: &SqlitePool,
        token_hash: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sessions WHERE token_hash = ? AND expires_at > ?")
            .bind(token_hash)
            .bind(Utc::now())
            .fetch_optional(db)
            .await
    }

    pub async fn delete_by_token_hash(db: &SqlitePool, token_hash: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let db = init_memory().await.unwrap();
        let user = User::create(&db, "ada@example.com", "hash", Some("Ada"), None, Role::User)
            .await
            .unwrap();

        let found = User::find_by_email(&db, "ADA@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.role, "user");

        assert!(User::find_by_id(&db, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = init_memory().await.unwrap();
        User::create(&db, "dup@example.com", "hash", None, None, Role::User)
            .await
            .unwrap();
        let err = User::create(&db, "dup@example.com", "hash", None, None, Role::User)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("UNIQUE"));
    }

    #[tokio::test]
    async fn test_find_many() {
        let db = init_memory().await.unwrap();
        let a = User::create(&db, "a@example.com", "h", None, None, Role::User).await.unwrap();
        let b = User::create(&db, "b@example.com", "h", None, None, Role::Admin).await.unwrap();

        let found = User::find_many(&db, &[a.id.clone(), b.id.clone()]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(User::find_many(&db, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_session_not_active() {
        let db = init_memory().await.unwrap();
        let user = User::create(&db, "s@example.com", "h", None, None, Role::User).await.unwrap();

        Session::create(&db, &user.id, "live", Utc::now() + chrono::Duration::days(1))
            .await
            .unwrap();
        Session::create(&db, &user.id, "stale", Utc::now() - chrono::Duration::days(1))
            .await
            .unwrap();

        assert!(Session::find_active(&db, "live").await.unwrap().is_some());
        assert!(Session::find_active(&db, "stale").await.unwrap().is_none());
        assert_eq!(Session::delete_by_token_hash(&db, "live").await.unwrap(), 1);
        assert!(Session::find_active(&db, "live").await.unwrap().is_none());
    }

    #[test]
    fn test_user_response_hides_password_hash() {
        let user = User {
            id: "u1".to_string(),
            email: "x@example.com".to_string(),
            password_hash: "secret".to_string(),
            name: None,
            image: None,
            role: "user".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("secret"));
    }
}
