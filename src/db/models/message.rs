//! Direct messages between two users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The other participant relative to `user_id`, or `None` when the user
    /// took no part in this message
    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        if self.sender_id == user_id {
            Some(&self.receiver_id)
        } else if self.receiver_id == user_id {
            Some(&self.sender_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub body: String,
}

impl Message {
    pub async fn create(
        db: &SqlitePool,
        sender_id: &str,
        receiver_id: &str,
        body: &str,
    ) -> Result<Message, sqlx::Error> {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO messages (id, sender_id, receiver_id, body, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(&message.body)
        .bind(message.created_at)
        .execute(db)
        .await?;

        Ok(message)
    }

    /// Every message the user sent or received, in either direction
    pub async fn list_involving(
        db: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM messages WHERE sender_id = ? OR receiver_id = ?")
            .bind(user_id)
            .bind(user_id)
            .fetch_all(db)
            .await
    }

    /// The full exchange between two users, oldest first
    pub async fn thread(db: &SqlitePool, a: &str, b: &str) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM messages
            WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_all(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_memory, Role, User};

    #[test]
    fn test_counterpart_of() {
        let msg = Message {
            id: "m1".to_string(),
            sender_id: "u".to_string(),
            receiver_id: "c".to_string(),
            body: "hi".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(msg.counterpart_of("u"), Some("c"));
        assert_eq!(msg.counterpart_of("c"), Some("u"));
        assert_eq!(msg.counterpart_of("x"), None);
    }

    #[tokio::test]
    async fn test_thread_contains_both_directions_only() {
        let db = init_memory().await.unwrap();
        let a = User::create(&db, "a@example.com", "h", None, None, Role::User).await.unwrap();
        let b = User::create(&db, "b@example.com", "h", None, None, Role::User).await.unwrap();
        let c = User::create(&db, "c@example.com", "h", None, None, Role::User).await.unwrap();

        Message::create(&db, &a.id, &b.id, "hello").await.unwrap();
        Message::create(&db, &b.id, &a.id, "hi back").await.unwrap();
        Message::create(&db, &a.id, &c.id, "unrelated").await.unwrap();

        let thread = Message::thread(&db, &a.id, &b.id).await.unwrap();
        assert_eq!(thread.len(), 2);
        assert!(thread.iter().all(|m| m.counterpart_of(&a.id) == Some(b.id.as_str())));

        assert_eq!(Message::list_involving(&db, &a.id).await.unwrap().len(), 3);
        assert_eq!(Message::list_involving(&db, &c.id).await.unwrap().len(), 1);
    }
}
