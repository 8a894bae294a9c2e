//! Saved listings (user <-> listing many-to-many).

use chrono::Utc;
use sqlx::SqlitePool;

use super::listing::{Listing, ListingSummary};

pub struct Favorite;

impl Favorite {
    /// Save a listing for a user. Saving the same listing twice is a no-op.
    pub async fn add(db: &SqlitePool, user_id: &str, listing_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO favorites (user_id, listing_id, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(listing_id)
            .bind(Utc::now())
            .execute(db)
            .await?;
        Ok(())
    }

    /// Returns whether a favorite was actually removed
    pub async fn remove(db: &SqlitePool, user_id: &str, listing_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND listing_id = ?")
            .bind(user_id)
            .bind(listing_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// A user's favorite listings with their reviews, most recently saved first
    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<ListingSummary>, sqlx::Error> {
        let listings: Vec<Listing> = sqlx::query_as(
            r#"
            SELECT l.* FROM listings l
            JOIN favorites f ON f.listing_id = l.id
            WHERE f.user_id = ?
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        Listing::with_reviews(db, listings).await
    }
}
