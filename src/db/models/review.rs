//! Listing reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use super::common::{select_where_in, unique_ids};
use super::user::{User, UserResponse};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: String,
    pub rating: i64,
    pub comment: String,
    pub user_id: String,
    pub listing_id: String,
    pub created_at: DateTime<Utc>,
}

/// A review together with the user who wrote it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewWithReviewer {
    #[serde(flatten)]
    pub review: Review,
    pub user: Option<UserResponse>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i64,
    pub comment: String,
}

impl Review {
    /// Insert a review and refresh the listing's rating aggregate in one transaction
    pub async fn create(
        db: &SqlitePool,
        listing_id: &str,
        user_id: &str,
        req: &CreateReviewRequest,
    ) -> Result<Review, sqlx::Error> {
        let review = Review {
            id: Uuid::new_v4().to_string(),
            rating: req.rating,
            comment: req.comment.clone(),
            user_id: user_id.to_string(),
            listing_id: listing_id.to_string(),
            created_at: Utc::now(),
        };

        let mut tx = db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO reviews (id, rating, comment, user_id, listing_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&review.id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(&review.user_id)
        .bind(&review.listing_id)
        .bind(review.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE listings SET
                rating = (SELECT COALESCE(AVG(rating), 0) FROM reviews WHERE listing_id = ?),
                review_count = (SELECT COUNT(*) FROM reviews WHERE listing_id = ?),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(listing_id)
        .bind(listing_id)
        .bind(Utc::now())
        .bind(listing_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(review)
    }

    /// Reviews for a set of listings, grouped by listing id, newest first
    pub async fn for_listings(
        db: &SqlitePool,
        listing_ids: &[String],
    ) -> Result<HashMap<String, Vec<Review>>, sqlx::Error> {
        let mut grouped: HashMap<String, Vec<Review>> = HashMap::new();
        if listing_ids.is_empty() {
            return Ok(grouped);
        }

        let mut query = select_where_in("SELECT * FROM reviews", "listing_id", listing_ids);
        query.push(" ORDER BY created_at DESC");
        let reviews: Vec<Review> = query.build_query_as().fetch_all(db).await?;

        for review in reviews {
            grouped.entry(review.listing_id.clone()).or_default().push(review);
        }
        Ok(grouped)
    }

    /// Reviews of one listing, each with its reviewer attached
    pub async fn list_with_reviewers(
        db: &SqlitePool,
        listing_id: &str,
    ) -> Result<Vec<ReviewWithReviewer>, sqlx::Error> {
        let reviews: Vec<Review> =
            sqlx::query_as("SELECT * FROM reviews WHERE listing_id = ? ORDER BY created_at DESC")
                .bind(listing_id)
                .fetch_all(db)
                .await?;

        let reviewer_ids = unique_ids(reviews.iter().map(|r| r.user_id.as_str()));
        let reviewers: HashMap<String, UserResponse> = User::find_many(db, &reviewer_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), UserResponse::from(u)))
            .collect();

        Ok(reviews
            .into_iter()
            .map(|review| {
                let user = reviewers.get(&review.user_id).cloned();
                ReviewWithReviewer { review, user }
            })
            .collect())
    }
}
