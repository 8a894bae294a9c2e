//! Booking models and DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use super::common::unique_ids;
use super::listing::Listing;
use super::user::{User, UserResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl From<String> for BookingStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "confirmed" => Self::Confirmed,
            "cancelled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub listing_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: i64,
    pub status: String,
    pub total_price: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn status_enum(&self) -> BookingStatus {
        BookingStatus::from(self.status.clone())
    }

    /// Number of nights covered; a same-day booking counts as zero
    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub listing_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_guests")]
    pub guests: i64,
    pub total_price: Option<f64>,
}

fn default_guests() -> i64 {
    1
}

/// A freshly created booking with both sides attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub listing: Option<Listing>,
    pub user: Option<UserResponse>,
}

/// A booking in the user's own list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingWithListing {
    #[serde(flatten)]
    pub booking: Booking,
    pub listing: Option<Listing>,
}

impl Booking {
    /// Single insert; returns the booking with listing and user attached
    pub async fn create(
        db: &SqlitePool,
        user_id: &str,
        req: &CreateBookingRequest,
    ) -> Result<BookingDetails, sqlx::Error> {
        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            listing_id: req.listing_id.clone(),
            start_date: req.start_date,
            end_date: req.end_date,
            guests: req.guests,
            status: BookingStatus::Pending.as_str().to_string(),
            total_price: req.total_price,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, listing_id, start_date, end_date, guests, status, total_price, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&booking.id)
        .bind(&booking.user_id)
        .bind(&booking.listing_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.guests)
        .bind(&booking.status)
        .bind(booking.total_price)
        .bind(booking.created_at)
        .execute(db)
        .await?;

        let listing = Listing::find_by_id(db, &booking.listing_id).await?;
        let user = User::find_by_id(db, &booking.user_id)
            .await?
            .map(UserResponse::from);

        Ok(BookingDetails {
            booking,
            listing,
            user,
        })
    }

    /// A user's bookings with the booked listing attached, newest first
    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<BookingWithListing>, sqlx::Error> {
        let bookings: Vec<Booking> =
            sqlx::query_as("SELECT * FROM bookings WHERE user_id = ? ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(db)
                .await?;

        let listing_ids = unique_ids(bookings.iter().map(|b| b.listing_id.as_str()));
        let listings: HashMap<String, Listing> = Listing::find_many(db, &listing_ids)
            .await?
            .into_iter()
            .map(|l| (l.id.clone(), l))
            .collect();

        Ok(bookings
            .into_iter()
            .map(|booking| BookingWithListing {
                listing: listings.get(&booking.listing_id).cloned(),
                booking,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::listing::tests::{create_listing, listing_request};
    use crate::db::{init_memory, Role};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list_bookings() {
        let db = init_memory().await.unwrap();
        let host = User::create(&db, "host@example.com", "h", None, None, Role::User).await.unwrap();
        let guest = User::create(&db, "guest@example.com", "h", None, None, Role::User).await.unwrap();
        let hotel = create_listing(&db, &host.id, &listing_request("Resort", "hotel", "booking", 350.0)).await;

        let created = Booking::create(
            &db,
            &guest.id,
            &CreateBookingRequest {
                listing_id: hotel.id.clone(),
                start_date: date("2026-07-01"),
                end_date: date("2026-07-04"),
                guests: 2,
                total_price: Some(1050.0),
            },
        )
        .await
        .unwrap();

        assert_eq!(created.booking.status_enum(), BookingStatus::Pending);
        assert_eq!(created.booking.nights(), 3);
        assert_eq!(created.listing.as_ref().unwrap().id, hotel.id);
        assert_eq!(created.user.as_ref().unwrap().id, guest.id);

        let bookings = Booking::list_for_user(&db, &guest.id).await.unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].booking.start_date, date("2026-07-01"));
        assert_eq!(bookings[0].listing.as_ref().unwrap().title, "Resort");

        assert!(Booking::list_for_user(&db, &host.id).await.unwrap().is_empty());
    }

    #[test]
    fn test_status_from_string() {
        assert_eq!(BookingStatus::from("confirmed".to_string()), BookingStatus::Confirmed);
        assert_eq!(BookingStatus::from("cancelled".to_string()), BookingStatus::Cancelled);
        assert_eq!(BookingStatus::from("garbage".to_string()), BookingStatus::Pending);
    }
}
