//! Listings and their eager-loaded relations.
//!
//! A listing is anything offered on the marketplace: a property for sale, a
//! hotel room, a car, an experience or an event ticket. The query helpers
//! here mirror how the client browses: by category with optional filters,
//! by owner, or a single listing with everything needed for its detail view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use super::common::{like_pattern, normalize_label, select_where_in, unique_ids};
use super::review::{Review, ReviewWithReviewer};
use super::user::{User, UserResponse};

/// Listing categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Property,
    Hotel,
    Car,
    Experience,
    Ticket,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Property,
        Category::Hotel,
        Category::Car,
        Category::Experience,
        Category::Ticket,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Property => "property",
            Category::Hotel => "hotel",
            Category::Car => "car",
            Category::Experience => "experience",
            Category::Ticket => "ticket",
        }
    }

    /// Case-insensitive parse; "Hotel", "hotel" and "HOTEL" are the same category
    pub fn from_str(s: &str) -> Option<Self> {
        match normalize_label(s).as_str() {
            "property" => Some(Category::Property),
            "hotel" => Some(Category::Hotel),
            "car" => Some(Category::Car),
            "experience" => Some(Category::Experience),
            "ticket" => Some(Category::Ticket),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a listing is offered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    ForSale,
    ForRent,
    Booking,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::ForSale => "for_sale",
            ListingType::ForRent => "for_rent",
            ListingType::Booking => "booking",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match normalize_label(s).as_str() {
            "forsale" => Some(ListingType::ForSale),
            "forrent" => Some(ListingType::ForRent),
            "booking" => Some(ListingType::Booking),
            _ => None,
        }
    }
}

impl std::fmt::Display for ListingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub listing_type: String,
    pub price: f64,
    pub currency: String,
    pub location: String,
    pub image: Option<String>,
    pub rating: f64,
    pub review_count: i64,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    pub fn category_enum(&self) -> Option<Category> {
        Category::from_str(&self.category)
    }

    pub fn listing_type_enum(&self) -> Option<ListingType> {
        ListingType::from_str(&self.listing_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, FromRow)]
struct CoordinatesRow {
    listing_id: String,
    latitude: f64,
    longitude: f64,
}

/// Listing as returned when browsing a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingWithRelations {
    #[serde(flatten)]
    pub listing: Listing,
    pub user: Option<UserResponse>,
    pub reviews: Vec<Review>,
    pub coordinates: Option<Coordinates>,
}

/// Listing with its reviews only; used for owner and favorite lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSummary {
    #[serde(flatten)]
    pub listing: Listing,
    pub reviews: Vec<Review>,
}

/// Everything the detail view needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: Listing,
    pub user: Option<UserResponse>,
    pub reviews: Vec<ReviewWithReviewer>,
    pub coordinates: Option<Coordinates>,
}

/// Optional narrowing applied on top of the category
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingFilters {
    pub listing_type: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Case-insensitive substring of the location
    pub location: Option<String>,
    /// Case-insensitive substring of the title or description
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub listing_type: String,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub location: String,
    pub image: Option<String>,
    pub coordinates: Option<Coordinates>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Listing {
    pub async fn find_by_id(db: &SqlitePool, id: &str) -> Result<Option<Listing>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM listings WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_many(db: &SqlitePool, ids: &[String]) -> Result<Vec<Listing>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = select_where_in("SELECT * FROM listings", "id", ids);
        query.build_query_as().fetch_all(db).await
    }

    /// Listings of one category with owner, reviews and coordinates attached
    pub async fn list_by_category(
        db: &SqlitePool,
        category: Category,
        filters: &ListingFilters,
    ) -> Result<Vec<ListingWithRelations>, sqlx::Error> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM listings WHERE category = ");
        query.push_bind(category.as_str());

        if let Some(listing_type) = filters
            .listing_type
            .as_deref()
            .and_then(ListingType::from_str)
        {
            query.push(" AND listing_type = ").push_bind(listing_type.as_str());
        }
        if let Some(min_price) = filters.min_price {
            query.push(" AND price >= ").push_bind(min_price);
        }
        if let Some(max_price) = filters.max_price {
            query.push(" AND price <= ").push_bind(max_price);
        }
        if let Some(location) = filters.location.as_deref().filter(|s| !s.is_empty()) {
            query
                .push(" AND location LIKE ")
                .push_bind(like_pattern(location))
                .push(" ESCAPE '\\'");
        }
        if let Some(search) = filters.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            query
                .push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        query.push(" ORDER BY created_at DESC");

        let listings: Vec<Listing> = query.build_query_as().fetch_all(db).await?;
        Self::attach_relations(db, listings).await
    }

    async fn attach_relations(
        db: &SqlitePool,
        listings: Vec<Listing>,
    ) -> Result<Vec<ListingWithRelations>, sqlx::Error> {
        let listing_ids: Vec<String> = listings.iter().map(|l| l.id.clone()).collect();
        let owner_ids = unique_ids(listings.iter().map(|l| l.user_id.as_str()));

        let owners: HashMap<String, UserResponse> = User::find_many(db, &owner_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), UserResponse::from(u)))
            .collect();
        let mut reviews = Review::for_listings(db, &listing_ids).await?;
        let mut coordinates = Coordinates::for_listings(db, &listing_ids).await?;

        Ok(listings
            .into_iter()
            .map(|listing| ListingWithRelations {
                user: owners.get(&listing.user_id).cloned(),
                reviews: reviews.remove(&listing.id).unwrap_or_default(),
                coordinates: coordinates.remove(&listing.id),
                listing,
            })
            .collect())
    }

    /// A single listing with owner, reviewers and coordinates, or `None`
    pub async fn find_detail(
        db: &SqlitePool,
        id: &str,
    ) -> Result<Option<ListingDetail>, sqlx::Error> {
        let Some(listing) = Self::find_by_id(db, id).await? else {
            return Ok(None);
        };

        let user = User::find_by_id(db, &listing.user_id)
            .await?
            .map(UserResponse::from);
        let reviews = Review::list_with_reviewers(db, &listing.id).await?;
        let coordinates = Coordinates::for_listing(db, &listing.id).await?;

        Ok(Some(ListingDetail {
            listing,
            user,
            reviews,
            coordinates,
        }))
    }

    /// Listings created by a user, with their reviews
    pub async fn list_by_owner(
        db: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<ListingSummary>, sqlx::Error> {
        let listings: Vec<Listing> =
            sqlx::query_as("SELECT * FROM listings WHERE user_id = ? ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(db)
                .await?;

        Self::with_reviews(db, listings).await
    }

    pub(crate) async fn with_reviews(
        db: &SqlitePool,
        listings: Vec<Listing>,
    ) -> Result<Vec<ListingSummary>, sqlx::Error> {
        let listing_ids: Vec<String> = listings.iter().map(|l| l.id.clone()).collect();
        let mut reviews = Review::for_listings(db, &listing_ids).await?;

        Ok(listings
            .into_iter()
            .map(|listing| ListingSummary {
                reviews: reviews.remove(&listing.id).unwrap_or_default(),
                listing,
            })
            .collect())
    }

    /// Insert a listing (and its coordinates, if any) for `owner_id`.
    ///
    /// `category` and `listing_type` must already be validated; they are
    /// stored in their canonical form.
    pub async fn create(
        db: &SqlitePool,
        owner_id: &str,
        category: Category,
        listing_type: ListingType,
        req: &CreateListingRequest,
    ) -> Result<Listing, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO listings (
                id, title, description, category, listing_type, price, currency,
                location, image, rating, review_count, user_id, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(category.as_str())
        .bind(listing_type.as_str())
        .bind(req.price)
        .bind(req.currency.to_uppercase())
        .bind(&req.location)
        .bind(&req.image)
        .bind(owner_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if let Some(coords) = req.coordinates {
            sqlx::query("INSERT INTO coordinates (listing_id, latitude, longitude) VALUES (?, ?, ?)")
                .bind(&id)
                .bind(coords.latitude)
                .bind(coords.longitude)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Self::find_by_id(db, &id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }
}

impl Coordinates {
    pub async fn for_listing(
        db: &SqlitePool,
        listing_id: &str,
    ) -> Result<Option<Coordinates>, sqlx::Error> {
        sqlx::query_as("SELECT latitude, longitude FROM coordinates WHERE listing_id = ?")
            .bind(listing_id)
            .fetch_optional(db)
            .await
    }

    pub async fn for_listings(
        db: &SqlitePool,
        listing_ids: &[String],
    ) -> Result<HashMap<String, Coordinates>, sqlx::Error> {
        if listing_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = select_where_in(
            "SELECT listing_id, latitude, longitude FROM coordinates",
            "listing_id",
            listing_ids,
        );
        let rows: Vec<CoordinatesRow> = query.build_query_as().fetch_all(db).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.listing_id,
                    Coordinates {
                        latitude: row.latitude,
                        longitude: row.longitude,
                    },
                )
            })
            .collect())
    }
}
