use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::db::{
    CreateListingRequest, CreateReviewRequest, Listing, ListingDetail, ListingFilters,
    ListingWithRelations, Review,
};
use crate::AppState;

use super::auth::CurrentUser;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_category, validate_listing, validate_listing_type, validate_review,
};

/// Query string for browsing; `category` is mandatory
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub listing_type: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub location: Option<String>,
    pub search: Option<String>,
}

pub async fn list_listings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Vec<ListingWithRelations>>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    let category = match query.category.as_deref() {
        None | Some("") => {
            errors.add("category", "Category is required");
            None
        }
        Some(raw) => match validate_category(raw) {
            Ok(category) => Some(category),
            Err(e) => {
                errors.add("category", e);
                None
            }
        },
    };
    if let Some(raw) = query.listing_type.as_deref().filter(|s| !s.is_empty()) {
        errors.check("listing_type", validate_listing_type(raw).map(|_| ()));
    }
    if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
        if min > max {
            errors.add("min_price", "Minimum price cannot exceed maximum price");
        }
    }
    errors.finish()?;

    let category = category
        .ok_or_else(|| ApiError::validation_field("category", "Category is required"))?;
    let filters = ListingFilters {
        listing_type: query.listing_type,
        min_price: query.min_price,
        max_price: query.max_price,
        location: query.location,
        search: query.search,
    };

    let listings = Listing::list_by_category(&state.db, category, &filters).await?;
    Ok(Json(listings))
}

pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ListingDetail>, ApiError> {
    Listing::find_detail(&state.db, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Listing not found"))
}

pub async fn create_listing(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingDetail>), ApiError> {
    let (category, listing_type) = validate_listing(&req)?;

    let listing = Listing::create(&state.db, &user.id, category, listing_type, &req).await?;
    info!(listing_id = %listing.id, user_id = %user.id, category = %category, "Created listing");

    let detail = Listing::find_detail(&state.db, &listing.id)
        .await?
        .ok_or_else(|| ApiError::internal("Listing vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(listing_id): Path<String>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    validate_review(&req)?;

    if Listing::find_by_id(&state.db, &listing_id).await?.is_none() {
        return Err(ApiError::not_found("Listing not found"));
    }

    let review = Review::create(&state.db, &listing_id, &user.id, &req).await?;
    info!(listing_id = %listing_id, rating = review.rating, "Created review");
    Ok((StatusCode::CREATED, Json(review)))
}
