//! Input validation for API requests.
//!
//! Each `validate_*` function checks one field and returns a message on
//! failure; the request-level helpers run them all through
//! [`ValidationErrorBuilder`] so a client sees every problem at once.

use lazy_static::lazy_static;
use regex::Regex;

use super::error::{ApiError, ValidationErrorBuilder};
use crate::db::{
    Category, Coordinates, CreateBookingRequest, CreateListingRequest, CreateReviewRequest,
    ListingType, RegisterRequest, SendMessageRequest,
};

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 10_000;
const MAX_COMMENT_LEN: usize = 2_000;
const MAX_MESSAGE_LEN: usize = 5_000;
const MAX_GUESTS: i64 = 50;

lazy_static! {
    /// Pragmatic email shape check (local@domain.tld)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$"
    ).unwrap();

    /// ISO 4217 style currency code
    static ref CURRENCY_REGEX: Regex = Regex::new(r"^[A-Za-z]{3}$").unwrap();
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

/// Passwords need 8+ characters with at least one letter and one digit
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err("Password must contain at least one letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }
    Ok(())
}

fn validate_required_text(label: &str, value: &str, max: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    if value.chars().count() > max {
        return Err(format!("{} is too long (max {} characters)", label, max));
    }
    Ok(())
}

pub fn validate_category(category: &str) -> Result<Category, String> {
    Category::from_str(category).ok_or_else(|| {
        format!(
            "Unknown category '{}'. Expected one of: property, hotel, car, experience, ticket",
            category
        )
    })
}

pub fn validate_listing_type(listing_type: &str) -> Result<ListingType, String> {
    ListingType::from_str(listing_type).ok_or_else(|| {
        format!(
            "Unknown listing type '{}'. Expected one of: for_sale, for_rent, booking",
            listing_type
        )
    })
}

pub fn validate_price(price: f64) -> Result<(), String> {
    if !price.is_finite() {
        return Err("Price must be a finite number".to_string());
    }
    if price < 0.0 {
        return Err("Price cannot be negative".to_string());
    }
    Ok(())
}

pub fn validate_currency(currency: &str) -> Result<(), String> {
    if !CURRENCY_REGEX.is_match(currency) {
        return Err("Currency must be a 3-letter code such as USD".to_string());
    }
    Ok(())
}

pub fn validate_coordinates(coordinates: &Option<Coordinates>) -> Result<(), String> {
    if let Some(c) = coordinates {
        if !(-90.0..=90.0).contains(&c.latitude) {
            return Err("Latitude must be between -90 and 90".to_string());
        }
        if !(-180.0..=180.0).contains(&c.longitude) {
            return Err("Longitude must be between -180 and 180".to_string());
        }
    }
    Ok(())
}

pub fn validate_rating(rating: i64) -> Result<(), String> {
    if !(1..=5).contains(&rating) {
        return Err("Rating must be between 1 and 5".to_string());
    }
    Ok(())
}

pub fn validate_register(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("email", validate_email(&req.email));
    errors.check("password", validate_password(&req.password));
    if let Some(name) = &req.name {
        errors.check("name", validate_required_text("Name", name, 100));
    }
    errors.finish()
}

/// Validates a listing and returns its parsed category and type
pub fn validate_listing(req: &CreateListingRequest) -> Result<(Category, ListingType), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("title", validate_required_text("Title", &req.title, MAX_TITLE_LEN));
    errors.check(
        "description",
        validate_required_text("Description", &req.description, MAX_DESCRIPTION_LEN),
    );
    errors.check("location", validate_required_text("Location", &req.location, 200));
    errors.check("price", validate_price(req.price));
    errors.check("currency", validate_currency(&req.currency));
    errors.check("coordinates", validate_coordinates(&req.coordinates));

    let category = validate_category(&req.category);
    let listing_type = validate_listing_type(&req.listing_type);
    match (category, listing_type) {
        (Ok(category), Ok(listing_type)) => {
            errors.finish()?;
            Ok((category, listing_type))
        }
        (category, listing_type) => {
            errors.check("category", category.map(|_| ()));
            errors.check("listing_type", listing_type.map(|_| ()));
            Err(errors
                .finish()
                .err()
                .unwrap_or_else(|| ApiError::bad_request("Invalid listing")))
        }
    }
}

pub fn validate_review(req: &CreateReviewRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("rating", validate_rating(req.rating));
    errors.check("comment", validate_required_text("Comment", &req.comment, MAX_COMMENT_LEN));
    errors.finish()
}

pub fn validate_booking(req: &CreateBookingRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if req.listing_id.trim().is_empty() {
        errors.add("listing_id", "Listing is required");
    }
    if req.end_date < req.start_date {
        errors.add("end_date", "End date cannot be before start date");
    }
    if !(1..=MAX_GUESTS).contains(&req.guests) {
        errors.add("guests", format!("Guests must be between 1 and {}", MAX_GUESTS));
    }
    if let Some(total) = req.total_price {
        errors.check("total_price", validate_price(total));
    }
    errors.finish()
}

pub fn validate_message(req: &SendMessageRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if req.receiver_id.trim().is_empty() {
        errors.add("receiver_id", "Receiver is required");
    }
    errors.check("body", validate_required_text("Message", req.body.trim(), MAX_MESSAGE_LEN));
    errors.finish()
}
