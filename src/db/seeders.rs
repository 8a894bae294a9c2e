//! Demo data for a fresh database
//!
//! Seeds one host account and a handful of listings across every category so
//! the browse screens have something to show. Runs only when the users table
//! is empty.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::info;

use super::models::{Category, Coordinates, CreateListingRequest, Listing, ListingType, Role, User};
use crate::api::auth::hash_password;

pub const DEMO_EMAIL: &str = "demo@bazaar.local";
pub const DEMO_PASSWORD: &str = "bazaar-demo-1";

/// Format: (title, description, category, type, price, location, lat, lng)
const DEMO_LISTINGS: &[(&str, &str, Category, ListingType, f64, &str, f64, f64)] = &[
    (
        "Modern Apartment with Ocean View",
        "Beautiful 2-bedroom apartment with stunning ocean views, modern amenities, and a prime location.",
        Category::Property,
        ListingType::ForSale,
        450000.0,
        "Miami, FL",
        25.7617,
        -80.1918,
    ),
    (
        "Luxury Villa with Pool",
        "Spacious 4-bedroom villa with private pool, garden, and modern interior design.",
        Category::Property,
        ListingType::ForSale,
        850000.0,
        "Los Angeles, CA",
        34.0522,
        -118.2437,
    ),
    (
        "Grand Luxury Resort & Spa",
        "5-star luxury resort with ocean views, multiple pools, and world-class dining options.",
        Category::Hotel,
        ListingType::Booking,
        350.0,
        "Cancun, Mexico",
        21.1619,
        -86.8515,
    ),
    (
        "City Center Boutique Hotel",
        "Charming boutique hotel in the heart of the city with unique rooms and personalized service.",
        Category::Hotel,
        ListingType::Booking,
        180.0,
        "Paris, France",
        48.8566,
        2.3522,
    ),
    (
        "2023 Tesla Model 3",
        "Electric sedan with long range, autopilot features, and premium interior.",
        Category::Car,
        ListingType::ForSale,
        45000.0,
        "San Francisco, CA",
        37.7749,
        -122.4194,
    ),
    (
        "2022 BMW X5",
        "Luxury SUV with powerful engine, advanced technology, and spacious interior.",
        Category::Car,
        ListingType::ForRent,
        65000.0,
        "Miami, FL",
        25.7617,
        -80.1918,
    ),
    (
        "Wine Tasting Tour",
        "Guided tour of local wineries with tastings, food pairings, and transportation included.",
        Category::Experience,
        ListingType::Booking,
        120.0,
        "Napa Valley, CA",
        38.2975,
        -122.2869,
    ),
    (
        "Broadway Musical Tickets",
        "Premium seats for the hit Broadway musical with an award-winning cast.",
        Category::Ticket,
        ListingType::Booking,
        150.0,
        "New York, NY",
        40.7580,
        -73.9855,
    ),
];

/// Seed demo listings. Returns how many listings were inserted.
pub async fn seed_demo_data(pool: &SqlitePool) -> Result<usize> {
    let users: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if users.0 > 0 {
        info!("Database already has users, skipping demo data");
        return Ok(0);
    }

    info!("Seeding demo data...");

    let password_hash = hash_password(DEMO_PASSWORD)
        .map_err(|e| anyhow::anyhow!("Failed to hash demo password: {}", e))?;
    let host = User::create(
        pool,
        DEMO_EMAIL,
        &password_hash,
        Some("Demo Host"),
        None,
        Role::User,
    )
    .await
    .context("Failed to create demo user")?;

    for (title, description, category, listing_type, price, location, lat, lng) in DEMO_LISTINGS {
        let req = CreateListingRequest {
            title: title.to_string(),
            description: description.to_string(),
            category: category.as_str().to_string(),
            listing_type: listing_type.as_str().to_string(),
            price: *price,
            currency: "USD".to_string(),
            location: location.to_string(),
            image: None,
            coordinates: Some(Coordinates {
                latitude: *lat,
                longitude: *lng,
            }),
        };
        Listing::create(pool, &host.id, *category, *listing_type, &req)
            .await
            .with_context(|| format!("Failed to seed listing '{}'", title))?;
    }

    info!(
        listings = DEMO_LISTINGS.len(),
        email = DEMO_EMAIL,
        "Demo data seeded"
    );
    Ok(DEMO_LISTINGS.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_memory, ListingFilters};

    #[tokio::test]
    async fn test_seeds_every_category_once() {
        let pool = init_memory().await.unwrap();

        assert_eq!(seed_demo_data(&pool).await.unwrap(), DEMO_LISTINGS.len());
        assert_eq!(seed_demo_data(&pool).await.unwrap(), 0);

        for category in Category::ALL {
            let listings = Listing::list_by_category(&pool, category, &ListingFilters::default())
                .await
                .unwrap();
            assert!(!listings.is_empty(), "no demo listings for {}", category);
            assert!(listings.iter().all(|l| l.coordinates.is_some()));
        }

        let host = User::find_by_email(&pool, DEMO_EMAIL).await.unwrap().unwrap();
        assert!(crate::api::auth::verify_password(DEMO_PASSWORD, &host.password_hash));
    }
}
