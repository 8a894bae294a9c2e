//! Database models split into domain-specific modules.
//!
//! Each model owns its queries as associated functions taking the pool, and
//! returns `sqlx::Error` unchanged so callers decide how to surface it.

pub mod booking;
pub mod common;
pub mod favorite;
pub mod listing;
pub mod message;
pub mod review;
pub mod user;

pub use booking::*;
pub use favorite::*;
pub use listing::*;
pub use message::*;
pub use review::*;
pub use user::*;
