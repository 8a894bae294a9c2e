pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod conversations;
pub mod crypto;
pub mod db;
pub mod session;

pub use db::DbPool;

use config::Config;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        Self { config, db }
    }
}
