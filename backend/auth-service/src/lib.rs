pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod security;
pub mod services;
pub mod telemetry;
pub mod validators;

pub use config::Config;
pub use error::{AuthError, Result};

use redis::aio::ConnectionManager;
use services::auth::AuthService;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: ConnectionManager,
    pub auth: AuthService,
}
