pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod routes;
pub mod state;
pub mod transfer;
pub mod validation;

pub use config::Config;
pub use db::{init_pool, run_migrations};
pub use error::{AppError, AppResult, FieldErrors, ValidationError};
pub use models::{Category, ContactRow};
pub use routes::{cors_layer, create_router};
pub use state::AppState;
