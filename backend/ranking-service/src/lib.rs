pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod services;
pub mod sessions;

pub use config::Config;
pub use error::{AppError, Result};
pub use services::RankingService;
