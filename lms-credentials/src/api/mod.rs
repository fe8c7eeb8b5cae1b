//! HTTP API handlers for lms-credentials

pub mod awards;
pub mod config;
pub mod health;

pub use awards::award_routes;
pub use config::config_routes;
pub use health::health_routes;
