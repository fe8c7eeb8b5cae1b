//! HTTP API handlers for lms-web

pub mod health;
pub mod i18n;
pub mod xblock;

pub use health::health_routes;
pub use i18n::i18n_routes;
pub use xblock::xblock_routes;
