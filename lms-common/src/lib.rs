//! # LMS Common Library
//!
//! Shared code for the LMS services:
//! - Error type and result alias
//! - TOML configuration file resolution and loading
//! - Configuration-model snapshots (`ConfigModel`)
//! - Event types (`LmsEvent`) and the broadcast `EventBus`

pub mod config;
pub mod config_model;
pub mod error;
pub mod events;

pub use config_model::{ConfigEntry, ConfigModel};
pub use error::{Error, Result};
pub use events::{EventBus, LmsEvent};
