//! Revisioned configuration snapshots
//!
//! A `ConfigModel<T>` holds an append-only history of configuration
//! revisions. Readers take one `current()` snapshot per unit of work and use
//! it throughout; writers record a new revision rather than mutating the
//! current one, so an in-flight reader never observes a half-applied change.
//!
//! The model is an explicit value passed to whoever needs it (usually inside
//! an `Arc`), not an ambient global.
//!
//! # Usage
//!
//! ```rust
//! use lms_common::ConfigModel;
//!
//! let model: ConfigModel<String> = ConfigModel::new("greeting");
//! assert!(!model.current().enabled);
//!
//! model.record(true, "hello".to_string(), Some("admin"));
//! let snapshot = model.current();
//! assert!(snapshot.enabled);
//! assert_eq!(snapshot.value, "hello");
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tracing::info;

/// One recorded configuration revision
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfigEntry<T> {
    /// Monotonic revision number; 0 means "never configured"
    pub revision: u64,
    /// Whether this configuration is switched on
    pub enabled: bool,
    /// Who recorded the revision (admin username, "config-file", ...)
    pub changed_by: Option<String>,
    /// When the revision was recorded
    pub change_date: DateTime<Utc>,
    /// Configuration payload
    pub value: T,
}

impl<T: Default> ConfigEntry<T> {
    /// Entry returned when nothing has been recorded yet
    fn unconfigured() -> Self {
        Self {
            revision: 0,
            enabled: false,
            changed_by: None,
            change_date: Utc::now(),
            value: T::default(),
        }
    }
}

/// Append-only revision history with a cheap current snapshot
pub struct ConfigModel<T> {
    name: &'static str,
    history: RwLock<Vec<Arc<ConfigEntry<T>>>>,
}

impl<T> ConfigModel<T>
where
    T: Default + Clone,
{
    /// Create an empty model; `current()` is disabled with default values
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            history: RwLock::new(Vec::new()),
        }
    }

    /// Create a model seeded with one revision
    pub fn with_initial(name: &'static str, enabled: bool, value: T, changed_by: Option<&str>) -> Self {
        let model = Self::new(name);
        model.record(enabled, value, changed_by);
        model
    }

    /// Model name (for logging)
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Latest revision, or an unconfigured (disabled, default) entry
    pub fn current(&self) -> Arc<ConfigEntry<T>> {
        let history = self.history.read().unwrap_or_else(|e| e.into_inner());
        match history.last() {
            Some(entry) => Arc::clone(entry),
            None => Arc::new(ConfigEntry::unconfigured()),
        }
    }

    /// Record a new revision and return it
    pub fn record(&self, enabled: bool, value: T, changed_by: Option<&str>) -> Arc<ConfigEntry<T>> {
        let mut history = self.history.write().unwrap_or_else(|e| e.into_inner());
        let revision = history.last().map(|e| e.revision).unwrap_or(0) + 1;
        let entry = Arc::new(ConfigEntry {
            revision,
            enabled,
            changed_by: changed_by.map(str::to_string),
            change_date: Utc::now(),
            value,
        });
        history.push(Arc::clone(&entry));

        info!(
            model = self.name,
            revision,
            enabled,
            changed_by = changed_by.unwrap_or("-"),
            "Configuration revision recorded"
        );
        entry
    }

    /// All recorded revisions, oldest first
    pub fn history(&self) -> Vec<Arc<ConfigEntry<T>>> {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
