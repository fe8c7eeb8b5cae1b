//! Configuration for lms-web

use crate::session::{SessionStore, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};
use crate::xblock::XBlockDisableConfig;
use lms_common::config::{load_toml_section, LoggingConfig};
use lms_common::{ConfigModel, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default HTTP port for lms-web
pub const DEFAULT_PORT: u16 = 5781;

/// Dotted path of the admin-managed block configuration table
pub const XBLOCK_ADMIN_SECTION: &str = "xblock.admin";

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Localization settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct I18nConfig {
    /// Site default language, used when a client does not send one
    #[serde(default = "default_language_code")]
    pub language_code: String,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            language_code: default_language_code(),
        }
    }
}

/// Session store limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Idle time after which a session is dropped
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
    /// Upper bound on stored sessions; least recently used are evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl SessionConfig {
    pub fn store(&self) -> SessionStore {
        SessionStore::with_limits(Duration::from_secs(self.ttl_secs), self.max_sessions)
    }
}

/// The admin-managed block configuration as written in the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct XBlockAdminConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub blocks: XBlockDisableConfig,
}

/// Block settings: the static deprecated list plus the initial admin record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct XBlockSettings {
    /// Block types deprecated by deployment settings; absent means unset
    #[serde(default)]
    pub deprecated_advanced_component_types: Option<Vec<String>>,
    #[serde(default)]
    pub admin: Option<XBlockAdminConfig>,
}

/// Complete lms-web configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub i18n: I18nConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub xblock: XBlockSettings,
}

impl WebConfig {
    /// Block configuration model seeded from `[xblock.admin]`, if present
    pub fn xblock_model(&self) -> ConfigModel<XBlockDisableConfig> {
        match &self.xblock.admin {
            Some(admin) => ConfigModel::with_initial(
                "xblock_disable_config",
                admin.enabled,
                admin.blocks.clone(),
                Some("config-file"),
            ),
            None => ConfigModel::new("xblock_disable_config"),
        }
    }
}

/// Re-read only the `[xblock.admin]` table from `path`
pub fn load_xblock_admin(path: &Path) -> Result<Option<XBlockAdminConfig>> {
    load_toml_section(path, XBLOCK_ADMIN_SECTION)
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL.as_secs()
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

fn default_language_code() -> String {
    "en".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WebConfig::default();
        assert_eq!(config.server.port, 5781);
        assert_eq!(config.i18n.language_code, "en");
        assert_eq!(config.session.ttl_secs, 1_209_600);
        assert_eq!(config.session.max_sessions, 10_000);
        assert!(config.xblock.deprecated_advanced_component_types.is_none());
        assert_eq!(config.xblock_model().current().revision, 0);
    }

    #[test]
    fn test_parse_xblock_sections() {
        let config: WebConfig = toml::from_str(
            r#"
            [i18n]
            language_code = "fr"

            [xblock]
            deprecated_advanced_component_types = ["poll", "survey"]

            [xblock.admin]
            enabled = true
            disabled_blocks = "library_content"
            deprecated_blocks = "annotatable"
            "#,
        )
        .unwrap();

        assert_eq!(config.i18n.language_code, "fr");
        assert_eq!(
            config.xblock.deprecated_advanced_component_types,
            Some(vec!["poll".to_string(), "survey".to_string()])
        );

        let entry = config.xblock_model().current();
        assert_eq!(entry.revision, 1);
        assert!(entry.enabled);
        assert_eq!(entry.value.disabled_blocks, "library_content");
        assert_eq!(entry.changed_by.as_deref(), Some("config-file"));
    }
}
