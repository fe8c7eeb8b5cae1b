//! Configuration for lms-credentials
//!
//! Loaded once from TOML at startup. Remote API settings are then seeded into
//! `ConfigModel`s so that each reconciliation run works from one snapshot and
//! an operator can record new revisions without restarting.

use lms_common::config::LoggingConfig;
use lms_common::{ConfigModel, Error, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default HTTP port for lms-credentials
pub const DEFAULT_PORT: u16 = 5780;

/// Remote API configuration with a fixed OAuth client name
pub trait ServiceApiConfig {
    /// Name of the OAuth client whose credentials sign id tokens for this API
    const OAUTH2_CLIENT_NAME: &'static str;

    /// Base URL for server-to-server calls, ending in `/`
    fn internal_api_url(&self) -> Result<Url>;
}

/// Join an absolute API path onto a service root URL
fn join_api_path(service_url: &str, api_path: &str) -> Result<Url> {
    let base = Url::parse(service_url)
        .map_err(|e| Error::Config(format!("Invalid service URL '{}': {}", service_url, e)))?;
    base.join(api_path)
        .map_err(|e| Error::Config(format!("Invalid API path '{}': {}", api_path, e)))
}

/// Programs service settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgramsApiConfig {
    #[serde(default)]
    pub internal_service_url: String,
    #[serde(default)]
    pub public_service_url: String,
    #[serde(default = "default_api_version")]
    pub api_version_number: u32,
    /// Whether program certificates may be generated at all
    #[serde(default)]
    pub enable_certification: bool,
}

impl Default for ProgramsApiConfig {
    fn default() -> Self {
        Self {
            internal_service_url: String::new(),
            public_service_url: String::new(),
            api_version_number: default_api_version(),
            enable_certification: false,
        }
    }
}

impl ServiceApiConfig for ProgramsApiConfig {
    const OAUTH2_CLIENT_NAME: &'static str = "programs";

    fn internal_api_url(&self) -> Result<Url> {
        join_api_path(
            &self.internal_service_url,
            &format!("/api/v{}/", self.api_version_number),
        )
    }
}

/// Credentials service settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CredentialsApiConfig {
    #[serde(default)]
    pub internal_service_url: String,
    #[serde(default)]
    pub public_service_url: String,
    /// Whether credentials may be issued to learners
    #[serde(default)]
    pub enable_learner_issuance: bool,
}

impl ServiceApiConfig for CredentialsApiConfig {
    const OAUTH2_CLIENT_NAME: &'static str = "credentials";

    fn internal_api_url(&self) -> Result<Url> {
        join_api_path(&self.internal_service_url, "/api/v1/")
    }
}

/// A TOML section carrying an `enabled` switch next to its settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSection<T> {
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub settings: T,
}

/// Registered OAuth client used to sign id tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Id token issuance settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdTokenConfig {
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_token_expiration")]
    pub expiration_secs: i64,
    /// Secret mixed into anonymous subject ids
    #[serde(default)]
    pub secret_key: String,
}

impl Default for IdTokenConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            expiration_secs: default_token_expiration(),
            secret_key: String::new(),
        }
    }
}

/// Identity used to authenticate credential issuance calls
///
/// Distinct from the learner whose credentials are being issued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceIdentity {
    #[serde(default = "default_service_username")]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            username: default_service_username(),
            email: String::new(),
            full_name: String::new(),
        }
    }
}

/// Background award queue settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerConfig {
    /// Number of concurrent reconciliation workers
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Pending job channel capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound on the retry delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

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

/// SQLite database holding users and generated certificates
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Database file; defaults to `<data_dir>/lms/lms.db`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Configured path or the platform default
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join("lms"))
                .unwrap_or_else(|| PathBuf::from("./lms_data"))
                .join("lms.db")
        })
    }
}

/// Complete lms-credentials configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsServiceConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub programs: ApiSection<ProgramsApiConfig>,
    #[serde(default)]
    pub credentials: ApiSection<CredentialsApiConfig>,
    #[serde(default)]
    pub oauth_clients: HashMap<String, OAuthClientConfig>,
    #[serde(default)]
    pub id_token: IdTokenConfig,
    #[serde(default)]
    pub service_user: ServiceIdentity,
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl CredentialsServiceConfig {
    /// Seed the programs configuration model from this file
    pub fn programs_model(&self) -> ConfigModel<ProgramsApiConfig> {
        ConfigModel::with_initial(
            "programs_api",
            self.programs.enabled,
            self.programs.settings.clone(),
            Some("config-file"),
        )
    }

    /// Seed the credentials configuration model from this file
    pub fn credentials_model(&self) -> ConfigModel<CredentialsApiConfig> {
        ConfigModel::with_initial(
            "credentials_api",
            self.credentials.enabled,
            self.credentials.settings.clone(),
            Some("config-file"),
        )
    }
}

fn default_api_version() -> u32 {
    1
}

fn default_issuer() -> String {
    "http://127.0.0.1:8000/oauth2".to_string()
}

fn default_token_expiration() -> i64 {
    30
}

fn default_service_username() -> String {
    "credentials_service_user".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_programs_api_url_includes_version() {
        let config = ProgramsApiConfig {
            internal_service_url: "http://foo".to_string(),
            api_version_number: 99,
            ..Default::default()
        };
        assert_eq!(config.internal_api_url().unwrap().as_str(), "http://foo/api/v99/");
    }

    #[test]
    fn test_credentials_api_url_replaces_path() {
        let config = CredentialsApiConfig {
            internal_service_url: "http://credentials.internal/some/path".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.internal_api_url().unwrap().as_str(),
            "http://credentials.internal/api/v1/"
        );
    }

    #[test]
    fn test_invalid_service_url_is_config_error() {
        let config = CredentialsApiConfig::default();
        assert!(matches!(config.internal_api_url(), Err(Error::Config(_))));
    }

    #[test]
    fn test_full_file_parses() {
        let content = r#"
            [server]
            port = 6000

            [programs]
            enabled = true
            internal_service_url = "http://programs.internal"
            api_version_number = 2
            enable_certification = true

            [credentials]
            enabled = true
            internal_service_url = "http://credentials.internal"
            enable_learner_issuance = true

            [oauth_clients.programs]
            client_id = "programs-id"
            client_secret = "programs-secret"

            [service_user]
            username = "svc"

            [worker]
            max_retries = 2
        "#;

        let config: CredentialsServiceConfig = toml::from_str(content).unwrap();
        assert_eq!(config.server.port, 6000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.programs.enabled);
        assert_eq!(config.programs.settings.api_version_number, 2);
        assert!(config.credentials.settings.enable_learner_issuance);
        assert_eq!(config.oauth_clients["programs"].client_id, "programs-id");
        assert_eq!(config.service_user.username, "svc");
        assert_eq!(config.worker.max_retries, 2);
        assert_eq!(config.worker.concurrency, 4);

        let programs = config.programs_model().current();
        assert!(programs.enabled);
        assert_eq!(programs.revision, 1);
        assert_eq!(programs.changed_by.as_deref(), Some("config-file"));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: CredentialsServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(!config.programs.enabled);
        assert_eq!(config.service_user.username, "credentials_service_user");
    }
}
