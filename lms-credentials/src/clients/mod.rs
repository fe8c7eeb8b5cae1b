//! Clients for the remote programs and credentials services
//!
//! Each client is built per run from an API config snapshot and an id token
//! for the acting principal. Requests carry `Authorization: JWT <token>`.

pub mod credentials;
pub mod programs;

pub use credentials::{CredentialsApi, HttpCredentialsClient};
pub use programs::{HttpProgramsClient, ProgramsApi};

use crate::config::{CredentialsApiConfig, ProgramsApiConfig, ServiceApiConfig};
use crate::error::ClientError;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = concat!("lms-credentials/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Authenticated JSON client rooted at one API base URL
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: Url, token: String) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a relative endpoint path against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{}{}: {}", self.base_url, path, e)))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(reqwest::header::AUTHORIZATION, format!("JWT {}", self.token))
    }

    /// GET a URL and decode the JSON body
    pub async fn get_json<R: DeserializeOwned>(&self, url: Url) -> Result<R, ClientError> {
        let response = self.send(self.http.get(url)).await?;
        decode(response).await
    }

    /// POST a JSON body to `path` and decode the JSON response
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self.send(self.http.post(url).json(body)).await?;
        decode(response).await
    }

    /// POST a JSON body to `path`, ignoring the response body
    pub async fn post<B>(&self, path: &str, body: &B) -> Result<(), ClientError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        self.send(self.http.post(url).json(body)).await?;
        Ok(())
    }

    /// Send a request; non-2xx responses become `ClientError::Api`
    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                url,
                body,
            });
        }

        Ok(response)
    }
}

async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, ClientError> {
    response
        .json()
        .await
        .map_err(|e| ClientError::Parse(e.to_string()))
}

/// Builds remote API clients for one run
pub trait ClientFactory: Send + Sync {
    fn programs_client(
        &self,
        config: &ProgramsApiConfig,
        token: String,
    ) -> Result<Arc<dyn ProgramsApi>, ClientError>;

    fn credentials_client(
        &self,
        config: &CredentialsApiConfig,
        token: String,
    ) -> Result<Arc<dyn CredentialsApi>, ClientError>;
}

/// Factory producing reqwest-backed clients sharing one connection pool
#[derive(Clone)]
pub struct HttpClientFactory {
    http: reqwest::Client,
}

impl HttpClientFactory {
    pub fn new() -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self { http })
    }

    fn api_client<C: ServiceApiConfig>(&self, config: &C, token: String) -> Result<ApiClient, ClientError> {
        let base_url = config
            .internal_api_url()
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        Ok(ApiClient::new(self.http.clone(), base_url, token))
    }
}

impl ClientFactory for HttpClientFactory {
    fn programs_client(
        &self,
        config: &ProgramsApiConfig,
        token: String,
    ) -> Result<Arc<dyn ProgramsApi>, ClientError> {
        Ok(Arc::new(HttpProgramsClient::new(self.api_client(config, token)?)))
    }

    fn credentials_client(
        &self,
        config: &CredentialsApiConfig,
        token: String,
    ) -> Result<Arc<dyn CredentialsApi>, ClientError> {
        Ok(Arc::new(HttpCredentialsClient::new(self.api_client(config, token)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_relative_path() {
        let client = ApiClient::new(
            reqwest::Client::new(),
            Url::parse("http://foo/api/v99/").unwrap(),
            "test-token".to_string(),
        );
        assert_eq!(
            client.endpoint("programs/complete/").unwrap().as_str(),
            "http://foo/api/v99/programs/complete/"
        );
    }

    #[test]
    fn test_factory_rejects_unconfigured_url() {
        let factory = HttpClientFactory::new().unwrap();
        let result = factory.programs_client(&ProgramsApiConfig::default(), "t".to_string());
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }
}
