//! Credentials service client

use super::ApiClient;
use crate::error::ClientError;
use crate::models::{CredentialRequest, UserCredential};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

/// User credentials collection, relative to the credentials API base
pub const USER_CREDENTIALS_PATH: &str = "user_credentials/";

/// Guard against a service that keeps returning a `next` link
const MAX_PAGES: usize = 100;

/// Credentials service operations used by the reconciler
#[async_trait]
pub trait CredentialsApi: Send + Sync {
    /// All credential records for `username`, in any status
    async fn list_credentials(&self, username: &str) -> Result<Vec<UserCredential>, ClientError>;

    /// Ask the service to issue a program credential
    async fn issue_credential(&self, request: &CredentialRequest) -> Result<(), ClientError>;
}

/// The list endpoint may or may not paginate
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CredentialListing {
    Page {
        results: Vec<UserCredential>,
        #[serde(default)]
        next: Option<String>,
    },
    Plain(Vec<UserCredential>),
}

pub struct HttpCredentialsClient {
    api: ApiClient,
}

impl HttpCredentialsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Validate a `next` link; the id token is only ever sent to the
    /// configured service origin
    fn next_page_url(&self, next: &str) -> Result<Url, ClientError> {
        let url = self
            .api
            .base_url()
            .join(next)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", next, e)))?;
        if url.origin() != self.api.base_url().origin() {
            return Err(ClientError::InvalidUrl(format!(
                "next page {} is outside {}",
                url,
                self.api.base_url()
            )));
        }
        Ok(url)
    }
}

#[async_trait]
impl CredentialsApi for HttpCredentialsClient {
    async fn list_credentials(&self, username: &str) -> Result<Vec<UserCredential>, ClientError> {
        let mut url = self.api.endpoint(USER_CREDENTIALS_PATH)?;
        url.query_pairs_mut().append_pair("username", username);

        let mut credentials = Vec::new();
        for _ in 0..MAX_PAGES {
            match self.api.get_json::<CredentialListing>(url.clone()).await? {
                CredentialListing::Plain(records) => {
                    credentials.extend(records);
                    return Ok(credentials);
                }
                CredentialListing::Page { results, next } => {
                    credentials.extend(results);
                    match next {
                        Some(next) => {
                            url = self.next_page_url(&next)?;
                        }
                        None => return Ok(credentials),
                    }
                }
            }
        }

        tracing::warn!(username, pages = MAX_PAGES, "Stopped following credential pages");
        Ok(credentials)
    }

    async fn issue_credential(&self, request: &CredentialRequest) -> Result<(), ClientError> {
        tracing::debug!(
            username = %request.username,
            program_id = %request.program_id,
            "Calling credentials service to issue program credential"
        );
        self.api.post(USER_CREDENTIALS_PATH, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpCredentialsClient {
        HttpCredentialsClient::new(ApiClient::new(
            reqwest::Client::new(),
            Url::parse("http://credentials.internal:8150/api/v1/").unwrap(),
            "test-token".to_string(),
        ))
    }

    #[test]
    fn test_next_page_on_same_origin_accepted() {
        let url = client()
            .next_page_url("http://credentials.internal:8150/api/v1/user_credentials/?page=2")
            .unwrap();
        assert_eq!(url.query(), Some("page=2"));

        let relative = client().next_page_url("/api/v1/user_credentials/?page=3").unwrap();
        assert_eq!(relative.host_str(), Some("credentials.internal"));
    }

    #[test]
    fn test_next_page_on_other_origin_rejected() {
        let client = client();
        for next in [
            "http://attacker.example/api/v1/user_credentials/?page=2",
            "https://credentials.internal:8150/api/v1/user_credentials/?page=2",
            "http://credentials.internal:9999/api/v1/user_credentials/?page=2",
        ] {
            assert!(
                matches!(client.next_page_url(next), Err(ClientError::InvalidUrl(_))),
                "{} should be rejected",
                next
            );
        }
    }
}
