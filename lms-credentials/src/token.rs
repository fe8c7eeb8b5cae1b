//! Id tokens for authenticating outbound service calls
//!
//! Every remote call is authenticated with a short-lived JWT minted for the
//! acting principal (the learner, or the configured service identity) and
//! addressed to one registered OAuth client. The token's audience is the
//! client's id and it is signed (HS256) with the client's secret, so the
//! receiving service can verify it with its own client registration.

use crate::config::{IdTokenConfig, OAuthClientConfig, ServiceIdentity};
use crate::error::TokenError;
use crate::models::User;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Who a token is issued for
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSubject {
    /// Platform user id; `None` for service identities without a user row
    pub user_id: Option<i64>,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub administrator: bool,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        Self {
            user_id: Some(user.id),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            administrator: false,
        }
    }
}

impl From<&ServiceIdentity> for TokenSubject {
    fn from(identity: &ServiceIdentity) -> Self {
        Self {
            user_id: None,
            username: identity.username.clone(),
            email: identity.email.clone(),
            full_name: identity.full_name.clone(),
            administrator: true,
        }
    }
}

/// Mints id tokens for a subject and a named OAuth client
pub trait TokenIssuer: Send + Sync {
    fn get_id_token(&self, subject: &TokenSubject, client_name: &str) -> Result<String, TokenError>;
}

/// Id token claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub preferred_username: String,
    pub name: String,
    pub email: String,
    pub administrator: bool,
}

/// HS256 JWT issuer backed by configured OAuth clients
pub struct JwtTokenIssuer {
    config: IdTokenConfig,
    clients: HashMap<String, OAuthClientConfig>,
}

impl JwtTokenIssuer {
    pub fn new(config: IdTokenConfig, clients: HashMap<String, OAuthClientConfig>) -> Self {
        Self { config, clients }
    }

    /// Stable opaque subject id that does not reveal the username
    fn anonymous_id(&self, subject: &TokenSubject) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.config.secret_key.as_bytes());
        match subject.user_id {
            Some(id) => hasher.update(id.to_string().as_bytes()),
            None => hasher.update(subject.username.as_bytes()),
        }
        format!("{:x}", hasher.finalize())
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn get_id_token(&self, subject: &TokenSubject, client_name: &str) -> Result<String, TokenError> {
        let client = self
            .clients
            .get(client_name)
            .ok_or_else(|| TokenError::UnknownClient(client_name.to_string()))?;

        let now = Utc::now();
        let claims = IdTokenClaims {
            iss: self.config.issuer.clone(),
            sub: self.anonymous_id(subject),
            aud: client.client_id.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.config.expiration_secs)).timestamp(),
            preferred_username: subject.username.clone(),
            name: subject.full_name.clone(),
            email: subject.email.clone(),
            administrator: subject.administrator,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(client.client_secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    fn issuer() -> JwtTokenIssuer {
        let mut clients = HashMap::new();
        clients.insert(
            "programs".to_string(),
            OAuthClientConfig {
                client_id: "programs-client-id".to_string(),
                client_secret: "programs-secret".to_string(),
            },
        );
        JwtTokenIssuer::new(
            IdTokenConfig {
                issuer: "http://lms.test/oauth2".to_string(),
                expiration_secs: 60,
                secret_key: "s3cret".to_string(),
            },
            clients,
        )
    }

    fn student() -> User {
        User {
            id: 42,
            username: "test-student".to_string(),
            email: "student@example.com".to_string(),
            full_name: "Test Student".to_string(),
            is_active: true,
        }
    }

    #[test]
    fn test_token_verifies_with_client_secret() {
        let token = issuer()
            .get_id_token(&TokenSubject::from(&student()), "programs")
            .unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["programs-client-id"]);
        validation.set_issuer(&["http://lms.test/oauth2"]);
        let data = decode::<IdTokenClaims>(
            &token,
            &DecodingKey::from_secret(b"programs-secret"),
            &validation,
        )
        .unwrap();

        assert_eq!(data.claims.preferred_username, "test-student");
        assert_eq!(data.claims.email, "student@example.com");
        assert!(!data.claims.administrator);
        assert_eq!(data.claims.exp - data.claims.iat, 60);
        assert_ne!(data.claims.sub, "42");
    }

    #[test]
    fn test_unknown_client_rejected() {
        let result = issuer().get_id_token(&TokenSubject::from(&student()), "credentials");
        assert!(matches!(result, Err(TokenError::UnknownClient(name)) if name == "credentials"));
    }

    #[test]
    fn test_anonymous_id_is_stable_per_user() {
        let issuer = issuer();
        let subject = TokenSubject::from(&student());
        assert_eq!(issuer.anonymous_id(&subject), issuer.anonymous_id(&subject));

        let service = TokenSubject::from(&ServiceIdentity::default());
        assert!(service.administrator);
        assert_ne!(issuer.anonymous_id(&subject), issuer.anonymous_id(&service));
    }
}
