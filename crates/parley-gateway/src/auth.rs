//! Connection authentication: RS256 bearer tokens.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use parley_core::error::DomainError;
use parley_core::ids::UserId;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Why a credential was rejected. Terminal for the connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing credential")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token carries no subject")]
    MissingSubject,

    #[error("token subject {0:?} is not a customer id")]
    InvalidSubject(String),

    #[error("invalid verification key: {0}")]
    InvalidKey(String),
}

impl From<AuthError> for DomainError {
    fn from(err: AuthError) -> Self {
        DomainError::Authentication(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(rename = "customerId")]
    customer_id: Option<Value>,
    sub: Option<String>,
}

impl Claims {
    fn subject(&self) -> Option<String> {
        match &self.customer_id {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => self.sub.clone(),
        }
    }
}

/// Verifies tokens signed with the identity provider's RSA key.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Builds a verifier from a PEM-encoded RSA public key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKey` if the PEM cannot be parsed.
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self, AuthError> {
        let key = DecodingKey::from_rsa_pem(pem).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Ok(Self {
            key,
            validation: Validation::new(Algorithm::RS256),
        })
    }

    /// Validates signature and expiry, then extracts the customer id from
    /// `customerId` (or `sub` when absent).
    ///
    /// # Errors
    ///
    /// Returns `AuthError` when the token is invalid, expired, or carries no
    /// numeric subject.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let subject = data.claims.subject().ok_or(AuthError::MissingSubject)?;
        subject
            .parse::<UserId>()
            .map_err(|_| AuthError::InvalidSubject(subject))
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
