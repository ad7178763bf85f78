//! Display-name lookups against the customer service.

use std::time::Duration;

use async_trait::async_trait;
use parley_core::directory::IdentityDirectory;
use parley_core::error::DomainError;
use parley_core::ids::UserId;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

/// Envelope every customer-service endpoint responds with.
#[derive(Debug, Deserialize)]
struct GenericResponse<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

/// `IdentityDirectory` backed by `GET {base}/fullName/customerId/{id}`.
///
/// Transport failures and server errors surface as `Dependency`, so the
/// caller's `CallPolicy` retries them. An unknown customer is `NotFound`.
#[derive(Debug, Clone)]
pub struct HttpIdentityDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityDirectory {
    /// Creates a directory for the service at `base_url`. `timeout` bounds
    /// each request on the client side as well.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl IdentityDirectory for HttpIdentityDirectory {
    async fn display_name(&self, user_id: UserId) -> Result<String, DomainError> {
        let url = format!("{}/fullName/customerId/{user_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("X-Customer-Id", user_id.to_string())
            .send()
            .await
            .map_err(|e| DomainError::Dependency(format!("identity lookup failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DomainError::NotFound(format!("customer {user_id}")));
        }
        if !status.is_success() {
            return Err(DomainError::Dependency(format!(
                "identity lookup returned {status}"
            )));
        }

        let body: GenericResponse<String> = response
            .json()
            .await
            .map_err(|e| DomainError::Dependency(format!("identity response unreadable: {e}")))?;
        match body.data {
            Some(name) if body.success => Ok(name),
            _ => {
                debug!(user_id = %user_id, message = ?body.message, "customer has no display name");
                Err(DomainError::NotFound(format!("customer {user_id}")))
            }
        }
    }
}
