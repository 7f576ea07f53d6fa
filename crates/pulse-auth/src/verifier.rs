//! Credential verification against the external identity service.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use pulse_core::config::verifier::VerifierConfig;
use pulse_core::error::AppError;

use crate::identity::Identity;

/// Verifies an opaque credential and produces a user identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a credential. Failure means the connection is rejected
    /// before any relay state is created.
    async fn verify(&self, credential: &str) -> Result<Identity, AppError>;
}

/// Identity service response body.
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    id: pulse_core::types::UserId,
    display_name: String,
    #[serde(default)]
    avatar_url: Option<String>,
}

/// HTTP-backed identity verifier.
///
/// POSTs the credential to the configured endpoint with a bounded
/// timeout. A non-success status is an authentication failure; transport
/// errors are surfaced as external-service failures.
#[derive(Clone)]
pub struct HttpVerifier {
    client: reqwest::Client,
    endpoint: String,
}

impl std::fmt::Debug for HttpVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpVerifier")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl HttpVerifier {
    /// Creates a verifier from configuration.
    pub fn new(config: &VerifierConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::configuration(format!("Failed to build verifier client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl IdentityVerifier for HttpVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "credential": credential }))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Identity service unreachable");
                AppError::with_source(
                    pulse_core::error::ErrorKind::ExternalService,
                    "Identity service unreachable",
                    e,
                )
            })?;

        if !response.status().is_success() {
            return Err(AppError::authentication(format!(
                "Credential rejected by identity service (status {})",
                response.status()
            )));
        }

        let verified: VerifyResponse = response.json().await.map_err(|e| {
            AppError::with_source(
                pulse_core::error::ErrorKind::ExternalService,
                "Malformed identity service response",
                e,
            )
        })?;

        Ok(Identity {
            id: verified.id,
            display_name: verified.display_name,
            avatar_url: verified.avatar_url,
        })
    }
}
