//! Persistence API client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use pulse_core::config::persistence::PersistenceConfig;
use pulse_core::error::AppError;

use crate::types::{AuthContext, OutgoingMessage, StoredMessage, StoredPost};

/// Write-side interface to the durable store.
///
/// Both calls carry the client's bounded timeout so a stalled downstream
/// API cannot pin an event handler indefinitely.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Persist a broadcast post, returning its canonical stored form.
    async fn create_post(
        &self,
        payload: &serde_json::Value,
        ctx: &AuthContext,
    ) -> Result<StoredPost, AppError>;

    /// Persist a direct message, returning its canonical stored form.
    async fn create_message(
        &self,
        message: &OutgoingMessage,
        ctx: &AuthContext,
    ) -> Result<StoredMessage, AppError>;
}

/// HTTP implementation of [`PersistenceGateway`].
#[derive(Clone)]
pub struct HttpPersistenceClient {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for HttpPersistenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPersistenceClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpPersistenceClient {
    /// Creates a client from configuration.
    pub fn new(config: &PersistenceConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::configuration(format!("Failed to build persistence client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_json<B: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, AppError> {
        let url = format!("{}{path}", self.base_url);

        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Persistence API request failed");
            AppError::with_source(
                pulse_core::error::ErrorKind::Persistence,
                "Persistence API unreachable or timed out",
                e,
            )
        })?;

        if !response.status().is_success() {
            return Err(AppError::persistence(format!(
                "Persistence API returned status {}",
                response.status()
            )));
        }

        response.json().await.map_err(|e| {
            AppError::with_source(
                pulse_core::error::ErrorKind::Persistence,
                "Malformed persistence API response",
                e,
            )
        })
    }
}

#[async_trait]
impl PersistenceGateway for HttpPersistenceClient {
    async fn create_post(
        &self,
        payload: &serde_json::Value,
        ctx: &AuthContext,
    ) -> Result<StoredPost, AppError> {
        self.post_json(
            "/posts",
            &serde_json::json!({ "payload": payload, "auth": ctx }),
        )
        .await
    }

    async fn create_message(
        &self,
        message: &OutgoingMessage,
        ctx: &AuthContext,
    ) -> Result<StoredMessage, AppError> {
        self.post_json(
            "/messages",
            &serde_json::json!({ "message": message, "auth": ctx }),
        )
        .await
    }
}
