//! Remote transport: the wire types and the HTTP client behind them.
//!
//! The engine talks to the server through [`RemoteTransport`] so tests can
//! substitute an in-memory transport. [`HttpTransport`] is the production
//! implementation: JSON over HTTPS with bearer-token auth.

use async_trait::async_trait;
use caresync_types::{ChangeOperation, EntityKind, QueueEntry, Timestamp};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

/// One queued change in wire form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushRequest {
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub operation: ChangeOperation,
    /// The payload exactly as persisted locally: an envelope for sealed
    /// kinds, plain JSON otherwise, `null` for deletes.
    pub data: Value,
    pub timestamp: Timestamp,
    pub device_id: String,
}

impl PushRequest {
    pub fn from_entry(entry: &QueueEntry) -> Self {
        Self {
            entity_type: entry.entity_type,
            entity_id: entry.entity_id.clone(),
            operation: entry.operation,
            data: entry.payload.clone(),
            timestamp: entry.created_at,
            device_id: entry.device_id.clone(),
        }
    }
}

/// One change from another device, as returned by the pull endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteChange {
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub operation: ChangeOperation,
    pub data: Value,
    pub timestamp: Timestamp,
    pub device_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PullResponse {
    changes: Vec<RemoteChange>,
}

/// Transport seam between the engine and the server.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Uploads one change. An `Ok` return is the server's acknowledgment;
    /// only then may the caller retire the queue entry.
    async fn push(&self, change: &PushRequest) -> SyncResult<()>;

    /// Fetches changes from other devices since the given checkpoint, or
    /// the full history when no checkpoint exists yet.
    async fn pull(&self, since: Option<Timestamp>) -> SyncResult<Vec<RemoteChange>>;
}

/// JSON-over-HTTPS transport.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpTransport {
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(SyncError::Http)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    /// Installs the bearer token for subsequent requests.
    pub async fn set_token(&self, token: String) {
        *self.token.write().await = Some(token);
    }

    pub async fn clear_token(&self) {
        *self.token.write().await = None;
    }

    async fn bearer(&self) -> SyncResult<String> {
        self.token
            .read()
            .await
            .clone()
            .ok_or(SyncError::Unauthorized)
    }

    /// Maps a response status to the engine's error vocabulary. A 401 drops
    /// the cached token so the next cycle fails fast until re-auth.
    async fn check_status(&self, status: StatusCode) -> SyncResult<()> {
        if status == StatusCode::UNAUTHORIZED {
            self.clear_token().await;
            return Err(SyncError::Unauthorized);
        }
        if status.is_client_error() {
            return Err(SyncError::Rejected(status.to_string()));
        }
        if status.is_server_error() {
            return Err(SyncError::Transport(status.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn push(&self, change: &PushRequest) -> SyncResult<()> {
        let token = self.bearer().await?;
        let url = format!("{}/api/sync/push", self.base_url);
        debug!(entity_type = %change.entity_type, entity_id = %change.entity_id, "pushing change");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(change)
            .send()
            .await?;
        self.check_status(resp.status()).await
    }

    async fn pull(&self, since: Option<Timestamp>) -> SyncResult<Vec<RemoteChange>> {
        let token = self.bearer().await?;
        let url = format!("{}/api/sync/pull", self.base_url);

        let mut req = self.client.get(&url).bearer_auth(token);
        if let Some(since) = since {
            req = req.query(&[("since", since.to_rfc3339())]);
        }

        let resp = req.send().await?;
        self.check_status(resp.status()).await?;

        let body: PullResponse = resp.json().await?;
        debug!(count = body.changes.len(), "pulled remote changes");
        Ok(body.changes)
    }
}
