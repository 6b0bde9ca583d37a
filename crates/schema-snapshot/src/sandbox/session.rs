//! Throwaway session against a private embedded instance.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::{ClientConfig, ThinClient, DEFAULT_USER};
use crate::core::schema::CacheDefinition;
use crate::core::traits::TableCapability;
use crate::error::Result;

use super::embedded::{EmbeddedConfig, EmbeddedInstance};

/// Embedded instance plus a thin client connected to it.
///
/// `open` and `close` take `&mut self`, so they cannot race each other.
pub struct ClusterSession {
    config: EmbeddedConfig,
    user: String,
    instance: Option<EmbeddedInstance>,
    client: Option<Arc<ThinClient>>,
}

impl ClusterSession {
    pub fn new(config: EmbeddedConfig) -> Self {
        Self {
            config,
            user: DEFAULT_USER.to_string(),
            instance: None,
            client: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Start the instance and connect a client to it. Returns the existing
    /// client when already open.
    pub async fn open(&mut self) -> Result<Arc<ThinClient>> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }

        let instance = EmbeddedInstance::start(&self.config).await?;
        let client_config =
            ClientConfig::new(vec![instance.address().to_string()]).with_user(self.user.clone());

        let client = match ThinClient::connect(&client_config).await {
            Ok(client) => Arc::new(client),
            Err(e) => {
                instance.close();
                return Err(e);
            }
        };

        debug!("Cluster session opened on {}", instance.address());

        self.instance = Some(instance);
        self.client = Some(client.clone());
        Ok(client)
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    /// Create caches through the session's client.
    pub async fn seed(&mut self, caches: &[CacheDefinition]) -> Result<()> {
        let client = self.open().await?;
        for cache in caches {
            client.create(cache).await?;
        }
        debug!("Seeded {} caches", caches.len());
        Ok(())
    }

    /// Close the client, then the instance. Idempotent.
    pub async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            client.close().await;
        }
        if let Some(instance) = self.instance.take() {
            instance.close();
        }
    }
}

impl Drop for ClusterSession {
    fn drop(&mut self) {
        if self.client.is_some() {
            warn!("Cluster session dropped without close");
        }
        if let Some(instance) = self.instance.take() {
            instance.close();
        }
    }
}
