//! Embedded single-node instance.
//!
//! Cache changes are routed through the isolated node's discovery queue: the
//! change is applied when its request is delivered, and the caller is released
//! when the acknowledgement arrives.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::schema::CacheDefinition;
use crate::discovery::{
    ClusterNode, DiscoveryEventKind, DiscoveryListener, DiscoveryMessage, DiscoveryNotification,
    IsolatedClusterNode, IsolatedNodeConfig,
};
use crate::error::{Result, SnapshotError};

use super::connector::Connector;

/// Network settings of an embedded instance.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedConfig {
    /// Bind host (default: 127.0.0.1).
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port; 0 picks a free one (default: 0).
    #[serde(default)]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for EmbeddedConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
        }
    }
}

/// A cache change travelling through discovery.
#[derive(Debug, Clone)]
pub enum CacheChange {
    Create(CacheDefinition),
    Destroy(String),
}

/// Custom discovery message of an embedded instance.
#[derive(Debug, Clone)]
pub enum CacheMessage {
    ChangeRequest { request_id: Uuid, change: CacheChange },
    ChangeAck { request_id: Uuid },
}

impl DiscoveryMessage for CacheMessage {
    fn ack_message(&self) -> Option<Self> {
        match self {
            CacheMessage::ChangeRequest { request_id, .. } => Some(CacheMessage::ChangeAck {
                request_id: *request_id,
            }),
            CacheMessage::ChangeAck { .. } => None,
        }
    }
}

struct PendingChange {
    waiter: oneshot::Sender<Result<()>>,
    outcome: Option<Result<()>>,
}

/// Discovery listener owning the cache registry.
struct CacheProcessor {
    registry: RwLock<BTreeMap<String, CacheDefinition>>,
    pending: Mutex<HashMap<Uuid, PendingChange>>,
    joined: Mutex<Option<oneshot::Sender<ClusterNode>>>,
}

impl CacheProcessor {
    fn apply(&self, change: CacheChange) -> Result<()> {
        let mut registry = self.registry.write();
        match change {
            CacheChange::Create(cache) => {
                if registry.contains_key(&cache.name) {
                    return Err(SnapshotError::CacheExists(cache.name));
                }
                debug!("Cache started [name={}]", cache.name);
                registry.insert(cache.name.clone(), cache);
                Ok(())
            }
            CacheChange::Destroy(name) => match registry.remove(&name) {
                Some(_) => {
                    debug!("Cache stopped [name={}]", name);
                    Ok(())
                }
                None => Err(SnapshotError::CacheNotFound(name)),
            },
        }
    }
}

#[async_trait]
impl DiscoveryListener<CacheMessage> for CacheProcessor {
    async fn on_discovery(&self, notification: DiscoveryNotification<CacheMessage>) {
        match (notification.kind, notification.custom_message) {
            (DiscoveryEventKind::NodeJoined, _) => {
                if let Some(joined) = self.joined.lock().take() {
                    let _ = joined.send(notification.node);
                }
            }
            (_, Some(CacheMessage::ChangeRequest { request_id, change })) => {
                let outcome = self.apply(change);
                match self.pending.lock().get_mut(&request_id) {
                    Some(pending) => pending.outcome = Some(outcome),
                    None => debug!("Change request {} has no waiter", request_id),
                }
            }
            (_, Some(CacheMessage::ChangeAck { request_id })) => {
                if let Some(pending) = self.pending.lock().remove(&request_id) {
                    let outcome = pending.outcome.unwrap_or_else(|| {
                        Err(SnapshotError::ProtocolMisuse(format!(
                            "acknowledgement of {} arrived before its request",
                            request_id
                        )))
                    });
                    let _ = pending.waiter.send(outcome);
                }
            }
            (_, None) => {}
        }
    }
}

/// Node plus cache registry, shared with the client connector.
pub(crate) struct Grid {
    node: IsolatedClusterNode<CacheMessage>,
    processor: Arc<CacheProcessor>,
}

impl Grid {
    pub(crate) fn cache_names(&self) -> Vec<String> {
        self.processor.registry.read().keys().cloned().collect()
    }

    pub(crate) fn cache(&self, name: &str) -> Result<CacheDefinition> {
        self.processor
            .registry
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SnapshotError::CacheNotFound(name.to_string()))
    }

    pub(crate) async fn create_cache(&self, cache: CacheDefinition) -> Result<()> {
        self.submit(CacheChange::Create(cache)).await
    }

    pub(crate) async fn destroy_cache(&self, name: &str) -> Result<()> {
        self.submit(CacheChange::Destroy(name.to_string())).await
    }

    async fn submit(&self, change: CacheChange) -> Result<()> {
        let request_id = Uuid::new_v4();
        let (waiter, outcome) = oneshot::channel();

        self.processor.pending.lock().insert(
            request_id,
            PendingChange {
                waiter,
                outcome: None,
            },
        );

        if let Err(e) = self
            .node
            .send_custom_message(CacheMessage::ChangeRequest { request_id, change })
        {
            self.processor.pending.lock().remove(&request_id);
            return Err(e);
        }

        outcome.await.map_err(|_| {
            SnapshotError::ProtocolMisuse("instance stopped before the change was acknowledged".into())
        })?
    }

    fn stop(&self) {
        self.node.stop();
        self.processor.pending.lock().clear();
    }
}

/// A running single-node cluster reachable by thin clients.
pub struct EmbeddedInstance {
    grid: Arc<Grid>,
    local: ClusterNode,
    connector: Mutex<Option<Connector>>,
    address: SocketAddr,
}

impl EmbeddedInstance {
    /// Start the node, wait for it to join, then open the client connector.
    pub async fn start(config: &EmbeddedConfig) -> Result<Self> {
        let (joined_tx, joined_rx) = oneshot::channel();
        let processor = Arc::new(CacheProcessor {
            registry: RwLock::new(BTreeMap::new()),
            pending: Mutex::new(HashMap::new()),
            joined: Mutex::new(Some(joined_tx)),
        });

        let node = IsolatedClusterNode::new(IsolatedNodeConfig::default());
        node.set_listener(processor.clone());
        node.start()?;

        let grid = Arc::new(Grid { node, processor });

        let local = match joined_rx.await {
            Ok(local) => local,
            Err(_) => {
                grid.stop();
                return Err(SnapshotError::ProtocolMisuse(
                    "node stopped before joining the topology".into(),
                ));
            }
        };

        let connector = match Connector::bind(&config.host, config.port, grid.clone()).await {
            Ok(connector) => connector,
            Err(e) => {
                grid.stop();
                return Err(e);
            }
        };
        let address = connector.local_addr();

        info!(
            "Embedded instance started [node={}, address={}]",
            local.id, address
        );

        Ok(Self {
            grid,
            local,
            connector: Mutex::new(Some(connector)),
            address,
        })
    }

    /// Address thin clients connect to.
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn local_node(&self) -> &ClusterNode {
        &self.local
    }

    pub fn cache_names(&self) -> Vec<String> {
        self.grid.cache_names()
    }

    pub async fn create_cache(&self, cache: CacheDefinition) -> Result<()> {
        self.grid.create_cache(cache).await
    }

    pub async fn destroy_cache(&self, name: &str) -> Result<()> {
        self.grid.destroy_cache(name).await
    }

    pub fn is_closed(&self) -> bool {
        self.connector.lock().is_none()
    }

    /// Close the connector and stop the node. Idempotent.
    pub fn close(&self) {
        if let Some(connector) = self.connector.lock().take() {
            connector.shutdown();
            self.grid.stop();
            info!("Embedded instance stopped [node={}]", self.local.id);
        }
    }
}

impl Drop for EmbeddedInstance {
    fn drop(&mut self) {
        self.close();
    }
}
