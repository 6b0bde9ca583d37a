//! Discovery notifications, messages and listeners.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Node identifier.
pub type NodeId = Uuid;

/// A cluster member as seen by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterNode {
    /// Per-start node id.
    pub id: NodeId,

    /// Identity stable across restarts.
    pub consistent_id: String,

    /// Join order within the topology.
    pub order: u64,

    /// User attributes.
    pub attributes: BTreeMap<String, String>,
}

/// Kind of a discovery event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryEventKind {
    /// A node joined the topology.
    NodeJoined,
    /// A custom message was delivered.
    CustomEvent,
}

/// Event delivered to a [`DiscoveryListener`].
#[derive(Debug, Clone)]
pub struct DiscoveryNotification<M> {
    pub kind: DiscoveryEventKind,

    pub topology_version: u64,

    /// Node the event originates from.
    pub node: ClusterNode,

    /// Nodes the event applies to.
    pub topology: Vec<ClusterNode>,

    /// Payload of a custom event.
    pub custom_message: Option<M>,
}

/// Payload carried by custom discovery events.
pub trait DiscoveryMessage: Clone + fmt::Debug + Send + Sync + 'static {
    /// Companion acknowledgement, delivered after this message has been
    /// fully processed by the listener.
    fn ack_message(&self) -> Option<Self> {
        None
    }
}

/// Receives discovery events.
///
/// The future returned by [`on_discovery`](DiscoveryListener::on_discovery)
/// is the delivery's completion signal: acknowledgements are scheduled only
/// after it resolves.
#[async_trait]
pub trait DiscoveryListener<M: DiscoveryMessage>: Send + Sync + 'static {
    /// Called once, right before the join notification.
    fn on_local_node_initialized(&self, _node: &ClusterNode) {}

    /// Handle one discovery event.
    async fn on_discovery(&self, notification: DiscoveryNotification<M>);
}
