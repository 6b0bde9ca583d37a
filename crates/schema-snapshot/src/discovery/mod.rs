//! In-process discovery for a single-node cluster.

mod node;
mod notification;

pub use node::{IsolatedClusterNode, IsolatedNodeConfig, NodeState};
pub use notification::{
    ClusterNode, DiscoveryEventKind, DiscoveryListener, DiscoveryMessage, DiscoveryNotification,
    NodeId,
};
