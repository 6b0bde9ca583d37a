//! Single-node cluster with in-process discovery.
//!
//! The node never looks for peers and never touches the network. Joining and
//! custom messages are synthesized locally and handed to the listener through
//! one FIFO queue drained by one consumer task per node.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, SnapshotError};

use super::notification::{
    ClusterNode, DiscoveryEventKind, DiscoveryListener, DiscoveryMessage, DiscoveryNotification,
    NodeId,
};

/// Topology version of a one-node cluster.
const TOPOLOGY_VERSION: u64 = 1;

/// Identity settings for an isolated node.
#[derive(Debug, Clone, Default)]
pub struct IsolatedNodeConfig {
    /// Node id. Generated on start when absent.
    pub node_id: Option<NodeId>,

    /// Consistent id. A random UUID string is used when absent.
    pub consistent_id: Option<String>,

    /// Node attributes.
    pub attributes: BTreeMap<String, String>,
}

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    NotStarted,
    Started,
    Stopped,
}

enum Delivery<M> {
    Join,
    Custom(M),
}

enum Lifecycle<M> {
    NotStarted,
    Started {
        local: ClusterNode,
        tx: mpsc::UnboundedSender<Delivery<M>>,
        worker: JoinHandle<()>,
    },
    Stopped {
        local: Option<ClusterNode>,
    },
}

type SharedListener<M> = Arc<RwLock<Option<Arc<dyn DiscoveryListener<M>>>>>;

/// A cluster member that participates in no network protocol.
pub struct IsolatedClusterNode<M: DiscoveryMessage> {
    config: IsolatedNodeConfig,
    lifecycle: Mutex<Lifecycle<M>>,
    listener: SharedListener<M>,
    start_time: DateTime<Utc>,
}

impl<M: DiscoveryMessage> IsolatedClusterNode<M> {
    pub fn new(config: IsolatedNodeConfig) -> Self {
        Self {
            config,
            lifecycle: Mutex::new(Lifecycle::NotStarted),
            listener: Arc::new(RwLock::new(None)),
            start_time: Utc::now(),
        }
    }

    /// Register the listener. Replaces any previous one for later deliveries.
    pub fn set_listener(&self, listener: Arc<dyn DiscoveryListener<M>>) {
        *self.listener.write() = Some(listener);
    }

    /// Start the node and schedule its join notification.
    ///
    /// Must be called from within a Tokio runtime. Starting twice, or after
    /// [`stop`](Self::stop), is a [`SnapshotError::ProtocolMisuse`].
    pub fn start(&self) -> Result<ClusterNode> {
        let handle = Handle::try_current().map_err(|_| {
            SnapshotError::ProtocolMisuse("isolated node must be started inside a Tokio runtime".into())
        })?;

        let mut lifecycle = self.lifecycle.lock();
        match &*lifecycle {
            Lifecycle::NotStarted => {}
            Lifecycle::Started { .. } => {
                return Err(SnapshotError::ProtocolMisuse(
                    "isolated node is already started".into(),
                ))
            }
            Lifecycle::Stopped { .. } => {
                return Err(SnapshotError::ProtocolMisuse(
                    "isolated node was stopped and cannot be restarted".into(),
                ))
            }
        }

        let local = ClusterNode {
            id: self.config.node_id.unwrap_or_else(Uuid::new_v4),
            consistent_id: self
                .config
                .consistent_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            order: 1,
            attributes: self.config.attributes.clone(),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Delivery::Join)
            .map_err(|_| SnapshotError::ProtocolMisuse("delivery queue is closed".into()))?;

        let worker = handle.spawn(dispatch(
            local.clone(),
            rx,
            tx.downgrade(),
            self.listener.clone(),
        ));

        debug!(
            "Isolated node started [id={}, consistentId={}]",
            local.id, local.consistent_id
        );

        *lifecycle = Lifecycle::Started {
            local: local.clone(),
            tx,
            worker,
        };

        Ok(local)
    }

    /// Stop the node. Undelivered notifications are discarded. Idempotent.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let previous = std::mem::replace(&mut *lifecycle, Lifecycle::Stopped { local: None });

        *lifecycle = match previous {
            Lifecycle::Started { local, tx, worker } => {
                drop(tx);
                worker.abort();
                debug!("Isolated node stopped [id={}]", local.id);
                Lifecycle::Stopped { local: Some(local) }
            }
            Lifecycle::NotStarted => Lifecycle::Stopped { local: None },
            stopped @ Lifecycle::Stopped { .. } => stopped,
        };
    }

    /// Deliver a custom message to the listener, followed by its
    /// acknowledgement if it has one.
    pub fn send_custom_message(&self, msg: M) -> Result<()> {
        match &*self.lifecycle.lock() {
            Lifecycle::Started { tx, .. } => tx
                .send(Delivery::Custom(msg))
                .map_err(|_| SnapshotError::ProtocolMisuse("delivery queue is closed".into())),
            Lifecycle::NotStarted => Err(SnapshotError::ProtocolMisuse(
                "cannot send a custom message before the node is started".into(),
            )),
            Lifecycle::Stopped { .. } => Err(SnapshotError::ProtocolMisuse(
                "cannot send a custom message after the node is stopped".into(),
            )),
        }
    }

    pub fn state(&self) -> NodeState {
        match &*self.lifecycle.lock() {
            Lifecycle::NotStarted => NodeState::NotStarted,
            Lifecycle::Started { .. } => NodeState::Started,
            Lifecycle::Stopped { .. } => NodeState::Stopped,
        }
    }

    /// The local node, once started.
    pub fn local_node(&self) -> Option<ClusterNode> {
        match &*self.lifecycle.lock() {
            Lifecycle::Started { local, .. } => Some(local.clone()),
            Lifecycle::Stopped { local } => local.clone(),
            Lifecycle::NotStarted => None,
        }
    }

    /// Look up a node. Only the local node can ever be found.
    pub fn get_node(&self, id: NodeId) -> Option<ClusterNode> {
        self.local_node().filter(|n| n.id == id)
    }

    /// Whether a node answers. Only a started local node does.
    pub fn ping_node(&self, id: NodeId) -> bool {
        match &*self.lifecycle.lock() {
            Lifecycle::Started { local, .. } => local.id == id,
            _ => false,
        }
    }

    pub fn known_node(&self, id: NodeId) -> bool {
        self.get_node(id).is_some()
    }

    /// Remote nodes. Always empty.
    pub fn remote_nodes(&self) -> Vec<ClusterNode> {
        Vec::new()
    }

    pub fn topology_version(&self) -> u64 {
        match self.state() {
            NodeState::NotStarted => 0,
            _ => TOPOLOGY_VERSION,
        }
    }

    pub fn grid_start_time(&self) -> DateTime<Utc> {
        self.start_time
    }
}

impl<M: DiscoveryMessage> Drop for IsolatedClusterNode<M> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn notification<M>(
    kind: DiscoveryEventKind,
    local: &ClusterNode,
    custom_message: Option<M>,
) -> DiscoveryNotification<M> {
    DiscoveryNotification {
        kind,
        topology_version: TOPOLOGY_VERSION,
        node: local.clone(),
        topology: vec![local.clone()],
        custom_message,
    }
}

/// Single consumer of a node's delivery queue.
async fn dispatch<M: DiscoveryMessage>(
    local: ClusterNode,
    mut rx: mpsc::UnboundedReceiver<Delivery<M>>,
    tx: mpsc::WeakUnboundedSender<Delivery<M>>,
    listener: SharedListener<M>,
) {
    while let Some(delivery) = rx.recv().await {
        let current = listener.read().clone();
        let Some(lsnr) = current else {
            debug!("No discovery listener registered, notification dropped");
            continue;
        };

        match delivery {
            Delivery::Join => {
                lsnr.on_local_node_initialized(&local);
                lsnr.on_discovery(notification(DiscoveryEventKind::NodeJoined, &local, None))
                    .await;
            }
            Delivery::Custom(msg) => {
                let ack = msg.ack_message();

                lsnr.on_discovery(notification(
                    DiscoveryEventKind::CustomEvent,
                    &local,
                    Some(msg),
                ))
                .await;

                // Ack goes to the tail of the queue once the message is processed.
                if let Some(ack) = ack {
                    match tx.upgrade() {
                        Some(tx) => {
                            let _ = tx.send(Delivery::Custom(ack));
                        }
                        None => debug!("Node stopped before an acknowledgement was scheduled"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct TestMessage {
        id: u32,
        with_ack: bool,
        is_ack: bool,
    }

    impl TestMessage {
        fn plain(id: u32) -> Self {
            Self {
                id,
                with_ack: false,
                is_ack: false,
            }
        }

        fn acked(id: u32) -> Self {
            Self {
                id,
                with_ack: true,
                is_ack: false,
            }
        }
    }

    impl DiscoveryMessage for TestMessage {
        fn ack_message(&self) -> Option<Self> {
            self.with_ack.then(|| Self {
                id: self.id,
                with_ack: false,
                is_ack: true,
            })
        }
    }

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<String>>,
        delay: Option<Duration>,
    }

    impl RecordingListener {
        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }
    }

    #[async_trait]
    impl DiscoveryListener<TestMessage> for RecordingListener {
        fn on_local_node_initialized(&self, _node: &ClusterNode) {
            self.events.lock().push("init".into());
        }

        async fn on_discovery(&self, n: DiscoveryNotification<TestMessage>) {
            assert_eq!(n.topology.len(), 1);
            assert_eq!(n.topology[0], n.node);

            match (n.kind, n.custom_message) {
                (DiscoveryEventKind::NodeJoined, _) => self.events.lock().push("join".into()),
                (DiscoveryEventKind::CustomEvent, Some(msg)) if msg.is_ack => {
                    self.events.lock().push(format!("ack:{}", msg.id))
                }
                (DiscoveryEventKind::CustomEvent, Some(msg)) => {
                    self.events.lock().push(format!("begin:{}", msg.id));
                    if let Some(delay) = self.delay {
                        tokio::time::sleep(delay).await;
                    }
                    self.events.lock().push(format!("end:{}", msg.id));
                }
                (DiscoveryEventKind::CustomEvent, None) => panic!("custom event without payload"),
            }
        }
    }

    async fn wait_for(listener: &RecordingListener, count: usize) -> Vec<String> {
        for _ in 0..200 {
            let events = listener.events();
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {} events: {:?}", count, listener.events());
    }

    fn started_node(listener: Arc<RecordingListener>) -> IsolatedClusterNode<TestMessage> {
        let node = IsolatedClusterNode::new(IsolatedNodeConfig::default());
        node.set_listener(listener);
        node.start().unwrap();
        node
    }

    #[tokio::test]
    async fn test_join_is_delivered_once_before_anything_else() {
        let listener = Arc::new(RecordingListener::default());
        let node = started_node(listener.clone());

        node.send_custom_message(TestMessage::plain(1)).unwrap();

        let events = wait_for(&listener, 4).await;
        assert_eq!(events, ["init", "join", "begin:1", "end:1"]);
        assert_eq!(events.iter().filter(|e| *e == "join").count(), 1);
    }

    #[tokio::test]
    async fn test_ack_is_delivered_after_message_completes() {
        let listener = Arc::new(RecordingListener {
            delay: Some(Duration::from_millis(30)),
            ..Default::default()
        });
        let node = started_node(listener.clone());

        node.send_custom_message(TestMessage::acked(7)).unwrap();

        let events = wait_for(&listener, 5).await;
        assert_eq!(events[2..], ["begin:7", "end:7", "ack:7"]);
    }

    #[tokio::test]
    async fn test_messages_are_delivered_in_submission_order() {
        let listener = Arc::new(RecordingListener::default());
        let node = started_node(listener.clone());

        for id in 1..=5 {
            node.send_custom_message(TestMessage::plain(id)).unwrap();
        }

        let events = wait_for(&listener, 12).await;
        let begins: Vec<_> = events.iter().filter(|e| e.starts_with("begin:")).cloned().collect();
        assert_eq!(begins, ["begin:1", "begin:2", "begin:3", "begin:4", "begin:5"]);
    }

    #[tokio::test]
    async fn test_ack_follows_messages_already_queued() {
        let listener = Arc::new(RecordingListener::default());
        let node = started_node(listener.clone());

        node.send_custom_message(TestMessage::acked(1)).unwrap();
        node.send_custom_message(TestMessage::plain(2)).unwrap();

        let events = wait_for(&listener, 7).await;
        assert_eq!(events[2..], ["begin:1", "end:1", "begin:2", "end:2", "ack:1"]);
    }

    #[tokio::test]
    async fn test_double_start_is_misuse() {
        let node = started_node(Arc::new(RecordingListener::default()));
        assert!(matches!(node.start(), Err(SnapshotError::ProtocolMisuse(_))));
        assert_eq!(node.state(), NodeState::Started);
    }

    #[tokio::test]
    async fn test_send_outside_started_state_is_misuse() {
        let node: IsolatedClusterNode<TestMessage> =
            IsolatedClusterNode::new(IsolatedNodeConfig::default());
        assert!(matches!(
            node.send_custom_message(TestMessage::plain(1)),
            Err(SnapshotError::ProtocolMisuse(_))
        ));

        node.start().unwrap();
        node.stop();
        assert!(matches!(
            node.send_custom_message(TestMessage::plain(1)),
            Err(SnapshotError::ProtocolMisuse(_))
        ));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_terminal() {
        let node = started_node(Arc::new(RecordingListener::default()));
        node.stop();
        node.stop();
        assert_eq!(node.state(), NodeState::Stopped);
        assert!(matches!(node.start(), Err(SnapshotError::ProtocolMisuse(_))));
    }

    #[tokio::test]
    async fn test_only_local_node_is_reachable() {
        let node = started_node(Arc::new(RecordingListener::default()));
        let local = node.local_node().unwrap();
        let stranger = Uuid::new_v4();

        assert_eq!(node.get_node(local.id), Some(local.clone()));
        assert!(node.ping_node(local.id));
        assert!(node.get_node(stranger).is_none());
        assert!(!node.ping_node(stranger));
        assert!(!node.known_node(stranger));
        assert!(node.remote_nodes().is_empty());
        assert_eq!(node.topology_version(), 1);

        node.stop();
        assert!(!node.ping_node(local.id));
    }

    #[tokio::test]
    async fn test_configured_identity_is_reused() {
        let id = Uuid::new_v4();
        let node: IsolatedClusterNode<TestMessage> = IsolatedClusterNode::new(IsolatedNodeConfig {
            node_id: Some(id),
            consistent_id: Some("node-a".into()),
            attributes: BTreeMap::new(),
        });

        let local = node.start().unwrap();
        assert_eq!(local.id, id);
        assert_eq!(local.consistent_id, "node-a");
    }

    #[tokio::test]
    async fn test_replaced_listener_receives_later_deliveries() {
        let first = Arc::new(RecordingListener::default());
        let node = started_node(first.clone());
        wait_for(&first, 2).await;

        let second = Arc::new(RecordingListener::default());
        node.set_listener(second.clone());
        node.send_custom_message(TestMessage::plain(3)).unwrap();

        assert_eq!(wait_for(&second, 2).await, ["begin:3", "end:3"]);
        assert_eq!(first.events(), ["init", "join"]);
    }

    #[test]
    fn test_start_outside_runtime_is_misuse() {
        let node: IsolatedClusterNode<TestMessage> =
            IsolatedClusterNode::new(IsolatedNodeConfig::default());
        assert!(matches!(node.start(), Err(SnapshotError::ProtocolMisuse(_))));
        assert_eq!(node.state(), NodeState::NotStarted);
    }
}
