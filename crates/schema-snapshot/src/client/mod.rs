//! Thin client for a cluster reachable over TCP.

pub mod protocol;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::net::SocketAddr;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::schema::CacheDefinition;
use crate::core::traits::{
    ClusterClient, SchemaCapability, SchemaInfo, TableCapability, DEFAULT_SCHEMA,
};
use crate::error::{Result, SnapshotError};

use protocol::{read_frame, write_frame, Request, Response};

/// User reported when none is configured.
pub const DEFAULT_USER: &str = "ignite";

/// Thin client connection settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Addresses tried in order until one accepts.
    pub addresses: Vec<String>,

    /// Authenticated user name.
    pub user: String,
}

impl ClientConfig {
    pub fn new(addresses: Vec<String>) -> Self {
        Self {
            addresses,
            user: DEFAULT_USER.to_string(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// Thin client. One request in flight at a time.
pub struct ThinClient {
    conn: Mutex<Option<Connection>>,
    peer: SocketAddr,
    user: String,
    schema: RwLock<String>,
}

impl ThinClient {
    /// Connect to the first reachable address.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        if config.addresses.is_empty() {
            return Err(SnapshotError::Config(
                "at least one cluster address is required".into(),
            ));
        }

        let mut failures = Vec::new();
        for addr in &config.addresses {
            match TcpStream::connect(addr.as_str()).await {
                Ok(stream) => {
                    let peer = stream
                        .peer_addr()
                        .map_err(|e| SnapshotError::Client(format!("{}: {}", addr, e)))?;
                    let (read_half, write_half) = stream.into_split();

                    info!("Connected to cluster at {} as {}", peer, config.user);

                    return Ok(Self {
                        conn: Mutex::new(Some(Connection {
                            reader: BufReader::new(read_half),
                            writer: write_half,
                        })),
                        peer,
                        user: config.user.clone(),
                        schema: RwLock::new(DEFAULT_SCHEMA.to_string()),
                    });
                }
                Err(e) => {
                    debug!("Connection to {} failed: {}", addr, e);
                    failures.push(format!("{}: {}", addr, e));
                }
            }
        }

        Err(SnapshotError::Client(format!(
            "unable to connect to any cluster address ({})",
            failures.join("; ")
        )))
    }

    /// Address of the connected server.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// User this client is authenticated as.
    pub fn current_user(&self) -> &str {
        &self.user
    }

    pub async fn is_closed(&self) -> bool {
        self.conn.lock().await.is_none()
    }

    /// Close the connection. Idempotent.
    pub async fn close(&self) {
        if let Some(mut conn) = self.conn.lock().await.take() {
            let _ = conn.writer.shutdown().await;
            debug!("Disconnected from {}", self.peer);
        }
    }

    async fn request(&self, request: Request) -> Result<Response> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(SnapshotError::ClientClosed)?;

        write_frame(&mut conn.writer, &request).await?;

        match read_frame(&mut conn.reader).await? {
            Some(Response::Error { kind, message }) => Err(kind.into_error(message)),
            Some(response) => Ok(response),
            None => {
                *guard = None;
                Err(SnapshotError::Client(format!(
                    "connection closed by {}",
                    self.peer
                )))
            }
        }
    }

    async fn all_caches(&self) -> Result<Vec<CacheDefinition>> {
        let mut caches = Vec::new();
        for name in self.cache_names().await? {
            caches.push(self.cache_configuration(&name).await?);
        }
        Ok(caches)
    }
}

fn unexpected(response: Response) -> SnapshotError {
    SnapshotError::Client(format!("unexpected response: {:?}", response))
}

#[async_trait]
impl ClusterClient for ThinClient {
    async fn cache_names(&self) -> Result<Vec<String>> {
        match self.request(Request::CacheNames).await? {
            Response::CacheNames { names } => Ok(names),
            other => Err(unexpected(other)),
        }
    }

    async fn cache_configuration(&self, name: &str) -> Result<CacheDefinition> {
        let request = Request::CacheConfiguration {
            name: name.to_string(),
        };
        match self.request(request).await? {
            Response::CacheConfiguration { cache } => Ok(cache),
            other => Err(unexpected(other)),
        }
    }
}

#[async_trait]
impl SchemaCapability for ThinClient {
    async fn get_schema(&self, name: &str) -> Result<SchemaInfo> {
        let mut tables: Vec<String> = self
            .all_caches()
            .await?
            .iter()
            .flat_map(|cache| cache.query_entities.iter())
            .filter(|entity| {
                entity
                    .schema
                    .as_deref()
                    .unwrap_or(DEFAULT_SCHEMA)
                    .eq_ignore_ascii_case(name)
            })
            .map(|entity| entity.table_name())
            .collect();
        tables.sort();
        tables.dedup();

        Ok(SchemaInfo {
            name: name.to_string(),
            tables,
        })
    }

    fn current_schema(&self) -> String {
        self.schema.read().clone()
    }

    fn change_schema(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SnapshotError::Config("schema name must not be empty".into()));
        }
        *self.schema.write() = name.to_string();
        Ok(())
    }
}

#[async_trait]
impl TableCapability for ThinClient {
    async fn create(&self, cache: &CacheDefinition) -> Result<()> {
        match self
            .request(Request::CreateCache {
                cache: cache.clone(),
            })
            .await?
        {
            Response::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn drop(&self, cache_name: &str) -> Result<()> {
        let request = Request::DestroyCache {
            name: cache_name.to_string(),
        };
        match self.request(request).await? {
            Response::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn exists(&self, table: &str) -> Result<bool> {
        let schema = self.get_schema(&self.current_schema()).await?;
        Ok(schema.tables.iter().any(|t| t.eq_ignore_ascii_case(table)))
    }
}
