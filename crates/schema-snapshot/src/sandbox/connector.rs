//! TCP connector serving thin-client requests for an embedded instance.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::client::protocol::{read_frame, write_frame, Request, Response};
use crate::error::{Result, SnapshotError};

use super::embedded::Grid;

/// Accept loop bound to a local address. Stops on [`shutdown`](Self::shutdown).
pub(crate) struct Connector {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
}

impl Connector {
    pub(crate) async fn bind(host: &str, port: u16, grid: Arc<Grid>) -> Result<Self> {
        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            SnapshotError::Config(format!("failed to bind {}:{}: {}", host, port, e))
        })?;
        let local_addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();

        info!("Client connector listening on {}", local_addr);

        tokio::spawn(accept_loop(listener, grid, shutdown.clone()));

        Ok(Self {
            local_addr,
            shutdown,
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop(listener: TcpListener, grid: Arc<Grid>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        debug!("Accepted client connection from {}", peer);
                        let grid = grid.clone();
                        let shutdown = shutdown.child_token();
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(stream, grid, shutdown).await {
                                debug!("Client connection {} closed with error: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept client connection: {}", e);
                    }
                }
            }
            _ = shutdown.cancelled() => {
                debug!("Client connector shutting down");
                break;
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    grid: Arc<Grid>,
    shutdown: CancellationToken,
) -> Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let request: Request = tokio::select! {
            frame = read_frame(&mut reader) => match frame? {
                Some(request) => request,
                None => return Ok(()),
            },
            _ = shutdown.cancelled() => return Ok(()),
        };

        let response = respond(&grid, request).await;
        write_frame(&mut writer, &response).await?;
    }
}

async fn respond(grid: &Grid, request: Request) -> Response {
    let result = match request {
        Request::CacheNames => Ok(Response::CacheNames {
            names: grid.cache_names(),
        }),
        Request::CacheConfiguration { name } => grid
            .cache(&name)
            .map(|cache| Response::CacheConfiguration { cache }),
        Request::CreateCache { cache } => grid.create_cache(cache).await.map(|_| Response::Done),
        Request::DestroyCache { name } => grid.destroy_cache(&name).await.map(|_| Response::Done),
    };

    result.unwrap_or_else(|e| Response::from_error(&e))
}
