//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The gateway's acceptance loop.
//!
//! `GatewayServer` binds the listener, accepts connections, claims a serial
//! line for each, and invokes the configured [`ConnectionHandler`] — on its
//! own task in concurrent mode, inline in iterative mode. Connections that
//! arrive while every line is claimed, or past the connection cap, get a
//! short notice and are closed; the server itself never stops accepting
//! because one session failed.

use crate::config::{ServerConfig, ServiceMode};
use crate::error::{GatewayError, Result};
use crate::handler::ConnectionHandler;
use crate::pool::SerialPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Notice sent when no serial line can be claimed for a connection.
const NO_LINE_NOTICE: &[u8] = b"\r\nserigate: no serial line available\r\n";

/// Notice sent when the connection cap is reached.
const BUSY_NOTICE: &[u8] = b"\r\nserigate: too many connections\r\n";

/// The serial-to-network gateway server.
pub struct GatewayServer {
    config: ServerConfig,
    pool: SerialPool,
    listener: Arc<tokio::sync::Mutex<TcpListener>>,
    bind_address: SocketAddr,
    active: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    accept_handle: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl GatewayServer {
    /// Binds the configured address. Accepting starts with
    /// [`start`](Self::start).
    pub async fn new(config: ServerConfig, pool: SerialPool) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_address).await?;
        let bind_address = listener.local_addr()?;
        tracing::info!(%bind_address, lines = pool.len(), "gateway server bound");
        Ok(GatewayServer {
            config,
            pool,
            listener: Arc::new(tokio::sync::Mutex::new(listener)),
            bind_address,
            active: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            accept_handle: Arc::new(tokio::sync::Mutex::new(None)),
        })
    }

    /// Starts the acceptance loop with the given handler.
    pub async fn start(&self, handler: Arc<dyn ConnectionHandler>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(GatewayError::ServerAlreadyRunning);
        }
        tracing::info!(address = %self.bind_address, service = ?self.config.service, "gateway server starting");
        let handle = self.spawn_accept_loop(handler);
        *self.accept_handle.lock().await = Some(handle);
        Ok(())
    }

    fn spawn_accept_loop(&self, handler: Arc<dyn ConnectionHandler>) -> JoinHandle<()> {
        let listener = Arc::clone(&self.listener);
        let pool = self.pool.clone();
        let config = self.config.clone();
        let active = Arc::clone(&self.active);
        let running = Arc::clone(&self.running);
        let shutdown_notify = Arc::clone(&self.shutdown_notify);

        tokio::spawn(async move {
            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let accepted = tokio::select! {
                    result = async { listener.lock().await.accept().await } => result,
                    () = shutdown_notify.notified() => break,
                };
                match accepted {
                    Ok((socket, peer)) => {
                        tracing::debug!(%peer, "accepted connection");
                        metrics::counter!("serigate_connections_accepted").increment(1);

                        if active.load(Ordering::SeqCst) >= config.max_connections {
                            tracing::warn!(
                                %peer,
                                limit = config.max_connections,
                                "connection limit reached"
                            );
                            metrics::counter!("serigate_connections_rejected").increment(1);
                            reject(socket, BUSY_NOTICE).await;
                            continue;
                        }
                        let Some(line) = pool.claim() else {
                            tracing::warn!(%peer, "no serial line available");
                            metrics::counter!("serigate_connections_rejected").increment(1);
                            reject(socket, NO_LINE_NOTICE).await;
                            continue;
                        };
                        tracing::info!(
                            %peer,
                            device = %line.info.device,
                            "connection established"
                        );

                        match config.service {
                            ServiceMode::Concurrent => {
                                let handler = Arc::clone(&handler);
                                let active = Arc::clone(&active);
                                let settings = config.session.clone();
                                active.fetch_add(1, Ordering::SeqCst);
                                tokio::spawn(async move {
                                    if let Err(error) =
                                        handler.handle(socket, line, settings).await
                                    {
                                        tracing::warn!(%error, "connection handler failed");
                                    }
                                    active.fetch_sub(1, Ordering::SeqCst);
                                });
                            }
                            ServiceMode::Iterative => {
                                active.fetch_add(1, Ordering::SeqCst);
                                if let Err(error) = handler
                                    .handle(socket, line, config.session.clone())
                                    .await
                                {
                                    tracing::warn!(%error, "connection handler failed");
                                }
                                active.fetch_sub(1, Ordering::SeqCst);
                            }
                        }
                    }
                    Err(error) => {
                        tracing::error!(%error, "accept failed");
                        metrics::counter!("serigate_accept_errors").increment(1);
                        // back off rather than spin on a persistent error
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                }
            }
            tracing::info!("accept loop terminated");
        })
    }

    /// Stops accepting connections. Sessions already running complete on
    /// their own terms.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::ServerNotRunning);
        }
        tracing::info!("gateway server shutting down");
        self.shutdown_notify.notify_waiters();
        if let Some(handle) = self.accept_handle.lock().await.take() {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
        }
        Ok(())
    }

    /// Is the acceptance loop running?
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The address the listener actually bound.
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Number of connections currently being served.
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// The serial line pool.
    pub fn pool(&self) -> &SerialPool {
        &self.pool
    }
}

impl std::fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServer")
            .field("bind_address", &self.bind_address)
            .field("running", &self.is_running())
            .field("active", &self.active_connections())
            .finish()
    }
}

impl Drop for GatewayServer {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            tracing::warn!("GatewayServer dropped while still running");
            self.running.store(false, Ordering::SeqCst);
            self.shutdown_notify.notify_waiters();
        }
    }
}

/// Best-effort notice before closing a connection the gateway cannot serve.
async fn reject(mut socket: TcpStream, notice: &[u8]) {
    let _ = socket.write_all(notice).await;
    let _ = socket.shutdown().await;
}
