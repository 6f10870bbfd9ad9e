// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for the gateway process.
//!
//! This module provides [`GatewayRuntime`] which hosts the link server and
//! the platform-event pump inside an existing tokio application. The platform
//! adapter supplies a [`ChatPort`], a [`WorkflowPort`], and the event channel.
//!
//! One runtime serves exactly one community context; multi-tenant setups run
//! one gateway process per community.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chatgate_core::config::GatewayConfig;
//! use chatgate_core::runtime::GatewayRuntime;
//! use chatgate_core::workflow::HttpWorkflowApi;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = GatewayConfig::from_env()?;
//!     let (events_tx, events_rx) = GatewayRuntime::event_channel(config.event_buffer);
//!     let adapter = my_platform_adapter(events_tx);
//!     let workflow = HttpWorkflowApi::new().with_test_mode(config.test_mode);
//!
//!     let runtime = GatewayRuntime::builder()
//!         .from_config(&config)
//!         .chat(adapter)
//!         .workflow(Arc::new(workflow))
//!         .events(events_rx)
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     // ... run your application ...
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use chatgate_protocol::server::LinkServer;

use crate::chat::ChatPort;
use crate::commands::CommandDebouncer;
use crate::correlation::CorrelationEngine;
use crate::event::ChatEvent;
use crate::handlers::HandlerState;
use crate::registry::TriggerRegistry;
use crate::router::EventRouter;
use crate::session::SessionManager;
use crate::workflow::WorkflowPort;

/// Builder for creating a [`GatewayRuntime`].
pub struct GatewayRuntimeBuilder {
    chat: Option<Arc<dyn ChatPort>>,
    workflow: Option<Arc<dyn WorkflowPort>>,
    events: Option<mpsc::Receiver<ChatEvent>>,
    bind_addr: SocketAddr,
}

impl std::fmt::Debug for GatewayRuntimeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRuntimeBuilder")
            .field("chat", &self.chat.as_ref().map(|_| "..."))
            .field("workflow", &self.workflow.as_ref().map(|_| "..."))
            .field("events", &self.events.as_ref().map(|_| "..."))
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl Default for GatewayRuntimeBuilder {
    fn default() -> Self {
        Self {
            chat: None,
            workflow: None,
            events: None,
            bind_addr: "127.0.0.1:7201".parse().unwrap(),
        }
    }
}

impl GatewayRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the platform adapter (required).
    pub fn chat(mut self, chat: Arc<dyn ChatPort>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Set the workflow-engine port (required).
    pub fn workflow(mut self, workflow: Arc<dyn WorkflowPort>) -> Self {
        self.workflow = Some(workflow);
        self
    }

    /// Set the platform-event receiver (required).
    pub fn events(mut self, events: mpsc::Receiver<ChatEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Set the bind address for the link server.
    ///
    /// Default: `127.0.0.1:7201`
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Apply the address from a loaded [`GatewayConfig`].
    pub fn from_config(self, config: &crate::config::GatewayConfig) -> Self {
        self.bind_addr(config.quic_addr)
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<GatewayRuntimeConfig> {
        let chat = self.chat.ok_or_else(|| anyhow::anyhow!("chat is required"))?;
        let workflow = self
            .workflow
            .ok_or_else(|| anyhow::anyhow!("workflow is required"))?;
        let events = self
            .events
            .ok_or_else(|| anyhow::anyhow!("events is required"))?;

        Ok(GatewayRuntimeConfig {
            chat,
            workflow,
            events,
            bind_addr: self.bind_addr,
        })
    }
}

/// Configuration for a [`GatewayRuntime`].
pub struct GatewayRuntimeConfig {
    chat: Arc<dyn ChatPort>,
    workflow: Arc<dyn WorkflowPort>,
    events: mpsc::Receiver<ChatEvent>,
    bind_addr: SocketAddr,
}

impl std::fmt::Debug for GatewayRuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRuntimeConfig")
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl GatewayRuntimeConfig {
    /// Start the runtime, spawning the link server and the event pump.
    pub async fn start(self) -> Result<GatewayRuntime> {
        let registry = TriggerRegistry::new();
        let engine = CorrelationEngine::new(self.workflow.clone());
        let session = SessionManager::new(self.chat.clone());
        let debouncer = CommandDebouncer::new(registry.clone(), self.chat.clone());
        let router = EventRouter::new(
            registry.clone(),
            engine.clone(),
            self.chat.clone(),
            debouncer.clone(),
        );

        let state = Arc::new(HandlerState {
            session,
            registry,
            engine,
            debouncer,
            chat: self.chat,
            workflow: self.workflow,
        });

        // Bind before spawning so the caller can learn the real port
        let server = LinkServer::localhost(self.bind_addr)?;
        let local_addr = server.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let server_handle = tokio::spawn(run_link_server_with_shutdown(
            server,
            state.clone(),
            shutdown_rx.clone(),
        ));
        let pump_handle = tokio::spawn(run_event_pump(router, self.events, shutdown_rx));

        info!(addr = %local_addr, "GatewayRuntime started");

        Ok(GatewayRuntime {
            server_handle,
            pump_handle,
            shutdown_tx,
            state,
            local_addr,
        })
    }
}

/// A running gateway that can be embedded in an application.
///
/// The runtime manages:
/// - the link QUIC server for execution-context connections
/// - the platform-event pump feeding the router
///
/// Call [`shutdown`](Self::shutdown) for graceful termination.
pub struct GatewayRuntime {
    server_handle: JoinHandle<Result<()>>,
    pump_handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
    state: Arc<HandlerState>,
    local_addr: SocketAddr,
}

impl GatewayRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> GatewayRuntimeBuilder {
        GatewayRuntimeBuilder::new()
    }

    /// Create the platform-event channel the adapter feeds.
    pub fn event_channel(buffer: usize) -> (mpsc::Sender<ChatEvent>, mpsc::Receiver<ChatEvent>) {
        mpsc::channel(buffer)
    }

    /// The address the link server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared handler state (registry, correlation engine, session).
    pub fn state(&self) -> &Arc<HandlerState> {
        &self.state
    }

    /// Check if the runtime is still running.
    pub fn is_running(&self) -> bool {
        !self.server_handle.is_finished()
    }

    /// Gracefully shut down the runtime.
    pub async fn shutdown(self) -> Result<()> {
        info!("GatewayRuntime shutting down...");

        let _ = self.shutdown_tx.send(true);

        if let Err(e) = self.pump_handle.await {
            error!("event pump task panicked: {}", e);
        }

        match self.server_handle.await {
            Ok(Ok(())) => {
                info!("GatewayRuntime shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("link server error during shutdown: {}", e);
                Err(e)
            }
            Err(e) => {
                error!("link server task panicked: {}", e);
                Err(anyhow::anyhow!("link server task panicked: {}", e))
            }
        }
    }
}

/// Run the link QUIC server with shutdown support.
async fn run_link_server_with_shutdown(
    server: LinkServer,
    state: Arc<HandlerState>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    use tracing::debug;

    info!("link server accepting connections");

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("link server received shutdown signal");
                    server.close();
                    break;
                }
            }

            incoming = server.accept() => {
                match incoming {
                    Some(incoming) => {
                        let state = state.clone();
                        tokio::spawn(async move {
                            match incoming.await {
                                Ok(connection) => {
                                    let remote_addr = connection.remote_address();
                                    debug!(%remote_addr, "accepted connection");

                                    let conn_handler =
                                        chatgate_protocol::server::ConnectionHandler::new(connection);
                                    crate::server::handle_connection(conn_handler, state).await;
                                }
                                Err(e) => {
                                    debug!("failed to accept connection: {}", e);
                                }
                            }
                        });
                    }
                    None => {
                        // Endpoint closed
                        break;
                    }
                }
            }
        }
    }

    info!("link server stopped");
    Ok(())
}

/// Drain platform events into the router.
///
/// Each event is routed inside its own task so one slow dispatch never
/// blocks the pump.
async fn run_event_pump(
    router: Arc<EventRouter>,
    mut events: mpsc::Receiver<ChatEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("event pump received shutdown signal");
                    break;
                }
            }

            event = events.recv() => {
                match event {
                    Some(event) => {
                        let router = router.clone();
                        tokio::spawn(async move {
                            router.handle_event(event).await;
                        });
                    }
                    None => {
                        // Adapter dropped its sender
                        info!("platform event channel closed");
                        break;
                    }
                }
            }
        }
    }
}
