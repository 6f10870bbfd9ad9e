// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Chatgate Core - the gateway process.
//!
//! Many independent workflow definitions share one persistent connection to a
//! real-time chat platform. This crate is the long-lived side of that
//! arrangement: it owns the platform session, routes platform events to
//! registered workflow triggers, and correlates gateway-side artifacts
//! (placeholder messages, interactive prompts) back to the short-lived
//! execution contexts that asked for them.
//!
//! # Architecture
//!
//! ```text
//!  execution contexts                    gateway process
//! ┌──────────────────┐  link (QUIC)  ┌──────────────────────────────┐
//! │ chatgate-sdk     │◄─────────────►│ link server + handlers       │
//! │ (per execution)  │               │   session manager            │
//! └──────────────────┘               │   trigger registry / index   │
//!                                    │   event router               │
//!  workflow engine                   │   correlation engine         │
//! ┌──────────────────┐   HTTP        │   command debouncer          │
//! │ webhooks/status  │◄─────────────►│                              │
//! └──────────────────┘               └──────────┬───────────────────┘
//!                                               │ ChatPort / ChatEvent
//!                                    ┌──────────▼───────────────────┐
//!                                    │ platform adapter (external)  │
//!                                    └──────────────────────────────┘
//! ```
//!
//! The chat-platform client library and the workflow engine's HTTP API are
//! external collaborators behind [`chat::ChatPort`] and
//! [`workflow::WorkflowPort`]. One gateway process serves exactly one
//! community context.
//!
//! # Quick Start
//!
//! ```ignore
//! use chatgate_core::runtime::GatewayRuntime;
//! use chatgate_core::workflow::HttpWorkflowApi;
//! use std::sync::Arc;
//!
//! let (events_tx, events_rx) = GatewayRuntime::event_channel(256);
//! let runtime = GatewayRuntime::builder()
//!     .chat(my_adapter(events_tx))
//!     .workflow(Arc::new(HttpWorkflowApi::new()))
//!     .events(events_rx)
//!     .build()?
//!     .start()
//!     .await?;
//! ```

pub mod chat;
pub mod commands;
pub mod config;
pub mod correlation;
pub mod error;
pub mod event;
pub mod handlers;
pub mod registry;
pub mod router;
pub mod runtime;
pub mod senders;
pub mod server;
pub mod session;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::{ChatError, ChatPort, InteractionRef, MessageRef};
pub use config::GatewayConfig;
pub use correlation::{CorrelationEngine, ExecutionMatch, PromptState};
pub use error::CoreError;
pub use event::ChatEvent;
pub use registry::TriggerRegistry;
pub use router::EventRouter;
pub use runtime::GatewayRuntime;
pub use session::SessionManager;
pub use workflow::{DispatchPayload, HttpWorkflowApi, WorkflowPort};
