// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Chatgate Protocol - QUIC + JSON link layer
//!
//! This crate provides the wire protocol for the link between execution
//! contexts and the gateway process:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    chatgate-protocol                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Link Layer: Request/Response + fire-and-forget             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Serialization: JSON (serde)                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Transport: QUIC (quinn)                                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Execution contexts are short-lived; the gateway process may not exist
//! when one starts, so [`LinkClient`] supports retry-connect. Each link call
//! opens one bidirectional stream carrying a [`message::LinkRequest`] frame
//! and receives a terminal [`message::LinkResponse`] frame. The
//! `credentials` call additionally emits a non-terminal `login` progress
//! frame while the platform login runs asynchronously.
//!
//! # Usage
//!
//! ```ignore
//! use chatgate_protocol::{LinkClient, message::{LinkRequest, LinkResponse}};
//!
//! let client = LinkClient::localhost()?;
//! client.connect_with_retry().await?;
//!
//! let response: LinkResponse = client.request(&LinkRequest::ListChannels).await?;
//! ```

pub mod client;
pub mod frame;
pub mod message;
pub mod server;

// Re-export main types
pub use client::{ClientError, LinkClient, LinkClientConfig};
pub use frame::{Frame, FrameError, FramedStream, MessageType};
pub use server::{ConnectionHandler, LinkServer, LinkServerConfig, ServerError, StreamHandler};
