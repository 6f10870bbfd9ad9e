// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Chatgate SDK - link client for execution contexts.
//!
//! An execution context is a short-lived process or task representing one
//! workflow-trigger firing or one node execution. This crate gives it an
//! ergonomic, timeout-bounded view of the gateway link:
//!
//! - **Credentials**: ask the gateway to log in (deduplicated gateway-side)
//! - **Listings**: channels and roles for parameter forms
//! - **Sends**: messages, interactive prompts, platform actions
//! - **Registration**: execution matches and trigger upserts
//!
//! The gateway process may not exist yet when a context starts; every call
//! retry-connects until its budget expires, and a timeout is "no answer",
//! never a panic or crash.
//!
//! # Quick Start
//!
//! ```ignore
//! use chatgate_sdk::{GatewaySdk, LoginAck};
//! use chatgate_protocol::message::{MessageParams, OutgoingMessage};
//!
//! let sdk = GatewaySdk::localhost()?;
//!
//! match sdk.credentials(&token, &client_id).await? {
//!     LoginAck::Ready | LoginAck::Already => {}
//!     other => anyhow::bail!("gateway not ready: {:?}", other),
//! }
//!
//! sdk.send_message(MessageParams {
//!     channel_id: Some("C1".into()),
//!     message: OutgoingMessage::text("workflow finished"),
//!     ..Default::default()
//! })
//! .await?;
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{GatewaySdk, SentMessage};
pub use config::SdkConfig;
pub use error::{Result, SdkError};

// Re-export the wire types callers build requests from
pub use chatgate_protocol::message::{
    ActionKind, ActionParams, BotStatusParams, ButtonSpec, CommandField, CommandFieldKind,
    ExecutionParams, LoginAck, MessageParams, NamedRef, OutgoingMessage, PromptAnswer,
    PromptOutcome, PromptParams, SelectOptionSpec, SelectSpec, Trigger, TriggerKind, TriggerUpsert,
};
