// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The chat-platform client seam.
//!
//! The gateway never talks to the platform library directly; everything goes
//! through [`ChatPort`], implemented by a platform adapter outside this crate.
//! Only identities and selection values cross this boundary; rendering of
//! embeds and interactive components is the adapter's concern.

use async_trait::async_trait;

use chatgate_protocol::message::{CommandSpec, NamedRef, OutgoingMessage};

/// A failed platform call.
#[derive(Debug, Clone, thiserror::Error)]
#[error("platform call '{operation}' failed: {reason}")]
pub struct ChatError {
    /// The operation that failed (e.g. "send_message").
    pub operation: String,
    /// The reason reported by the platform client.
    pub reason: String,
}

impl ChatError {
    pub fn new(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for platform calls.
pub type ChatResult<T> = std::result::Result<T, ChatError>;

/// Identity of a message on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: String,
    pub message_id: String,
}

/// Identity of an in-flight interaction, used to acknowledge or defer it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionRef {
    pub id: String,
    pub token: String,
}

/// Outbound operations on the chat platform.
///
/// One gateway process serves exactly one community context; all channel and
/// role lookups are scoped to it.
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Log in to the platform gateway. Resolves once the connection is ready.
    async fn login(&self, token: &str, client_id: &str) -> ChatResult<()>;

    /// Ordered list of text channels in the served community.
    async fn channels(&self) -> ChatResult<Vec<NamedRef>>;

    /// Ordered list of roles in the served community.
    async fn roles(&self) -> ChatResult<Vec<NamedRef>>;

    /// Role ids currently held by a member.
    async fn member_roles(&self, user_id: &str) -> ChatResult<Vec<String>>;

    /// Send a message to a channel.
    async fn send_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
    ) -> ChatResult<MessageRef>;

    /// Replace the content (and components) of an existing message.
    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        message: &OutgoingMessage,
    ) -> ChatResult<()>;

    /// Delete a single message.
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> ChatResult<()>;

    /// Delete the most recent `count` messages in a channel.
    async fn bulk_delete(&self, channel_id: &str, count: u8) -> ChatResult<()>;

    /// Grant a role to a member.
    async fn add_role(
        &self,
        user_id: &str,
        role_id: &str,
        audit_reason: Option<&str>,
    ) -> ChatResult<()>;

    /// Revoke a role from a member.
    async fn remove_role(
        &self,
        user_id: &str,
        role_id: &str,
        audit_reason: Option<&str>,
    ) -> ChatResult<()>;

    /// Update the bot's presence.
    async fn set_presence(&self, activity: &str, activity_type: u8, status: &str)
    -> ChatResult<()>;

    /// Replace the full set of registered slash commands.
    async fn register_commands(&self, commands: &[CommandSpec]) -> ChatResult<()>;

    /// Reply to an interaction (ephemeral replies are only visible to the
    /// interacting user).
    async fn ack_interaction(
        &self,
        interaction: &InteractionRef,
        content: &str,
        ephemeral: bool,
    ) -> ChatResult<()>;

    /// Acknowledge an interaction without sending visible content.
    async fn defer_interaction(&self, interaction: &InteractionRef) -> ChatResult<()>;
}
