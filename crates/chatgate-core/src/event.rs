// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Inbound platform events.
//!
//! The platform adapter translates its client library's event types into this
//! closed union at the boundary; the router only ever sees these shapes.

use crate::chat::InteractionRef;

/// The user who caused an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub username: String,
    pub tag: String,
    /// Role ids the actor holds at event time.
    pub roles: Vec<String>,
    /// Bot and system accounts never fire triggers.
    pub is_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub message_id: String,
    pub content: String,
    pub author: Actor,
    /// True when the message mentions the logged-in bot user.
    pub mentions_bot: bool,
    pub attachment_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadEvent {
    /// The thread's own channel id.
    pub thread_id: String,
    /// The channel the thread was created under, if known.
    pub parent_channel_id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEvent {
    pub member: Actor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolesUpdatedEvent {
    pub member: Actor,
    /// Role ids the member held before the change; the allow-list gate runs
    /// against these, matching the platform's ordering of the update.
    pub previous_roles: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NickUpdatedEvent {
    pub member: Actor,
    pub nick: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEvent {
    pub guild_id: String,
    pub member: Actor,
    /// The new presence status ("online", "idle", ...).
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEvent {
    pub channel_id: String,
    /// Commands fired outside a community are rejected.
    pub guild_id: Option<String>,
    pub actor: Actor,
    pub command_name: String,
    /// Value of the command's input field, if the command defines one.
    pub input: Option<String>,
    pub interaction: InteractionRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionEvent {
    pub channel_id: String,
    /// The message the pressed component is attached to.
    pub message_id: String,
    pub actor: Actor,
    /// Selected values: the button's custom id, or the select menu choices.
    pub values: Vec<String>,
    pub interaction: InteractionRef,
}

/// Closed union of platform events the router subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Message(MessageEvent),
    MessageUpdate(MessageEvent),
    ThreadCreate(ThreadEvent),
    ThreadUpdate(ThreadEvent),
    MemberJoined(MemberEvent),
    RolesUpdated(RolesUpdatedEvent),
    NickUpdated(NickUpdatedEvent),
    Presence(PresenceEvent),
    Command(CommandEvent),
    Interaction(InteractionEvent),
}

impl ChatEvent {
    /// Event family name used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ChatEvent::Message(_) => "message",
            ChatEvent::MessageUpdate(_) => "message_update",
            ChatEvent::ThreadCreate(_) => "thread_create",
            ChatEvent::ThreadUpdate(_) => "thread_update",
            ChatEvent::MemberJoined(_) => "user_joins",
            ChatEvent::RolesUpdated(_) => "roles_updated",
            ChatEvent::NickUpdated(_) => "user_nick_updated",
            ChatEvent::Presence(_) => "presence",
            ChatEvent::Command(_) => "command",
            ChatEvent::Interaction(_) => "interaction",
        }
    }
}
