// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event router: matches inbound platform events against the trigger
//! registry and hands matches to the correlation engine.
//!
//! For every candidate trigger the checks run in a fixed order, short-
//! circuiting on failure: role allow-list first, then the kind-specific
//! predicate. A failing dispatch deactivates the offending trigger but never
//! escapes the router loop; the remaining candidates still get evaluated.

use std::sync::Arc;

use regex::RegexBuilder;
use tracing::{debug, instrument, warn};

use chatgate_protocol::message::{Trigger, TriggerKind};

use crate::chat::ChatPort;
use crate::commands::CommandDebouncer;
use crate::correlation::CorrelationEngine;
use crate::event::{
    Actor, ChatEvent, CommandEvent, InteractionEvent, MessageEvent, PresenceEvent, ThreadEvent,
};
use crate::registry::TriggerRegistry;
use crate::senders;
use crate::workflow::DispatchPayload;

/// Routes platform events to matching triggers.
pub struct EventRouter {
    registry: Arc<TriggerRegistry>,
    engine: Arc<CorrelationEngine>,
    chat: Arc<dyn ChatPort>,
    debouncer: Arc<CommandDebouncer>,
}

impl EventRouter {
    pub fn new(
        registry: Arc<TriggerRegistry>,
        engine: Arc<CorrelationEngine>,
        chat: Arc<dyn ChatPort>,
        debouncer: Arc<CommandDebouncer>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            engine,
            chat,
            debouncer,
        })
    }

    /// Route one platform event. Infallible by contract: all failures are
    /// logged and contained.
    #[instrument(skip(self, event), fields(kind = event.kind_name()))]
    pub async fn handle_event(&self, event: ChatEvent) {
        match event {
            ChatEvent::Message(e) => self.on_message(e).await,
            ChatEvent::MessageUpdate(e) => self.on_channel_scoped_update(e).await,
            ChatEvent::ThreadCreate(e) => self.on_thread_create(e).await,
            ChatEvent::ThreadUpdate(e) => self.on_thread_update(e).await,
            ChatEvent::MemberJoined(e) => self.on_member_joined(e.member).await,
            ChatEvent::RolesUpdated(e) => self.on_roles_updated(e).await,
            ChatEvent::NickUpdated(e) => self.on_nick_updated(e).await,
            ChatEvent::Presence(e) => self.on_presence(e).await,
            ChatEvent::Command(e) => self.on_command(e).await,
            ChatEvent::Interaction(e) => self.on_interaction(e).await,
        }
    }

    // ========================================================================
    // Predicates
    // ========================================================================

    /// Role allow-list check. An empty allow-list means no restriction.
    fn role_gate(trigger: &Trigger, actor_roles: &[String]) -> bool {
        trigger.role_ids.is_empty()
            || trigger.role_ids.iter().any(|r| actor_roles.contains(r))
    }

    /// Message/thread-create predicate: bot mention, regex pattern, or
    /// anchored literal value.
    fn content_predicate(trigger: &Trigger, content: &str, mentions_bot: bool) -> bool {
        if trigger.bot_mention && mentions_bot {
            return true;
        }

        if let Some(pattern) = &trigger.pattern
            && !pattern.is_empty()
        {
            match RegexBuilder::new(pattern)
                .case_insensitive(!trigger.case_sensitive)
                .build()
            {
                Ok(re) => {
                    if re.is_match(content) {
                        return true;
                    }
                }
                Err(e) => {
                    warn!(trigger_id = %trigger.id, error = %e, "invalid trigger pattern");
                }
            }
        }

        if let Some(value) = &trigger.literal_value
            && !value.is_empty()
        {
            // Literal values are anchored: the whole content must equal them
            return if trigger.case_sensitive {
                content == value
            } else {
                content.eq_ignore_ascii_case(value)
            };
        }

        false
    }

    // ========================================================================
    // Event handlers
    // ========================================================================

    async fn on_message(&self, event: MessageEvent) {
        if event.content.is_empty() || event.author.is_bot {
            return;
        }

        let index = self.registry.index().await;
        for trigger in index.candidates(&event.channel_id) {
            if trigger.kind != TriggerKind::Message {
                continue;
            }
            if !Self::role_gate(trigger, &event.author.roles) {
                continue;
            }
            if !Self::content_predicate(trigger, &event.content, event.mentions_bot) {
                continue;
            }

            let payload = DispatchPayload {
                content: Some(event.content.clone()),
                channel_id: Some(event.channel_id.clone()),
                message_id: Some(event.message_id.clone()),
                attachment_urls: event.attachment_urls.clone(),
                user_roles: event.author.roles.clone(),
                ..actor_payload(&event.author)
            };
            self.dispatch_matched(trigger, payload, &event.channel_id)
                .await;
        }
    }

    /// message_update events match on channel membership alone; the regex
    /// family stays exclusive to message/thread_create.
    async fn on_channel_scoped_update(&self, event: MessageEvent) {
        if event.author.is_bot {
            return;
        }

        let index = self.registry.index().await;
        for trigger in index.candidates(&event.channel_id) {
            if trigger.kind != TriggerKind::MessageUpdate {
                continue;
            }
            if !Self::role_gate(trigger, &event.author.roles) {
                continue;
            }

            let payload = DispatchPayload {
                content: Some(event.content.clone()),
                channel_id: Some(event.channel_id.clone()),
                message_id: Some(event.message_id.clone()),
                user_roles: event.author.roles.clone(),
                ..actor_payload(&event.author)
            };
            self.dispatch_matched(trigger, payload, &event.channel_id)
                .await;
        }
    }

    async fn on_thread_create(&self, event: ThreadEvent) {
        if event.name.is_empty() {
            return;
        }

        let parent = event
            .parent_channel_id
            .as_deref()
            .unwrap_or(&event.thread_id);

        let index = self.registry.index().await;
        for trigger in index.candidates(parent) {
            if trigger.kind != TriggerKind::ThreadCreate {
                continue;
            }
            // No member context on thread creation: a role-restricted
            // trigger cannot be verified, so it does not fire.
            if !trigger.role_ids.is_empty() {
                continue;
            }
            if !Self::content_predicate(trigger, &event.name, false) {
                continue;
            }

            let payload = DispatchPayload {
                content: Some(event.name.clone()),
                channel_id: Some(event.thread_id.clone()),
                ..Default::default()
            };
            self.dispatch_matched(trigger, payload, &event.thread_id)
                .await;
        }
    }

    async fn on_thread_update(&self, event: ThreadEvent) {
        let index = self.registry.index().await;
        for trigger in index.candidates(&event.thread_id) {
            if trigger.kind != TriggerKind::ThreadUpdate {
                continue;
            }

            let payload = DispatchPayload {
                content: Some(event.name.clone()),
                channel_id: Some(event.thread_id.clone()),
                ..Default::default()
            };
            self.dispatch_matched(trigger, payload, &event.thread_id)
                .await;
        }
    }

    async fn on_member_joined(&self, member: Actor) {
        if member.is_bot {
            return;
        }

        let index = self.registry.index().await;
        for (channel_key, trigger) in index.all_entries() {
            if trigger.kind != TriggerKind::UserJoins {
                continue;
            }
            if !Self::role_gate(trigger, &member.roles) {
                continue;
            }

            let payload = DispatchPayload {
                channel_id: Some(channel_key.to_string()),
                ..actor_payload(&member)
            };
            self.dispatch_matched(trigger, payload, channel_key).await;
        }
    }

    async fn on_roles_updated(&self, event: crate::event::RolesUpdatedEvent) {
        if event.member.is_bot || (event.added.is_empty() && event.removed.is_empty()) {
            return;
        }

        let index = self.registry.index().await;
        for (channel_key, trigger) in index.all_entries() {
            let changed = match trigger.kind {
                TriggerKind::UserRoleAdded => &event.added,
                TriggerKind::UserRoleRemoved => &event.removed,
                _ => continue,
            };
            if changed.is_empty() {
                continue;
            }
            // The allow-list gate runs against the roles held before the
            // change, matching the platform's ordering of the update.
            if !Self::role_gate(trigger, &event.previous_roles) {
                continue;
            }
            if !trigger.role_update_ids.is_empty()
                && !trigger.role_update_ids.iter().any(|r| changed.contains(r))
            {
                continue;
            }

            let payload = DispatchPayload {
                channel_id: Some(channel_key.to_string()),
                added_roles: event.added.clone(),
                removed_roles: event.removed.clone(),
                ..actor_payload(&event.member)
            };
            self.dispatch_matched(trigger, payload, channel_key).await;
        }
    }

    async fn on_nick_updated(&self, event: crate::event::NickUpdatedEvent) {
        if event.member.is_bot {
            return;
        }

        let index = self.registry.index().await;
        for (channel_key, trigger) in index.all_entries() {
            if trigger.kind != TriggerKind::UserNickUpdated {
                continue;
            }
            if !Self::role_gate(trigger, &event.member.roles) {
                continue;
            }

            let payload = DispatchPayload {
                channel_id: Some(channel_key.to_string()),
                nick: Some(event.nick.clone()),
                ..actor_payload(&event.member)
            };
            self.dispatch_matched(trigger, payload, channel_key).await;
        }
    }

    async fn on_presence(&self, event: PresenceEvent) {
        let index = self.registry.index().await;
        for trigger in index.candidates(&event.guild_id) {
            if trigger.kind != TriggerKind::Presence {
                continue;
            }
            if !Self::role_gate(trigger, &event.member.roles) {
                continue;
            }
            let wanted = trigger.presence.as_deref().unwrap_or("any");
            if wanted != "any" && wanted != event.status {
                continue;
            }

            let payload = DispatchPayload {
                channel_id: Some(event.guild_id.clone()),
                presence: Some(event.status.clone()),
                ..actor_payload(&event.member)
            };
            self.dispatch_matched(trigger, payload, &event.guild_id)
                .await;
        }
    }

    async fn on_command(&self, event: CommandEvent) {
        if event.guild_id.is_none() {
            let _ = self
                .chat
                .ack_interaction(
                    &event.interaction,
                    "Commands work only inside channels",
                    false,
                )
                .await;
            return;
        }

        let index = self.registry.index().await;
        let mut rejected = false;
        let mut acknowledged = false;
        for trigger in index.candidates(&event.channel_id) {
            if trigger.kind != TriggerKind::Command {
                continue;
            }
            if trigger.command_name.as_deref() != Some(event.command_name.as_str()) {
                continue;
            }
            if !Self::role_gate(trigger, &event.actor.roles) {
                if !rejected {
                    rejected = true;
                    let _ = self
                        .chat
                        .ack_interaction(&event.interaction, "You do not have permission", true)
                        .await;
                }
                continue;
            }

            if !acknowledged {
                acknowledged = true;
                let _ = self
                    .chat
                    .ack_interaction(
                        &event.interaction,
                        &format!("/{} sent", event.command_name),
                        true,
                    )
                    .await;
            }

            let payload = DispatchPayload {
                channel_id: Some(event.channel_id.clone()),
                interaction_values: event.input.clone().into_iter().collect(),
                user_roles: event.actor.roles.clone(),
                ..actor_payload(&event.actor)
            };
            self.dispatch_matched(trigger, payload, &event.channel_id)
                .await;
        }
    }

    async fn on_interaction(&self, event: InteractionEvent) {
        let index = self.registry.index().await;
        let mut matched_trigger = false;

        for (channel_key, trigger) in index.all_entries() {
            if trigger.kind != TriggerKind::Interaction {
                continue;
            }
            if trigger.interaction_message_id.as_deref() != Some(event.message_id.as_str()) {
                continue;
            }
            matched_trigger = true;

            if !Self::role_gate(trigger, &event.actor.roles) {
                let _ = self
                    .chat
                    .ack_interaction(&event.interaction, "You are not allowed to do this", true)
                    .await;
                break;
            }

            let _ = self.chat.defer_interaction(&event.interaction).await;

            let payload = DispatchPayload {
                channel_id: Some(event.channel_id.clone()),
                interaction_message_id: Some(event.message_id.clone()),
                interaction_values: event.values.clone(),
                user_roles: event.actor.roles.clone(),
                ..actor_payload(&event.actor)
            };
            self.dispatch_matched(trigger, payload, channel_key).await;
            break;
        }

        if !matched_trigger {
            // No trigger claimed the component; it may be a pending prompt
            senders::handle_prompt_response(&self.chat, &self.engine, &event).await;
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Deliver a match and run the failure policy: a broken webhook
    /// deactivates its trigger so it stops being invoked repeatedly.
    async fn dispatch_matched(
        &self,
        trigger: &Trigger,
        payload: DispatchPayload,
        placeholder_channel: &str,
    ) {
        debug!(trigger_id = %trigger.id, "trigger matched");

        match self.engine.dispatch(trigger, payload).await {
            Ok(Some(correlation_id)) => {
                let text = trigger
                    .placeholder_text
                    .clone()
                    .unwrap_or_default();
                senders::post_placeholder(
                    &self.chat,
                    &self.engine,
                    placeholder_channel,
                    &correlation_id,
                    &text,
                )
                .await;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    trigger_id = %trigger.id,
                    error = %e,
                    "delivery failed, deactivating trigger"
                );
                if self.registry.deactivate(&trigger.id).await {
                    self.debouncer.schedule().await;
                }
            }
        }
    }
}

fn actor_payload(actor: &Actor) -> DispatchPayload {
    DispatchPayload {
        user_id: Some(actor.id.clone()),
        user_name: Some(actor.username.clone()),
        user_tag: Some(actor.tag.clone()),
        ..Default::default()
    }
}
