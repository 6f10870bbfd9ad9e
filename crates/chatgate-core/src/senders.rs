// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Thin translation from correlation decisions into platform calls:
//! placeholder posting and the prompt await loop.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use chatgate_protocol::message::{OutgoingMessage, PromptOutcome};

use crate::chat::ChatPort;
use crate::correlation::{CorrelationEngine, PromptAnswerOutcome};
use crate::event::InteractionEvent;

/// Interval between prompt countdown ticks.
const PROMPT_TICK: Duration = Duration::from_secs(1);

/// Delay before an answered prompt's message is restored to its base text.
const PROMPT_RESTORE_DELAY: Duration = Duration::from_secs(1);

/// Post a trigger's placeholder message and start its animation.
pub async fn post_placeholder(
    chat: &Arc<dyn ChatPort>,
    engine: &Arc<CorrelationEngine>,
    channel_id: &str,
    correlation_id: &str,
    text: &str,
) {
    if text.is_empty() {
        return;
    }

    match chat
        .send_message(channel_id, &OutgoingMessage::text(text))
        .await
    {
        Ok(message) => {
            engine
                .spawn_placeholder_animation(
                    chat.clone(),
                    message.channel_id,
                    message.message_id,
                    correlation_id.to_string(),
                    text.to_string(),
                )
                .await;
        }
        Err(e) => {
            warn!(%channel_id, error = %e, "failed to post placeholder message");
        }
    }
}

/// Await a non-persistent prompt: tick once a second, surfacing the answer
/// as soon as it lands or the timeout as a terminal result.
///
/// Each tick edits a countdown suffix into the message; on expiry the base
/// content is restored (components stripped) and a timeout notice is posted.
pub async fn run_prompt(
    chat: &Arc<dyn ChatPort>,
    engine: &Arc<CorrelationEngine>,
    channel_id: &str,
    message_id: &str,
    content: &str,
    timeout_seconds: u64,
) -> PromptOutcome {
    let mut remaining = timeout_seconds;

    loop {
        tokio::time::sleep(PROMPT_TICK).await;

        if engine.prompt_answered(message_id).await {
            // Answered → Consumed
            let prompt = engine.take_prompt(message_id).await;
            if let Some(response) = prompt.and_then(|p| p.value) {
                return PromptOutcome::Answered {
                    response,
                    message_id: message_id.to_string(),
                };
            }
            // The prompt vanished between the check and the take; treat as
            // timed out rather than fabricating a response.
            return PromptOutcome::TimedOut {
                message_id: message_id.to_string(),
            };
        }

        if remaining == 0 {
            // Pending → TimedOut
            engine.take_prompt(message_id).await;
            let _ = chat
                .edit_message(channel_id, message_id, &OutgoingMessage::text(content))
                .await;
            let _ = chat
                .send_message(channel_id, &OutgoingMessage::text("Timeout reached"))
                .await;
            return PromptOutcome::TimedOut {
                message_id: message_id.to_string(),
            };
        }

        remaining -= 1;
        let _ = chat
            .edit_message(
                channel_id,
                message_id,
                &OutgoingMessage::text(format!("{} ({}s)", content, remaining)),
            )
            .await;
    }
}

/// Handle a component interaction that no trigger claimed: it may answer a
/// pending prompt.
pub async fn handle_prompt_response(
    chat: &Arc<dyn ChatPort>,
    engine: &Arc<CorrelationEngine>,
    event: &InteractionEvent,
) {
    let Some(prompt) = engine.prompt(&event.message_id).await else {
        return;
    };

    // Role restriction
    if prompt.restrict_to_roles
        && !prompt.mention_roles.is_empty()
        && !prompt
            .mention_roles
            .iter()
            .any(|r| event.actor.roles.contains(r))
    {
        let _ = chat
            .ack_interaction(&event.interaction, "You are not allowed to do this", true)
            .await;
        return;
    }

    // Triggering-user restriction
    if prompt.restrict_to_triggering_user {
        let triggering_user = engine
            .execution(&prompt.execution_id)
            .await
            .and_then(|m| m.user_id);
        if let Some(user_id) = triggering_user
            && user_id != event.actor.id
        {
            let _ = chat
                .ack_interaction(&event.interaction, "You are not allowed to do this", true)
                .await;
            return;
        }
    }

    let Some(value) = event.values.first() else {
        return;
    };

    match engine
        .answer_prompt(&event.message_id, value, &event.actor, &event.channel_id)
        .await
    {
        PromptAnswerOutcome::Recorded { label } => {
            debug!(message_id = %event.message_id, %label, "prompt answered");

            // Strip components and confirm the selection in the channel
            let _ = chat.defer_interaction(&event.interaction).await;
            let _ = chat
                .edit_message(
                    &event.channel_id,
                    &event.message_id,
                    &OutgoingMessage::text(&prompt.content),
                )
                .await;
            let _ = chat
                .send_message(
                    &event.channel_id,
                    &OutgoingMessage::text(format!("<@{}>: {}", event.actor.id, label)),
                )
                .await;

            // Settle the original message back to its base content shortly
            // after the confirmation
            let chat = chat.clone();
            let channel_id = event.channel_id.clone();
            let message_id = event.message_id.clone();
            let content = prompt.content.clone();
            tokio::spawn(async move {
                tokio::time::sleep(PROMPT_RESTORE_DELAY).await;
                let _ = chat
                    .edit_message(&channel_id, &message_id, &OutgoingMessage::text(content))
                    .await;
            });
        }
        // Late, duplicate, or malformed responses are ignored
        PromptAnswerOutcome::AlreadyAnswered
        | PromptAnswerOutcome::UnknownOption
        | PromptAnswerOutcome::NoSuchPrompt => {}
    }
}
