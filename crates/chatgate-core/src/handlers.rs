// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Link protocol handlers for the gateway process.
//!
//! These handlers process requests from execution contexts (credentials,
//! trigger upserts, execution registration, sends, lists). Each one returns
//! the terminal [`LinkResponse`]; failures surface as typed errors that the
//! stream loop converts into link error responses.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use chatgate_protocol::message::{
    ActionKind, ActionParams, BotStatusParams, CredentialsParams, ExecutionParams, LinkResponse,
    LoginAck, MessageParams, NamedRef, OutgoingMessage, PromptOutcome, PromptParams, TriggerKind,
    TriggerUpsert,
};

use crate::chat::ChatPort;
use crate::commands::CommandDebouncer;
use crate::correlation::{CorrelationEngine, PromptState};
use crate::error::CoreError;
use crate::registry::TriggerRegistry;
use crate::senders;
use crate::session::{LoginResult, LoginTicket, SessionManager};
use crate::workflow::{WorkflowContext, WorkflowPort};

/// Default prompt timeout when the caller does not set one.
const DEFAULT_PROMPT_TIMEOUT_SECS: u64 = 60;

/// The implicit role every member holds; excluded from role listings.
const EVERYONE_ROLE: &str = "@everyone";

/// Shared state for link handlers.
pub struct HandlerState {
    pub session: Arc<SessionManager>,
    pub registry: Arc<TriggerRegistry>,
    pub engine: Arc<CorrelationEngine>,
    pub debouncer: Arc<CommandDebouncer>,
    pub chat: Arc<dyn ChatPort>,
    pub workflow: Arc<dyn WorkflowPort>,
}

// ============================================================================
// Credentials
// ============================================================================

/// How a `credentials` request proceeds on the wire.
pub enum CredentialsFlow {
    /// The terminal ack is known immediately.
    Immediate(LoginAck),
    /// A login was started: reply `login` now, then await the receiver for
    /// the terminal ack.
    Started(tokio::sync::oneshot::Receiver<LoginResult>),
}

/// Handle a `credentials` request.
#[instrument(skip(state, params), fields(client_id = %params.client_id))]
pub async fn handle_credentials(state: &HandlerState, params: CredentialsParams) -> CredentialsFlow {
    match state
        .session
        .request_login(&params.token, &params.client_id)
        .await
    {
        LoginTicket::Missing => CredentialsFlow::Immediate(LoginAck::Missing),
        LoginTicket::Already => CredentialsFlow::Immediate(LoginAck::Already),
        LoginTicket::Different => CredentialsFlow::Immediate(LoginAck::Different),
        LoginTicket::Started(rx) => CredentialsFlow::Started(rx),
    }
}

/// Await the outcome of a started login and map it to the terminal ack.
///
/// A successful login re-batches command registration so already-registered
/// command triggers reach the platform after a credential rotation.
pub async fn await_login(
    state: &HandlerState,
    rx: tokio::sync::oneshot::Receiver<LoginResult>,
) -> LoginAck {
    match rx.await {
        Ok(Ok(())) => {
            info!("login settled ready");
            state.debouncer.schedule().await;
            LoginAck::Ready
        }
        Ok(Err(e)) => {
            warn!(error = %e, "login settled with error");
            LoginAck::Error
        }
        Err(_) => {
            warn!("login task dropped without reporting");
            LoginAck::Error
        }
    }
}

// ============================================================================
// Listings
// ============================================================================

/// Handle `list:channels`.
#[instrument(skip(state))]
pub async fn handle_list_channels(state: &HandlerState) -> Result<LinkResponse> {
    if !state.session.is_ready().await {
        return Err(CoreError::NotReady.into());
    }

    let channels = state.chat.channels().await.map_err(CoreError::from)?;
    debug!(count = channels.len(), "listed channels");
    Ok(LinkResponse::Channels(channels))
}

/// Handle `list:roles`. The implicit everyone role is excluded.
#[instrument(skip(state))]
pub async fn handle_list_roles(state: &HandlerState) -> Result<LinkResponse> {
    if !state.session.is_ready().await {
        return Err(CoreError::NotReady.into());
    }

    let roles: Vec<NamedRef> = state
        .chat
        .roles()
        .await
        .map_err(CoreError::from)?
        .into_iter()
        .filter(|r| r.name != EVERYONE_ROLE)
        .collect();
    debug!(count = roles.len(), "listed roles");
    Ok(LinkResponse::Roles(roles))
}

// ============================================================================
// Channel resolution
// ============================================================================

/// Resolve the target channel for a send: either explicit, or inherited from
/// the triggering execution when the caller asked for it.
async fn resolve_channel(
    state: &HandlerState,
    execution_id: Option<&str>,
    explicit_channel: Option<&str>,
    use_execution_channel: bool,
) -> Result<String, CoreError> {
    if use_execution_channel {
        let execution_id = execution_id.ok_or_else(|| CoreError::ValidationError {
            field: "execution_id".to_string(),
            message: "required when targeting the trigger channel".to_string(),
        })?;
        let matching = state.engine.execution(execution_id).await.ok_or_else(|| {
            CoreError::ExecutionNotFound {
                execution_id: execution_id.to_string(),
            }
        })?;
        return Ok(matching.channel_id);
    }

    explicit_channel
        .map(str::to_string)
        .ok_or_else(|| CoreError::ValidationError {
            field: "channel_id".to_string(),
            message: "required".to_string(),
        })
}

// ============================================================================
// send:message
// ============================================================================

/// Handle `send:message`.
///
/// With `use_placeholder`, the execution's placeholder message is finalized
/// and edited in place instead of posting a new message, so the "working..."
/// message becomes the result message.
#[instrument(skip(state, params), fields(execution_id = ?params.execution_id))]
pub async fn handle_send_message(
    state: &HandlerState,
    params: MessageParams,
) -> Result<LinkResponse> {
    if !state.session.is_ready().await {
        return Err(CoreError::NotReady.into());
    }

    let channel_id = resolve_channel(
        state,
        params.execution_id.as_deref(),
        params.channel_id.as_deref(),
        params.use_placeholder || params.use_trigger_channel,
    )
    .await?;

    if params.use_placeholder
        && let Some(execution_id) = params.execution_id.as_deref()
        && let Some(matching) = state.engine.execution(execution_id).await
        && let Some(placeholder_id) = matching.placeholder_id.as_deref()
        && let Some(real_message_id) = state.engine.finalize_placeholder(placeholder_id).await
    {
        state
            .chat
            .edit_message(&channel_id, &real_message_id, &params.message)
            .await
            .map_err(CoreError::from)?;
        debug!(%channel_id, %real_message_id, "placeholder finalized into result message");
        return Ok(LinkResponse::MessageSent {
            channel_id,
            message_id: real_message_id,
        });
    }

    let sent = state
        .chat
        .send_message(&channel_id, &params.message)
        .await
        .map_err(CoreError::from)?;
    Ok(LinkResponse::MessageSent {
        channel_id: sent.channel_id,
        message_id: sent.message_id,
    })
}

// ============================================================================
// send:prompt
// ============================================================================

/// Handle `send:prompt`.
///
/// Non-persistent prompts are awaited here: the terminal response is written
/// only once a human answers, the timeout elapses, or the caller's link
/// timeout gives up on us. Persistent prompts return immediately and are
/// read by a later pull.
#[instrument(skip(state, params), fields(execution_id = %params.execution_id, channel_id = %params.channel_id))]
pub async fn handle_send_prompt(
    state: &HandlerState,
    params: PromptParams,
) -> Result<LinkResponse> {
    if !state.session.is_ready().await {
        return Err(CoreError::NotReady.into());
    }

    let restrict_to_roles = params.restrict_to_roles && !params.mention_roles.is_empty();
    let restrict_to_triggering_user =
        params.restrict_to_triggering_user && !params.execution_id.is_empty();

    // Mention the triggering user so they know the prompt is theirs
    let mut content = params.content.clone();
    if restrict_to_triggering_user
        && let Some(matching) = state.engine.execution(&params.execution_id).await
        && let Some(user_id) = matching.user_id
    {
        content = format!("<@{}> {}", user_id, content);
    }

    let outgoing = OutgoingMessage {
        content: content.clone(),
        embed: params.embed_color.as_ref().map(|color| {
            serde_json::json!({ "description": content, "color": color })
        }),
        buttons: params.buttons.clone(),
        select: params.select.clone(),
        ..Default::default()
    };

    let sent = state
        .chat
        .send_message(&params.channel_id, &outgoing)
        .await
        .map_err(CoreError::from)?;

    let timeout_seconds = params
        .timeout_seconds
        .unwrap_or(DEFAULT_PROMPT_TIMEOUT_SECS);

    state
        .engine
        .insert_prompt(
            &sent.message_id,
            PromptState {
                execution_id: params.execution_id.clone(),
                content: params.content.clone(),
                value: None,
                restrict_to_roles,
                restrict_to_triggering_user,
                mention_roles: params.mention_roles.clone(),
                buttons: params.buttons.clone(),
                select: params.select.clone(),
                timeout_seconds,
                persistent: params.persistent,
            },
        )
        .await;

    if params.persistent || timeout_seconds == 0 {
        return Ok(LinkResponse::Prompt(PromptOutcome::Posted {
            message_id: sent.message_id,
        }));
    }

    let outcome = senders::run_prompt(
        &state.chat,
        &state.engine,
        &sent.channel_id,
        &sent.message_id,
        &params.content,
        timeout_seconds,
    )
    .await;

    Ok(LinkResponse::Prompt(outcome))
}

// ============================================================================
// send:action
// ============================================================================

/// Handle `send:action`.
///
/// With `use_placeholder`, the placeholder message is finalized and deleted
/// before the action runs.
#[instrument(skip(state, params), fields(execution_id = ?params.execution_id))]
pub async fn handle_send_action(
    state: &HandlerState,
    params: ActionParams,
) -> Result<LinkResponse> {
    if !state.session.is_ready().await {
        return Err(CoreError::NotReady.into());
    }

    let channel_id = resolve_channel(
        state,
        params.execution_id.as_deref(),
        params.channel_id.as_deref(),
        params.use_placeholder || params.use_trigger_channel,
    )
    .await?;

    if params.use_placeholder
        && let Some(execution_id) = params.execution_id.as_deref()
        && let Some(matching) = state.engine.execution(execution_id).await
        && let Some(placeholder_id) = matching.placeholder_id.as_deref()
        && let Some(real_message_id) = state.engine.finalize_placeholder(placeholder_id).await
    {
        if let Err(e) = state.chat.delete_message(&channel_id, &real_message_id).await {
            warn!(%channel_id, %real_message_id, error = %e, "failed to delete placeholder");
        }
    }

    perform_action(state, &channel_id, &params.action).await?;

    Ok(LinkResponse::ActionDone {
        channel_id,
        action: params.action.name().to_string(),
    })
}

async fn perform_action(
    state: &HandlerState,
    channel_id: &str,
    action: &ActionKind,
) -> Result<(), CoreError> {
    match action {
        ActionKind::RemoveMessages { count } => {
            state
                .chat
                .bulk_delete(channel_id, *count)
                .await
                .map_err(CoreError::from)?;
        }
        ActionKind::AddRole {
            user_id,
            role_ids,
            audit_reason,
        } => {
            let held = state.chat.member_roles(user_id).await.map_err(CoreError::from)?;
            for role_id in role_ids {
                if !held.contains(role_id) {
                    state
                        .chat
                        .add_role(user_id, role_id, audit_reason.as_deref())
                        .await
                        .map_err(CoreError::from)?;
                }
            }
        }
        ActionKind::RemoveRole {
            user_id,
            role_ids,
            audit_reason,
        } => {
            let held = state.chat.member_roles(user_id).await.map_err(CoreError::from)?;
            for role_id in role_ids {
                if held.contains(role_id) {
                    state
                        .chat
                        .remove_role(user_id, role_id, audit_reason.as_deref())
                        .await
                        .map_err(CoreError::from)?;
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// execution
// ============================================================================

/// Handle `execution` (already acked on the wire).
///
/// Registers the execution match; when a placeholder id is supplied the
/// placeholder is attached and status polling starts so the correlation
/// entries are released once the workflow finishes.
#[instrument(skip(state, params), fields(execution_id = %params.execution_id))]
pub async fn handle_execution(state: &HandlerState, params: ExecutionParams) {
    if params.execution_id.is_empty() || params.channel_id.is_empty() {
        warn!("execution registration missing execution_id or channel_id");
        return;
    }

    state
        .engine
        .begin_execution(&params.execution_id, &params.channel_id, params.user_id)
        .await;

    let Some(placeholder_id) = params.placeholder_id.filter(|p| !p.is_empty()) else {
        return;
    };

    state
        .engine
        .attach_placeholder(&params.execution_id, &placeholder_id)
        .await;

    if params.api_key.is_some() && !params.base_url.is_empty() {
        state
            .workflow
            .configure(WorkflowContext {
                base_url: params.base_url,
                api_key: params.api_key,
            })
            .await;
        state
            .engine
            .start_status_polling(params.execution_id, placeholder_id);
    }
}

// ============================================================================
// trigger
// ============================================================================

/// Handle a trigger upsert from the workflow-activation side.
#[instrument(skip(state, upsert), fields(trigger_id = %upsert.trigger.id))]
pub async fn handle_trigger(state: &HandlerState, upsert: TriggerUpsert) -> bool {
    debug!(active = upsert.trigger.active, "trigger update");

    if upsert.trigger.id.is_empty() {
        warn!("trigger upsert without id rejected");
        return false;
    }

    if !upsert.base_url.is_empty() {
        state.workflow.set_base_url(&upsert.base_url).await;
    }

    let is_command = upsert.trigger.kind == TriggerKind::Command;
    state.registry.upsert(upsert.trigger).await;

    // Command batch is rebuilt after the debounce window; a deactivation of
    // the last command trigger flushes an empty set
    if is_command {
        state.debouncer.schedule().await;
    }

    true
}

// ============================================================================
// bot:status
// ============================================================================

/// Handle `bot:status` (already acked on the wire). Ignored until Ready.
#[instrument(skip(state, params))]
pub async fn handle_bot_status(state: &HandlerState, params: BotStatusParams) {
    if !state.session.is_ready().await {
        debug!("bot:status ignored, session not ready");
        return;
    }

    if let Err(e) = state
        .chat
        .set_presence(&params.activity, params.activity_type, &params.status)
        .await
    {
        warn!(error = %e, "failed to apply bot status");
    }
}
