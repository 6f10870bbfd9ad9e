// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Typed link messages exchanged between execution contexts and the gateway.
//!
//! Every link call carries one [`LinkRequest`] and receives one terminal
//! [`LinkResponse`] (credentials additionally emits a non-terminal `login`
//! progress frame while the platform login runs).

use serde::{Deserialize, Serialize};

/// A named platform object (channel, role) as shown in selection lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
    pub id: String,
}

/// Trigger kinds, one per platform event family a workflow can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Message,
    MessageUpdate,
    ThreadCreate,
    ThreadUpdate,
    UserJoins,
    UserRoleAdded,
    UserRoleRemoved,
    UserNickUpdated,
    Presence,
    Command,
    Interaction,
}

/// Field attached to a registered slash command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandField {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    pub kind: CommandFieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandFieldKind {
    Text,
    Number,
    Integer,
    Boolean,
}

/// One registered workflow trigger.
///
/// `id` is the stable webhook identifier; an upsert with the same id replaces
/// the previous definition. A trigger with `active == false` is retained for
/// reactivation but never matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    pub kind: TriggerKind,
    /// Channels the trigger listens on; empty is normalized to `["all"]`.
    #[serde(default)]
    pub channel_ids: Vec<String>,
    /// Role allow-list; empty means no restriction.
    #[serde(default)]
    pub role_ids: Vec<String>,
    /// For role-update kinds: the roles whose addition/removal fires the trigger.
    #[serde(default)]
    pub role_update_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal_value: Option<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub bot_mention: bool,
    /// For presence kind: the status to match, or "any".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_field: Option<CommandField>,
    /// For interaction kind: the message the component is attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_message_id: Option<String>,
    /// Text of the "working..." placeholder posted while the workflow runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder_text: Option<String>,
    #[serde(default)]
    pub active: bool,
}

impl Trigger {
    /// Minimal trigger of the given kind, inactive until upserted as active.
    pub fn new(id: impl Into<String>, kind: TriggerKind) -> Self {
        Self {
            id: id.into(),
            kind,
            channel_ids: Vec::new(),
            role_ids: Vec::new(),
            role_update_ids: Vec::new(),
            pattern: None,
            literal_value: None,
            case_sensitive: false,
            bot_mention: false,
            presence: None,
            command_name: None,
            command_description: None,
            command_field: None,
            interaction_message_id: None,
            placeholder_text: None,
            active: false,
        }
    }
}

/// Compiled slash-command registration shape sent to the platform in bulk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<CommandField>,
}

/// Button shown on an interactive prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonSpec {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

/// Select menu shown on an interactive prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectSpec {
    pub options: Vec<SelectOptionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_values: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_values: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOptionSpec {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default)]
    pub default: bool,
}

/// Outbound message content.
///
/// The embed value is carried opaquely; rendering is the platform adapter's
/// concern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<serde_json::Value>,
    #[serde(default)]
    pub attachment_urls: Vec<String>,
    #[serde(default)]
    pub mention_role_ids: Vec<String>,
    #[serde(default)]
    pub buttons: Vec<ButtonSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<SelectSpec>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Same content with all interactive components removed.
    pub fn without_components(&self) -> Self {
        Self {
            buttons: Vec::new(),
            select: None,
            ..self.clone()
        }
    }
}

/// Credentials for the platform login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsParams {
    pub token: String,
    pub client_id: String,
}

/// Registration of an in-flight workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionParams {
    pub execution_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder_id: Option<String>,
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Trigger upsert from the workflow-activation side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerUpsert {
    pub trigger: Trigger,
    pub base_url: String,
}

/// Parameters for `send:message`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Finalize the execution's placeholder message instead of posting anew.
    #[serde(default)]
    pub use_placeholder: bool,
    /// Resolve the target channel from the triggering execution.
    #[serde(default)]
    pub use_trigger_channel: bool,
    pub message: OutgoingMessage,
}

/// Parameters for `send:prompt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptParams {
    pub channel_id: String,
    pub execution_id: String,
    pub content: String,
    /// Seconds until the prompt times out; `None` uses the default (60).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Persistent prompts never expire and are read by a later pull.
    #[serde(default)]
    pub persistent: bool,
    #[serde(default)]
    pub restrict_to_roles: bool,
    #[serde(default)]
    pub restrict_to_triggering_user: bool,
    #[serde(default)]
    pub mention_roles: Vec<String>,
    #[serde(default)]
    pub buttons: Vec<ButtonSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<SelectSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_color: Option<String>,
}

/// Platform-side actions beyond plain messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    RemoveMessages {
        count: u8,
    },
    AddRole {
        user_id: String,
        role_ids: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audit_reason: Option<String>,
    },
    RemoveRole {
        user_id: String,
        role_ids: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audit_reason: Option<String>,
    },
}

impl ActionKind {
    /// Short action name echoed back in the response.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::RemoveMessages { .. } => "remove_messages",
            ActionKind::AddRole { .. } => "add_role",
            ActionKind::RemoveRole { .. } => "remove_role",
        }
    }
}

/// Parameters for `send:action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Delete the execution's placeholder message before acting.
    #[serde(default)]
    pub use_placeholder: bool,
    #[serde(default)]
    pub use_trigger_channel: bool,
    pub action: ActionKind,
}

/// Parameters for `bot:status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotStatusParams {
    pub activity: String,
    #[serde(default)]
    pub activity_type: u8,
    pub status: String,
}

/// All link calls an execution context can make.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "params", rename_all = "snake_case")]
pub enum LinkRequest {
    Credentials(CredentialsParams),
    ListChannels,
    ListRoles,
    SendMessage(MessageParams),
    SendPrompt(PromptParams),
    SendAction(ActionParams),
    Execution(ExecutionParams),
    Trigger(TriggerUpsert),
    BotStatus(BotStatusParams),
}

impl LinkRequest {
    /// Operation name used for logging and error codes.
    pub fn op_name(&self) -> &'static str {
        match self {
            LinkRequest::Credentials(_) => "credentials",
            LinkRequest::ListChannels => "list:channels",
            LinkRequest::ListRoles => "list:roles",
            LinkRequest::SendMessage(_) => "send:message",
            LinkRequest::SendPrompt(_) => "send:prompt",
            LinkRequest::SendAction(_) => "send:action",
            LinkRequest::Execution(_) => "execution",
            LinkRequest::Trigger(_) => "trigger",
            LinkRequest::BotStatus(_) => "bot:status",
        }
    }
}

/// Outcome of a `credentials` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginAck {
    /// Login completed and the connection is ready.
    Ready,
    /// Already ready with the same credentials; no reconnect performed.
    Already,
    /// Login started; a terminal ack follows once it settles.
    Login,
    /// Another login is already in flight; this request was not serviced.
    Different,
    /// Login failed.
    Error,
    /// Token or client id missing.
    Missing,
}

/// The human response recorded on an answered prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptAnswer {
    pub value: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_tag: String,
    pub channel_id: String,
    pub message_id: String,
}

/// Terminal result of a `send:prompt` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PromptOutcome {
    Answered {
        response: PromptAnswer,
        message_id: String,
    },
    TimedOut {
        message_id: String,
    },
    /// Persistent prompt was posted; it will be read by a later pull.
    Posted {
        message_id: String,
    },
}

/// All terminal link responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reply", content = "data", rename_all = "snake_case")]
pub enum LinkResponse {
    Credentials(LoginAck),
    Channels(Vec<NamedRef>),
    Roles(Vec<NamedRef>),
    MessageSent {
        channel_id: String,
        message_id: String,
    },
    Prompt(PromptOutcome),
    ActionDone {
        channel_id: String,
        action: String,
    },
    Ack(bool),
    Error {
        code: String,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_kind_serde_names() {
        let json = serde_json::to_string(&TriggerKind::UserRoleAdded).unwrap();
        assert_eq!(json, "\"user_role_added\"");
        let back: TriggerKind = serde_json::from_str("\"message_update\"").unwrap();
        assert_eq!(back, TriggerKind::MessageUpdate);
    }

    #[test]
    fn test_trigger_defaults_on_deserialize() {
        // A caller may omit every optional field
        let trigger: Trigger =
            serde_json::from_str(r#"{"id":"wh-1","kind":"message"}"#).unwrap();
        assert_eq!(trigger.id, "wh-1");
        assert!(trigger.channel_ids.is_empty());
        assert!(!trigger.active);
        assert!(trigger.pattern.is_none());
    }

    #[test]
    fn test_link_request_round_trip() {
        let req = LinkRequest::Credentials(CredentialsParams {
            token: "tok".into(),
            client_id: "cid".into(),
        });
        let json = serde_json::to_string(&req).unwrap();
        let back: LinkRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, back);
        assert_eq!(req.op_name(), "credentials");
    }

    #[test]
    fn test_link_response_round_trip() {
        let resp = LinkResponse::Prompt(PromptOutcome::TimedOut {
            message_id: "m-9".into(),
        });
        let json = serde_json::to_string(&resp).unwrap();
        let back: LinkResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(resp, back);
    }

    #[test]
    fn test_action_kind_names() {
        assert_eq!(ActionKind::RemoveMessages { count: 3 }.name(), "remove_messages");
        assert_eq!(
            ActionKind::AddRole {
                user_id: "u".into(),
                role_ids: vec![],
                audit_reason: None
            }
            .name(),
            "add_role"
        );
    }

    #[test]
    fn test_outgoing_message_without_components() {
        let msg = OutgoingMessage {
            content: "pick one".into(),
            buttons: vec![ButtonSpec {
                label: "Yes".into(),
                value: "yes".into(),
                style: None,
                emoji: None,
                disabled: false,
            }],
            ..Default::default()
        };
        let stripped = msg.without_components();
        assert_eq!(stripped.content, "pick one");
        assert!(stripped.buttons.is_empty());
        assert!(stripped.select.is_none());
    }

    #[test]
    fn test_message_params_defaults() {
        let params: MessageParams =
            serde_json::from_str(r#"{"message":{"content":"hi"}}"#).unwrap();
        assert!(!params.use_placeholder);
        assert!(params.channel_id.is_none());
        assert_eq!(params.message.content, "hi");
    }
}
