// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cross-process correlation tables and their lifecycle rules.
//!
//! The gateway exclusively owns three keyed tables:
//!
//! - execution ↔ interaction context (channel, triggering user, placeholder)
//! - placeholder correlation id ↔ real platform message
//! - prompt message ↔ pending human response
//!
//! Execution contexts never touch these directly; every mutation arrives
//! through a link handler or the event router. Each table sits behind its own
//! mutex so no read-modify-write on the same entry can interleave.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use chatgate_protocol::message::{
    ButtonSpec, PromptAnswer, SelectSpec, Trigger,
};

use crate::chat::ChatPort;
use crate::event::Actor;
use crate::workflow::{DispatchPayload, WorkflowApiError, WorkflowPort};

/// Tick interval of the placeholder "loading dots" animation.
const ANIMATION_TICK: Duration = Duration::from_millis(800);

/// Retry interval while waiting for the animation to yield.
const FINALIZE_RETRY: Duration = Duration::from_millis(300);

/// Retry budget before a finalizer proceeds anyway.
const FINALIZE_ATTEMPTS: u32 = 10;

/// Interval between execution-status polls.
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// One in-flight workflow execution correlated to a chat interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMatch {
    pub channel_id: String,
    pub user_id: Option<String>,
    pub placeholder_id: Option<String>,
}

/// One interactive prompt awaiting a human response.
///
/// `value` doubles as the Pending/Answered guard: a response is only recorded
/// while it is `None`, so late responses after the terminal transition are
/// ignored.
#[derive(Debug, Clone)]
pub struct PromptState {
    pub execution_id: String,
    pub content: String,
    pub value: Option<PromptAnswer>,
    pub restrict_to_roles: bool,
    pub restrict_to_triggering_user: bool,
    pub mention_roles: Vec<String>,
    pub buttons: Vec<ButtonSpec>,
    pub select: Option<SelectSpec>,
    pub timeout_seconds: u64,
    pub persistent: bool,
}

impl PromptState {
    /// Label of the option matching a submitted value, if any.
    pub fn option_label(&self, value: &str) -> Option<String> {
        if let Some(button) = self.buttons.iter().find(|b| b.value == value) {
            return Some(button.label.clone());
        }
        self.select
            .as_ref()
            .and_then(|s| s.options.iter().find(|o| o.value == value))
            .map(|o| o.label.clone())
    }
}

/// Outcome of recording a prompt response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAnswerOutcome {
    /// The response was recorded; the label is echoed back to the channel.
    Recorded { label: String },
    /// The prompt already has a response; this one is ignored.
    AlreadyAnswered,
    /// The submitted value matches no configured option.
    UnknownOption,
    /// No prompt is attached to this message.
    NoSuchPrompt,
}

/// Owns the correlation tables and their lifecycle timers.
pub struct CorrelationEngine {
    executions: Mutex<HashMap<String, ExecutionMatch>>,
    placeholder_targets: Mutex<HashMap<String, String>>,
    // Separate from targets: the waiting flag must outlive target removal
    // while a finalizer races the animation loop.
    placeholder_waiting: Mutex<HashMap<String, bool>>,
    prompts: Mutex<HashMap<String, PromptState>>,
    workflow: Arc<dyn WorkflowPort>,
}

impl CorrelationEngine {
    pub fn new(workflow: Arc<dyn WorkflowPort>) -> Arc<Self> {
        Arc::new(Self {
            executions: Mutex::new(HashMap::new()),
            placeholder_targets: Mutex::new(HashMap::new()),
            placeholder_waiting: Mutex::new(HashMap::new()),
            prompts: Mutex::new(HashMap::new()),
            workflow,
        })
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Deliver a matched event to the trigger's webhook.
    ///
    /// Mints a correlation id when the trigger wants a placeholder and stamps
    /// it into the payload. Returns the minted id on success so the caller
    /// can post the placeholder message.
    #[instrument(skip(self, trigger, payload), fields(webhook_id = %trigger.id))]
    pub async fn dispatch(
        &self,
        trigger: &Trigger,
        mut payload: DispatchPayload,
    ) -> Result<Option<String>, WorkflowApiError> {
        let correlation_id = trigger
            .placeholder_text
            .as_ref()
            .map(|_| Uuid::new_v4().simple().to_string());

        if let Some(ref id) = correlation_id {
            payload.placeholder_id = id.clone();
        }

        self.workflow.deliver(&trigger.id, &payload).await?;
        debug!(placeholder = ?correlation_id, "trigger event delivered");
        Ok(correlation_id)
    }

    // ========================================================================
    // Execution matching
    // ========================================================================

    /// Register an in-flight execution (pending-call ticket).
    pub async fn begin_execution(
        &self,
        execution_id: &str,
        channel_id: &str,
        user_id: Option<String>,
    ) {
        let mut executions = self.executions.lock().await;
        executions.insert(
            execution_id.to_string(),
            ExecutionMatch {
                channel_id: channel_id.to_string(),
                user_id,
                placeholder_id: None,
            },
        );
    }

    /// Attach a placeholder to an existing execution.
    ///
    /// A no-op when the execution id is unknown; the execution may have
    /// already completed.
    pub async fn attach_placeholder(&self, execution_id: &str, placeholder_id: &str) {
        let mut executions = self.executions.lock().await;
        if let Some(entry) = executions.get_mut(execution_id) {
            entry.placeholder_id = Some(placeholder_id.to_string());
        }
    }

    /// Look up the execution match for an execution id.
    pub async fn execution(&self, execution_id: &str) -> Option<ExecutionMatch> {
        self.executions.lock().await.get(execution_id).cloned()
    }

    /// Drop an execution match.
    pub async fn remove_execution(&self, execution_id: &str) {
        self.executions.lock().await.remove(execution_id);
    }

    // ========================================================================
    // Placeholder lifecycle
    // ========================================================================

    /// Bind a correlation id to the real placeholder message and mark the
    /// animation as running.
    pub async fn register_placeholder(&self, correlation_id: &str, real_message_id: &str) {
        self.placeholder_targets
            .lock()
            .await
            .insert(correlation_id.to_string(), real_message_id.to_string());
        self.placeholder_waiting
            .lock()
            .await
            .insert(correlation_id.to_string(), true);
    }

    /// The real message id behind a correlation id, if still registered.
    pub async fn placeholder_target(&self, correlation_id: &str) -> Option<String> {
        self.placeholder_targets
            .lock()
            .await
            .get(correlation_id)
            .cloned()
    }

    async fn is_waiting(&self, correlation_id: &str) -> bool {
        self.placeholder_waiting
            .lock()
            .await
            .get(correlation_id)
            .copied()
            .unwrap_or(false)
    }

    async fn clear_waiting(&self, correlation_id: &str) {
        self.placeholder_waiting.lock().await.remove(correlation_id);
    }

    /// Claim a placeholder for finalization.
    ///
    /// Removes the target mapping first — that both signals the animation
    /// loop to stop and guarantees a concurrent second finalizer observes
    /// nothing to act on — then waits for the animation to confirm it has
    /// yielded, bounded by the retry budget. Returns the real message id the
    /// caller may now edit or delete.
    #[instrument(skip(self))]
    pub async fn finalize_placeholder(&self, correlation_id: &str) -> Option<String> {
        let real_message_id = self
            .placeholder_targets
            .lock()
            .await
            .remove(correlation_id)?;

        let mut attempts = 0;
        while self.is_waiting(correlation_id).await {
            attempts += 1;
            if attempts > FINALIZE_ATTEMPTS {
                warn!(
                    %correlation_id,
                    "placeholder still animating after retry budget, proceeding anyway"
                );
                break;
            }
            tokio::time::sleep(FINALIZE_RETRY).await;
        }

        Some(real_message_id)
    }

    /// Register a placeholder and run its "loading dots" animation.
    ///
    /// The loop edits the message with one to three dots appended and checks
    /// on every tick whether it has been superseded (target mapping removed),
    /// restoring the base text and clearing the waiting flag on exit.
    pub async fn spawn_placeholder_animation(
        self: &Arc<Self>,
        chat: Arc<dyn ChatPort>,
        channel_id: String,
        message_id: String,
        correlation_id: String,
        base_text: String,
    ) {
        use chatgate_protocol::message::OutgoingMessage;

        self.register_placeholder(&correlation_id, &message_id).await;

        let engine = self.clone();
        tokio::spawn(async move {
            let mut dots = 0usize;
            loop {
                dots += 1;
                if dots > 3 {
                    dots = 0;
                }

                if engine.placeholder_target(&correlation_id).await.is_none() {
                    let _ = chat
                        .edit_message(&channel_id, &message_id, &OutgoingMessage::text(&base_text))
                        .await;
                    engine.clear_waiting(&correlation_id).await;
                    return;
                }

                let mut content = base_text.clone();
                for _ in 0..dots {
                    content.push('.');
                }
                let _ = chat
                    .edit_message(&channel_id, &message_id, &OutgoingMessage::text(content))
                    .await;

                tokio::time::sleep(ANIMATION_TICK).await;
            }
        });
    }

    /// Poll the workflow engine until the execution finishes.
    ///
    /// A single self-rescheduling task, so at most one timer is pending per
    /// execution. Stops the moment the placeholder mapping disappears (a
    /// finalizer consumed it); on finish or on a status error both the
    /// placeholder and execution entries are dropped.
    pub fn start_status_polling(self: &Arc<Self>, execution_id: String, placeholder_id: String) {
        let engine = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(STATUS_POLL_INTERVAL).await;

                if engine.placeholder_target(&placeholder_id).await.is_none() {
                    engine.remove_execution(&execution_id).await;
                    return;
                }

                match engine.workflow.execution_finished(&execution_id).await {
                    Ok(false) => continue,
                    Ok(true) => {
                        debug!(%execution_id, "execution finished, releasing correlation entries");
                    }
                    Err(e) => {
                        warn!(%execution_id, error = %e, "status poll failed, releasing correlation entries");
                    }
                }

                engine
                    .placeholder_targets
                    .lock()
                    .await
                    .remove(&placeholder_id);
                engine.remove_execution(&execution_id).await;
                return;
            }
        });
    }

    // ========================================================================
    // Prompt lifecycle
    // ========================================================================

    /// Attach a pending prompt to a posted message.
    pub async fn insert_prompt(&self, message_id: &str, prompt: PromptState) {
        self.prompts
            .lock()
            .await
            .insert(message_id.to_string(), prompt);
    }

    /// Snapshot a prompt for permission checks.
    pub async fn prompt(&self, message_id: &str) -> Option<PromptState> {
        self.prompts.lock().await.get(message_id).cloned()
    }

    /// Whether the prompt has a recorded response.
    pub async fn prompt_answered(&self, message_id: &str) -> bool {
        self.prompts
            .lock()
            .await
            .get(message_id)
            .is_some_and(|p| p.value.is_some())
    }

    /// Consume a prompt (Answered → Consumed, or timeout removal).
    pub async fn take_prompt(&self, message_id: &str) -> Option<PromptState> {
        self.prompts.lock().await.remove(message_id)
    }

    /// Record a human response on a pending prompt.
    ///
    /// The whole read-modify-write runs under the prompts lock, so two
    /// simultaneous responders cannot both be recorded.
    pub async fn answer_prompt(
        &self,
        message_id: &str,
        value: &str,
        responder: &Actor,
        channel_id: &str,
    ) -> PromptAnswerOutcome {
        let mut prompts = self.prompts.lock().await;
        let Some(prompt) = prompts.get_mut(message_id) else {
            return PromptAnswerOutcome::NoSuchPrompt;
        };
        if prompt.value.is_some() {
            return PromptAnswerOutcome::AlreadyAnswered;
        }
        let Some(label) = prompt.option_label(value) else {
            return PromptAnswerOutcome::UnknownOption;
        };

        prompt.value = Some(PromptAnswer {
            value: value.to_string(),
            user_id: responder.id.clone(),
            user_name: responder.username.clone(),
            user_tag: responder.tag.clone(),
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
        });

        PromptAnswerOutcome::Recorded { label }
    }
}
