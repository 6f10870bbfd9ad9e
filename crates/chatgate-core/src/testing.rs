// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory ports for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use chatgate_protocol::message::{CommandSpec, NamedRef, OutgoingMessage};

use crate::chat::{ChatError, ChatPort, ChatResult, InteractionRef, MessageRef};
use crate::workflow::{DispatchPayload, WorkflowApiError, WorkflowContext, WorkflowPort};

/// Recording [`ChatPort`] with scriptable failures.
pub struct MockChat {
    login_calls: AtomicUsize,
    login_delay_ms: AtomicU64,
    login_fails: AtomicBool,
    send_fails: AtomicBool,
    next_message_id: AtomicU64,
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
    edits: Mutex<Vec<(String, String, OutgoingMessage)>>,
    deletions: Mutex<Vec<(String, String)>>,
    bulk_deletions: Mutex<Vec<(String, u8)>>,
    role_ops: Mutex<Vec<String>>,
    presences: Mutex<Vec<(String, u8, String)>>,
    command_batches: Mutex<Vec<Vec<CommandSpec>>>,
    interaction_replies: Mutex<Vec<(String, bool)>>,
    deferred: AtomicUsize,
    channels_out: Mutex<Vec<NamedRef>>,
    roles_out: Mutex<Vec<NamedRef>>,
    member_roles_out: Mutex<HashMap<String, Vec<String>>>,
}

impl MockChat {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            login_calls: AtomicUsize::new(0),
            login_delay_ms: AtomicU64::new(0),
            login_fails: AtomicBool::new(false),
            send_fails: AtomicBool::new(false),
            next_message_id: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            deletions: Mutex::new(Vec::new()),
            bulk_deletions: Mutex::new(Vec::new()),
            role_ops: Mutex::new(Vec::new()),
            presences: Mutex::new(Vec::new()),
            command_batches: Mutex::new(Vec::new()),
            interaction_replies: Mutex::new(Vec::new()),
            deferred: AtomicUsize::new(0),
            channels_out: Mutex::new(Vec::new()),
            roles_out: Mutex::new(Vec::new()),
            member_roles_out: Mutex::new(HashMap::new()),
        })
    }

    pub fn set_login_delay(&self, delay: Duration) {
        self.login_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail_login(&self) {
        self.login_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_sends(&self) {
        self.send_fails.store(true, Ordering::SeqCst);
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<(String, String, OutgoingMessage)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn edit_count(&self) -> usize {
        self.edits.lock().unwrap().len()
    }

    pub fn deletions(&self) -> Vec<(String, String)> {
        self.deletions.lock().unwrap().clone()
    }

    pub fn bulk_deletions(&self) -> Vec<(String, u8)> {
        self.bulk_deletions.lock().unwrap().clone()
    }

    pub fn role_ops(&self) -> Vec<String> {
        self.role_ops.lock().unwrap().clone()
    }

    pub fn presences(&self) -> Vec<(String, u8, String)> {
        self.presences.lock().unwrap().clone()
    }

    pub fn command_batches(&self) -> Vec<Vec<CommandSpec>> {
        self.command_batches.lock().unwrap().clone()
    }

    pub fn interaction_replies(&self) -> Vec<(String, bool)> {
        self.interaction_replies.lock().unwrap().clone()
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.load(Ordering::SeqCst)
    }

    pub fn set_channels(&self, channels: Vec<NamedRef>) {
        *self.channels_out.lock().unwrap() = channels;
    }

    pub fn set_roles(&self, roles: Vec<NamedRef>) {
        *self.roles_out.lock().unwrap() = roles;
    }

    pub fn set_member_roles(&self, user_id: &str, roles: Vec<String>) {
        self.member_roles_out
            .lock()
            .unwrap()
            .insert(user_id.to_string(), roles);
    }
}

#[async_trait]
impl ChatPort for MockChat {
    async fn login(&self, _token: &str, _client_id: &str) -> ChatResult<()> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.login_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.login_fails.load(Ordering::SeqCst) {
            return Err(ChatError::new("login", "invalid token"));
        }
        Ok(())
    }

    async fn channels(&self) -> ChatResult<Vec<NamedRef>> {
        Ok(self.channels_out.lock().unwrap().clone())
    }

    async fn roles(&self) -> ChatResult<Vec<NamedRef>> {
        Ok(self.roles_out.lock().unwrap().clone())
    }

    async fn member_roles(&self, user_id: &str) -> ChatResult<Vec<String>> {
        Ok(self
            .member_roles_out
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
    ) -> ChatResult<MessageRef> {
        if self.send_fails.load(Ordering::SeqCst) {
            return Err(ChatError::new("send_message", "send rejected"));
        }
        let n = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), message.clone()));
        Ok(MessageRef {
            channel_id: channel_id.to_string(),
            message_id: format!("m-{}", n),
        })
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        message: &OutgoingMessage,
    ) -> ChatResult<()> {
        self.edits.lock().unwrap().push((
            channel_id.to_string(),
            message_id.to_string(),
            message.clone(),
        ));
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> ChatResult<()> {
        self.deletions
            .lock()
            .unwrap()
            .push((channel_id.to_string(), message_id.to_string()));
        Ok(())
    }

    async fn bulk_delete(&self, channel_id: &str, count: u8) -> ChatResult<()> {
        self.bulk_deletions
            .lock()
            .unwrap()
            .push((channel_id.to_string(), count));
        Ok(())
    }

    async fn add_role(
        &self,
        user_id: &str,
        role_id: &str,
        _audit_reason: Option<&str>,
    ) -> ChatResult<()> {
        self.role_ops
            .lock()
            .unwrap()
            .push(format!("add:{}:{}", user_id, role_id));
        Ok(())
    }

    async fn remove_role(
        &self,
        user_id: &str,
        role_id: &str,
        _audit_reason: Option<&str>,
    ) -> ChatResult<()> {
        self.role_ops
            .lock()
            .unwrap()
            .push(format!("remove:{}:{}", user_id, role_id));
        Ok(())
    }

    async fn set_presence(
        &self,
        activity: &str,
        activity_type: u8,
        status: &str,
    ) -> ChatResult<()> {
        self.presences.lock().unwrap().push((
            activity.to_string(),
            activity_type,
            status.to_string(),
        ));
        Ok(())
    }

    async fn register_commands(&self, commands: &[CommandSpec]) -> ChatResult<()> {
        self.command_batches.lock().unwrap().push(commands.to_vec());
        Ok(())
    }

    async fn ack_interaction(
        &self,
        _interaction: &InteractionRef,
        content: &str,
        ephemeral: bool,
    ) -> ChatResult<()> {
        self.interaction_replies
            .lock()
            .unwrap()
            .push((content.to_string(), ephemeral));
        Ok(())
    }

    async fn defer_interaction(&self, _interaction: &InteractionRef) -> ChatResult<()> {
        self.deferred.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Recording [`WorkflowPort`] with scriptable status answers.
pub struct MockWorkflow {
    delivered: Mutex<Vec<(String, DispatchPayload)>>,
    delivery_fails: AtomicBool,
    status_fails: AtomicBool,
    status_queries: AtomicUsize,
    finished: Mutex<HashMap<String, bool>>,
    context: Mutex<Option<WorkflowContext>>,
    base_urls: Mutex<Vec<String>>,
}

impl MockWorkflow {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            delivered: Mutex::new(Vec::new()),
            delivery_fails: AtomicBool::new(false),
            status_fails: AtomicBool::new(false),
            status_queries: AtomicUsize::new(0),
            finished: Mutex::new(HashMap::new()),
            context: Mutex::new(None),
            base_urls: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_deliveries(&self) {
        self.delivery_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_status_queries(&self) {
        self.status_fails.store(true, Ordering::SeqCst);
    }

    pub fn set_finished(&self, execution_id: &str, finished: bool) {
        self.finished
            .lock()
            .unwrap()
            .insert(execution_id.to_string(), finished);
    }

    pub fn delivered(&self) -> Vec<(String, DispatchPayload)> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn delivery_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }

    pub fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    pub fn context(&self) -> Option<WorkflowContext> {
        self.context.lock().unwrap().clone()
    }

    pub fn base_urls(&self) -> Vec<String> {
        self.base_urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkflowPort for MockWorkflow {
    async fn configure(&self, context: WorkflowContext) {
        *self.context.lock().unwrap() = Some(context);
    }

    async fn set_base_url(&self, base_url: &str) {
        self.base_urls.lock().unwrap().push(base_url.to_string());
    }

    async fn deliver(
        &self,
        webhook_id: &str,
        payload: &DispatchPayload,
    ) -> Result<(), WorkflowApiError> {
        if self.delivery_fails.load(Ordering::SeqCst) {
            return Err(WorkflowApiError::Delivery("delivery rejected".into()));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((webhook_id.to_string(), payload.clone()));
        Ok(())
    }

    async fn execution_finished(&self, execution_id: &str) -> Result<bool, WorkflowApiError> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        if self.status_fails.load(Ordering::SeqCst) {
            return Err(WorkflowApiError::Status("status unavailable".into()));
        }
        Ok(self
            .finished
            .lock()
            .unwrap()
            .get(execution_id)
            .copied()
            .unwrap_or(false))
    }
}
