// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared mock ports for integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use chatgate_core::chat::{ChatError, ChatPort, ChatResult, InteractionRef, MessageRef};
use chatgate_core::workflow::{DispatchPayload, WorkflowApiError, WorkflowContext, WorkflowPort};
use chatgate_protocol::message::{CommandSpec, NamedRef, OutgoingMessage};

/// ChatPort stub: logins always succeed, sends get sequential message ids.
pub struct StubChat {
    next_message_id: AtomicU64,
    fail_login: AtomicBool,
    pub sent: Mutex<Vec<(String, OutgoingMessage)>>,
    pub channels: Mutex<Vec<NamedRef>>,
}

impl StubChat {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_message_id: AtomicU64::new(0),
            fail_login: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            channels: Mutex::new(vec![NamedRef {
                name: "general".into(),
                id: "C1".into(),
            }]),
        })
    }

    #[allow(dead_code)]
    pub fn fail_login(&self) {
        self.fail_login.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatPort for StubChat {
    async fn login(&self, _token: &str, _client_id: &str) -> ChatResult<()> {
        if self.fail_login.load(Ordering::SeqCst) {
            return Err(ChatError::new("login", "invalid token"));
        }
        Ok(())
    }

    async fn channels(&self) -> ChatResult<Vec<NamedRef>> {
        Ok(self.channels.lock().unwrap().clone())
    }

    async fn roles(&self) -> ChatResult<Vec<NamedRef>> {
        Ok(vec![
            NamedRef {
                name: "@everyone".into(),
                id: "r-0".into(),
            },
            NamedRef {
                name: "moderators".into(),
                id: "r-1".into(),
            },
        ])
    }

    async fn member_roles(&self, _user_id: &str) -> ChatResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn send_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
    ) -> ChatResult<MessageRef> {
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
        _channel_id: &str,
        _message_id: &str,
        _message: &OutgoingMessage,
    ) -> ChatResult<()> {
        Ok(())
    }

    async fn delete_message(&self, _channel_id: &str, _message_id: &str) -> ChatResult<()> {
        Ok(())
    }

    async fn bulk_delete(&self, _channel_id: &str, _count: u8) -> ChatResult<()> {
        Ok(())
    }

    async fn add_role(
        &self,
        _user_id: &str,
        _role_id: &str,
        _audit_reason: Option<&str>,
    ) -> ChatResult<()> {
        Ok(())
    }

    async fn remove_role(
        &self,
        _user_id: &str,
        _role_id: &str,
        _audit_reason: Option<&str>,
    ) -> ChatResult<()> {
        Ok(())
    }

    async fn set_presence(
        &self,
        _activity: &str,
        _activity_type: u8,
        _status: &str,
    ) -> ChatResult<()> {
        Ok(())
    }

    async fn register_commands(&self, _commands: &[CommandSpec]) -> ChatResult<()> {
        Ok(())
    }

    async fn ack_interaction(
        &self,
        _interaction: &InteractionRef,
        _content: &str,
        _ephemeral: bool,
    ) -> ChatResult<()> {
        Ok(())
    }

    async fn defer_interaction(&self, _interaction: &InteractionRef) -> ChatResult<()> {
        Ok(())
    }
}

/// WorkflowPort stub recording deliveries.
pub struct StubWorkflow {
    pub delivered: Mutex<Vec<(String, DispatchPayload)>>,
    pub finished: Mutex<HashMap<String, bool>>,
}

impl StubWorkflow {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            delivered: Mutex::new(Vec::new()),
            finished: Mutex::new(HashMap::new()),
        })
    }

    pub fn delivery_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl WorkflowPort for StubWorkflow {
    async fn configure(&self, _context: WorkflowContext) {}

    async fn set_base_url(&self, _base_url: &str) {}

    async fn deliver(
        &self,
        webhook_id: &str,
        payload: &DispatchPayload,
    ) -> Result<(), WorkflowApiError> {
        self.delivered
            .lock()
            .unwrap()
            .push((webhook_id.to_string(), payload.clone()));
        Ok(())
    }

    async fn execution_finished(&self, execution_id: &str) -> Result<bool, WorkflowApiError> {
        Ok(self
            .finished
            .lock()
            .unwrap()
            .get(execution_id)
            .copied()
            .unwrap_or(false))
    }
}
