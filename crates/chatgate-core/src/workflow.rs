// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The workflow-engine seam.
//!
//! Matched events are delivered to the engine's webhook endpoint, and
//! execution completion is observed through its status API. Both are external
//! collaborators behind [`WorkflowPort`]; [`HttpWorkflowApi`] is the HTTP
//! implementation used in production.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The event body posted to a trigger's webhook.
///
/// Fields are populated per event kind; absent fields are omitted from the
/// JSON body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Correlation token minted when the trigger wants a placeholder.
    #[serde(default)]
    pub placeholder_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachment_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interaction_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_roles: Vec<String>,
}

/// Delivery/status context carried by `trigger` and `execution` link calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowContext {
    pub base_url: String,
    pub api_key: Option<String>,
}

/// A failed workflow-engine call.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowApiError {
    #[error("webhook delivery failed: {0}")]
    Delivery(String),

    #[error("status query failed: {0}")]
    Status(String),

    #[error("no delivery context configured")]
    NotConfigured,
}

/// Outbound operations on the workflow engine.
#[async_trait]
pub trait WorkflowPort: Send + Sync {
    /// Update the delivery/status context. Called whenever a trigger upsert
    /// or execution registration carries fresh connection details.
    async fn configure(&self, context: WorkflowContext);

    /// Update only the delivery base url, preserving any stored api key.
    /// Trigger upserts carry the url but not the key.
    async fn set_base_url(&self, base_url: &str);

    /// Post a matched event to the trigger's webhook.
    async fn deliver(
        &self,
        webhook_id: &str,
        payload: &DispatchPayload,
    ) -> Result<(), WorkflowApiError>;

    /// Whether the execution has finished (completed, failed, or stopped).
    async fn execution_finished(&self, execution_id: &str) -> Result<bool, WorkflowApiError>;
}

/// Shape of the engine's execution-status response; only the fields the
/// gateway inspects.
#[derive(Debug, Deserialize)]
struct ExecutionStatusBody {
    #[serde(default)]
    finished: bool,
    #[serde(default)]
    stopped_at: Option<serde_json::Value>,
}

/// HTTP implementation of [`WorkflowPort`].
pub struct HttpWorkflowApi {
    http: reqwest::Client,
    context: tokio::sync::RwLock<WorkflowContext>,
    /// Test-mode deliveries hit the engine's test webhook path.
    test_mode: bool,
}

impl HttpWorkflowApi {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            context: tokio::sync::RwLock::new(WorkflowContext::default()),
            test_mode: false,
        }
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }
}

impl Default for HttpWorkflowApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowPort for HttpWorkflowApi {
    async fn configure(&self, context: WorkflowContext) {
        let mut guard = self.context.write().await;
        *guard = context;
    }

    async fn set_base_url(&self, base_url: &str) {
        let mut guard = self.context.write().await;
        guard.base_url = base_url.to_string();
    }

    async fn deliver(
        &self,
        webhook_id: &str,
        payload: &DispatchPayload,
    ) -> Result<(), WorkflowApiError> {
        let context = self.context.read().await.clone();
        if context.base_url.is_empty() {
            return Err(WorkflowApiError::NotConfigured);
        }

        let path = if self.test_mode {
            "webhook-test"
        } else {
            "webhook"
        };
        let url = format!("{}/{}/{}/webhook", context.base_url, path, webhook_id);

        debug!(%url, "delivering trigger event");

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| WorkflowApiError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WorkflowApiError::Delivery(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn execution_finished(&self, execution_id: &str) -> Result<bool, WorkflowApiError> {
        let context = self.context.read().await.clone();
        if context.base_url.is_empty() {
            return Err(WorkflowApiError::NotConfigured);
        }

        let url = format!("{}/executions/{}", context.base_url, execution_id);
        let mut request = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(ref api_key) = context.api_key {
            request = request.header("X-Api-Key", api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| WorkflowApiError::Status(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WorkflowApiError::Status(format!(
                "status endpoint returned {}",
                response.status()
            )));
        }

        let body: ExecutionStatusBody = response
            .json()
            .await
            .map_err(|e| WorkflowApiError::Status(e.to_string()))?;

        // Still running only while unfinished and not stopped
        let running = !body.finished && body.stopped_at.is_none();
        Ok(!running)
    }
}
