// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Main SDK client for execution contexts talking to the gateway.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use chatgate_protocol::message::{
    ActionParams, BotStatusParams, CredentialsParams, ExecutionParams, LinkRequest, LinkResponse,
    LoginAck, MessageParams, NamedRef, PromptOutcome, PromptParams, TriggerUpsert,
};
use chatgate_protocol::{Frame, LinkClient, LinkClientConfig, MessageType};

use crate::config::SdkConfig;
use crate::error::{Result, SdkError};

/// A message the gateway sent (or finalized) on our behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel_id: String,
    pub message_id: String,
}

/// High-level client for one execution context.
///
/// Execution contexts are short-lived and may start before the gateway
/// process exists: every call retry-connects until its timeout budget runs
/// out, and a timeout means "no answer", never a crash.
///
/// # Example
///
/// ```ignore
/// use chatgate_sdk::{GatewaySdk, SdkConfig};
///
/// let sdk = GatewaySdk::localhost()?;
///
/// match sdk.credentials("bot-token", "client-id").await? {
///     LoginAck::Ready | LoginAck::Already => {}
///     other => return Err(format!("gateway not ready: {:?}", other).into()),
/// }
///
/// let channels = sdk.list_channels().await?;
/// ```
pub struct GatewaySdk {
    client: LinkClient,
    config: SdkConfig,
}

impl GatewaySdk {
    /// Create a new SDK instance with the given configuration.
    pub fn new(config: SdkConfig) -> Result<Self> {
        let client = LinkClient::new(LinkClientConfig {
            gateway_addr: config.gateway_addr,
            server_name: config.server_name.clone(),
            dangerous_skip_cert_verification: config.skip_cert_verification,
            connect_timeout_ms: config.connect_timeout_ms,
            retry_interval_ms: config.retry_interval_ms,
            ..Default::default()
        })?;

        Ok(Self { client, config })
    }

    /// Create an SDK instance from environment variables.
    ///
    /// See [`SdkConfig::from_env`] for the recognized variables.
    pub fn from_env() -> Result<Self> {
        Self::new(SdkConfig::from_env()?)
    }

    /// Create an SDK instance for local development.
    ///
    /// This connects to `127.0.0.1:7201` with TLS verification disabled.
    pub fn localhost() -> Result<Self> {
        Self::new(SdkConfig::localhost())
    }

    // ========== Connection ==========

    /// Check if connected to the gateway.
    pub async fn is_connected(&self) -> bool {
        self.client.is_connected().await
    }

    /// Close the connection to the gateway.
    pub async fn close(&self) {
        self.client.close().await;
    }

    /// One bounded link call: retry-connect, send, await the terminal frame.
    async fn call(&self, request: &LinkRequest, budget_ms: u64) -> Result<LinkResponse> {
        let response = tokio::time::timeout(Duration::from_millis(budget_ms), async {
            self.client.connect_with_retry().await?;
            self.client
                .request::<LinkRequest, LinkResponse>(request)
                .await
        })
        .await
        .map_err(|_| SdkError::Timeout(budget_ms))??;

        match response {
            LinkResponse::Error { code, message } => Err(SdkError::Gateway { code, message }),
            other => Ok(other),
        }
    }

    /// Fire a request without waiting for any response.
    async fn send_only(&self, request: &LinkRequest, budget_ms: u64) -> Result<()> {
        tokio::time::timeout(Duration::from_millis(budget_ms), async {
            self.client.connect_with_retry().await?;
            self.client.send_fire_and_forget(request).await
        })
        .await
        .map_err(|_| SdkError::Timeout(budget_ms))??;
        Ok(())
    }

    // ========== Credentials ==========

    /// Ask the gateway to log in with the given platform credentials.
    ///
    /// The gateway replies `login` as soon as it starts a fresh login and
    /// follows up with the terminal ack once it settles; this call waits for
    /// the terminal ack within the request budget.
    #[instrument(skip(self, token))]
    pub async fn credentials(&self, token: &str, client_id: &str) -> Result<LoginAck> {
        let request = LinkRequest::Credentials(CredentialsParams {
            token: token.to_string(),
            client_id: client_id.to_string(),
        });
        let budget_ms = self.config.request_timeout_ms;

        let ack = tokio::time::timeout(Duration::from_millis(budget_ms), async {
            self.client.connect_with_retry().await?;
            let (mut send, mut recv) = self.client.open_raw_stream().await?;
            chatgate_protocol::frame::write_frame(&mut send, &Frame::request(&request)?).await?;

            loop {
                let frame = chatgate_protocol::frame::read_frame(&mut recv).await?;
                let response: LinkResponse = frame.decode()?;
                match (frame.message_type, response) {
                    (MessageType::StreamData, LinkResponse::Credentials(LoginAck::Login)) => {
                        debug!("login started, awaiting terminal ack");
                        continue;
                    }
                    (_, LinkResponse::Credentials(ack)) => return Ok(ack),
                    (_, LinkResponse::Error { code, message }) => {
                        return Err(SdkError::Gateway { code, message });
                    }
                    (_, other) => {
                        return Err(SdkError::UnexpectedResponse(format!("{:?}", other)));
                    }
                }
            }
        })
        .await
        .map_err(|_| SdkError::Timeout(budget_ms))??;

        Ok(ack)
    }

    // ========== Listings ==========

    /// Ordered list of text channels. A timeout yields an empty list.
    #[instrument(skip(self))]
    pub async fn list_channels(&self) -> Result<Vec<NamedRef>> {
        match self
            .call(&LinkRequest::ListChannels, self.config.list_timeout_ms)
            .await
        {
            Ok(LinkResponse::Channels(channels)) => Ok(channels),
            Ok(other) => Err(SdkError::UnexpectedResponse(format!("{:?}", other))),
            Err(SdkError::Timeout(ms)) => {
                warn!(budget_ms = ms, "list:channels timed out, returning empty list");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Ordered list of roles (the implicit everyone role excluded by the
    /// gateway). A timeout yields an empty list.
    #[instrument(skip(self))]
    pub async fn list_roles(&self) -> Result<Vec<NamedRef>> {
        match self
            .call(&LinkRequest::ListRoles, self.config.list_timeout_ms)
            .await
        {
            Ok(LinkResponse::Roles(roles)) => Ok(roles),
            Ok(other) => Err(SdkError::UnexpectedResponse(format!("{:?}", other))),
            Err(SdkError::Timeout(ms)) => {
                warn!(budget_ms = ms, "list:roles timed out, returning empty list");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    // ========== Sends ==========

    /// Send a message (or finalize the execution's placeholder into one).
    #[instrument(skip(self, params))]
    pub async fn send_message(&self, params: MessageParams) -> Result<SentMessage> {
        let response = self
            .call(
                &LinkRequest::SendMessage(params),
                self.config.request_timeout_ms,
            )
            .await?;
        match response {
            LinkResponse::MessageSent {
                channel_id,
                message_id,
            } => Ok(SentMessage {
                channel_id,
                message_id,
            }),
            other => Err(SdkError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    /// Send an interactive prompt and await its terminal outcome.
    ///
    /// Non-persistent prompts block until answered or timed out, so the link
    /// budget is extended by the prompt timeout.
    #[instrument(skip(self, params), fields(execution_id = %params.execution_id))]
    pub async fn send_prompt(&self, params: PromptParams) -> Result<PromptOutcome> {
        let wait_secs = if params.persistent {
            0
        } else {
            params.timeout_seconds.unwrap_or(60)
        };
        let budget_ms = self.config.request_timeout_ms + wait_secs * 1_000;

        let response = self
            .call(&LinkRequest::SendPrompt(params), budget_ms)
            .await?;
        match response {
            LinkResponse::Prompt(outcome) => Ok(outcome),
            other => Err(SdkError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    /// Perform a platform-side action (bulk delete, role changes).
    /// Returns the channel acted on and the action name.
    #[instrument(skip(self, params))]
    pub async fn send_action(&self, params: ActionParams) -> Result<(String, String)> {
        let response = self
            .call(
                &LinkRequest::SendAction(params),
                self.config.request_timeout_ms,
            )
            .await?;
        match response {
            LinkResponse::ActionDone { channel_id, action } => Ok((channel_id, action)),
            other => Err(SdkError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    // ========== Registration ==========

    /// Register an in-flight execution with the gateway.
    #[instrument(skip(self, params), fields(execution_id = %params.execution_id))]
    pub async fn register_execution(&self, params: ExecutionParams) -> Result<()> {
        let response = self
            .call(
                &LinkRequest::Execution(params),
                self.config.request_timeout_ms,
            )
            .await?;
        match response {
            LinkResponse::Ack(true) => Ok(()),
            other => Err(SdkError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    /// Upsert a trigger definition. Returns whether the gateway accepted it.
    #[instrument(skip(self, upsert), fields(trigger_id = %upsert.trigger.id))]
    pub async fn upsert_trigger(&self, upsert: TriggerUpsert) -> Result<bool> {
        let response = self
            .call(
                &LinkRequest::Trigger(upsert),
                self.config.request_timeout_ms,
            )
            .await?;
        match response {
            LinkResponse::Ack(accepted) => Ok(accepted),
            other => Err(SdkError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    /// Update the bot's presence (fire-and-forget; ignored until the gateway
    /// is Ready).
    #[instrument(skip(self, params))]
    pub async fn set_bot_status(&self, params: BotStatusParams) -> Result<()> {
        self.send_only(
            &LinkRequest::BotStatus(params),
            self.config.request_timeout_ms,
        )
        .await
    }
}
