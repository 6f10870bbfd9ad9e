// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Link QUIC server for the gateway process.
//!
//! Accepts connections from execution contexts and routes link messages to
//! the handlers. Every failure becomes a link error response; nothing thrown
//! by one stream affects another.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, instrument};

use chatgate_protocol::frame::Frame;
use chatgate_protocol::message::{LinkRequest, LinkResponse, LoginAck};
use chatgate_protocol::server::{ConnectionHandler, StreamHandler};

use crate::error::CoreError;
use crate::handlers::{
    self, CredentialsFlow, HandlerState, handle_bot_status, handle_execution,
    handle_list_channels, handle_list_roles, handle_send_action, handle_send_message,
    handle_send_prompt, handle_trigger,
};

/// Handle a single connection
#[instrument(skip(conn, state), fields(remote = %conn.remote_address()))]
pub async fn handle_connection(conn: ConnectionHandler, state: Arc<HandlerState>) {
    info!("execution context connected");

    conn.run(move |stream: StreamHandler| {
        let state = state.clone();
        async move {
            if let Err(e) = handle_stream(stream, state).await {
                error!("stream error: {}", e);
            }
        }
    })
    .await;

    debug!("execution context connection closed");
}

/// Handle a single stream (one link call)
async fn handle_stream(mut stream: StreamHandler, state: Arc<HandlerState>) -> Result<()> {
    let request_frame = stream.read_frame().await?;
    let request: LinkRequest = request_frame.decode()?;
    let op = request.op_name();

    debug!(%op, "received link request");

    let response = match request {
        LinkRequest::Credentials(params) => {
            match handlers::handle_credentials(&state, params).await {
                CredentialsFlow::Immediate(ack) => LinkResponse::Credentials(ack),
                CredentialsFlow::Started(rx) => {
                    // Non-terminal progress frame while the login runs
                    let progress = LinkResponse::Credentials(LoginAck::Login);
                    stream.write_frame(&Frame::stream_data(&progress)?).await?;

                    let ack = handlers::await_login(&state, rx).await;
                    LinkResponse::Credentials(ack)
                }
            }
        }

        LinkRequest::ListChannels => {
            handle_list_channels(&state).await.unwrap_or_else(|e| error_response(op, e))
        }

        LinkRequest::ListRoles => {
            handle_list_roles(&state).await.unwrap_or_else(|e| error_response(op, e))
        }

        LinkRequest::SendMessage(params) => handle_send_message(&state, params)
            .await
            .unwrap_or_else(|e| error_response(op, e)),

        LinkRequest::SendPrompt(params) => handle_send_prompt(&state, params)
            .await
            .unwrap_or_else(|e| error_response(op, e)),

        LinkRequest::SendAction(params) => handle_send_action(&state, params)
            .await
            .unwrap_or_else(|e| error_response(op, e)),

        LinkRequest::Execution(params) => {
            // Fire-and-forget shape: ack first, then register. The caller
            // may already be gone, so the ack is best-effort.
            let _ = stream
                .write_frame(&Frame::response(&LinkResponse::Ack(true))?)
                .await;
            let _ = stream.finish();
            handle_execution(&state, params).await;
            return Ok(());
        }

        LinkRequest::Trigger(upsert) => LinkResponse::Ack(handle_trigger(&state, upsert).await),

        LinkRequest::BotStatus(params) => {
            // Fire-and-forget shape: ack first, apply after. The caller may
            // never read the ack.
            let _ = stream
                .write_frame(&Frame::response(&LinkResponse::Ack(true))?)
                .await;
            let _ = stream.finish();
            handle_bot_status(&state, params).await;
            return Ok(());
        }
    };

    stream.write_frame(&Frame::response(&response)?).await?;
    stream.finish()?;

    Ok(())
}

/// Map a handler failure onto a link error response.
fn error_response(op: &str, e: anyhow::Error) -> LinkResponse {
    let code = match e.downcast_ref::<CoreError>() {
        Some(core) => core.error_code().to_string(),
        None => format!("{}_ERROR", op.to_uppercase().replace(':', "_")),
    };
    LinkResponse::Error {
        code,
        message: e.to_string(),
    }
}
