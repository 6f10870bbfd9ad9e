// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::net::SocketAddr;

/// Gateway process configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// QUIC address the link server binds to
    pub quic_addr: SocketAddr,
    /// Deliver trigger events to the engine's test webhook path
    pub test_mode: bool,
    /// Capacity of the platform-event queue between adapter and router
    pub event_buffer: usize,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `CHATGATE_QUIC_PORT`: link server port (default: 7201)
    /// - `CHATGATE_TEST_MODE`: deliver to the test webhook path (default: false)
    /// - `CHATGATE_EVENT_BUFFER`: platform-event queue capacity (default: 256)
    pub fn from_env() -> Result<Self, ConfigError> {
        let quic_port: u16 = std::env::var("CHATGATE_QUIC_PORT")
            .unwrap_or_else(|_| "7201".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("CHATGATE_QUIC_PORT", "must be a valid port number")
            })?;

        let test_mode = std::env::var("CHATGATE_TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let event_buffer: usize = std::env::var("CHATGATE_EVENT_BUFFER")
            .unwrap_or_else(|_| "256".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("CHATGATE_EVENT_BUFFER", "must be a positive integer")
            })?;
        if event_buffer == 0 {
            return Err(ConfigError::Invalid(
                "CHATGATE_EVENT_BUFFER",
                "must be a positive integer",
            ));
        }

        Ok(Self {
            quic_addr: SocketAddr::from(([127, 0, 0, 1], quic_port)),
            test_mode,
            event_buffer,
        })
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            quic_addr: "127.0.0.1:7201".parse().unwrap(),
            test_mode: false,
            event_buffer: 256,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
