// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SDK configuration for connecting to the gateway process.

use std::env;
use std::net::SocketAddr;

use crate::error::{Result, SdkError};

/// SDK configuration for connecting to the gateway process.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Gateway link address (default: "127.0.0.1:7201")
    pub gateway_addr: SocketAddr,
    /// Server name for TLS verification (default: "localhost")
    pub server_name: String,
    /// Skip TLS certificate verification (default: false, use true for dev)
    pub skip_cert_verification: bool,
    /// Single connect attempt timeout in milliseconds (default: 5_000)
    pub connect_timeout_ms: u64,
    /// Delay between reconnect attempts while the gateway is absent
    /// (default: 1_500)
    pub retry_interval_ms: u64,
    /// Budget for connection-style calls in milliseconds (default: 15_000)
    pub request_timeout_ms: u64,
    /// Budget for read-only list calls in milliseconds (default: 5_000)
    pub list_timeout_ms: u64,
}

impl SdkConfig {
    /// Load configuration from environment variables.
    ///
    /// # Optional Environment Variables
    /// - `CHATGATE_GATEWAY_ADDR` - Gateway address (default: "127.0.0.1:7201")
    /// - `CHATGATE_SERVER_NAME` - Server name for TLS (default: "localhost")
    /// - `CHATGATE_SKIP_CERT_VERIFICATION` - Skip TLS verification (default: false)
    /// - `CHATGATE_CONNECT_TIMEOUT_MS` - Connect attempt timeout (default: 5000)
    /// - `CHATGATE_RETRY_INTERVAL_MS` - Reconnect delay (default: 1500)
    /// - `CHATGATE_REQUEST_TIMEOUT_MS` - Request budget (default: 15000)
    /// - `CHATGATE_LIST_TIMEOUT_MS` - List-call budget (default: 5000)
    pub fn from_env() -> Result<Self> {
        let gateway_addr = env::var("CHATGATE_GATEWAY_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:7201".to_string())
            .parse()
            .map_err(|e| SdkError::Config(format!("invalid CHATGATE_GATEWAY_ADDR: {}", e)))?;

        let server_name =
            env::var("CHATGATE_SERVER_NAME").unwrap_or_else(|_| "localhost".to_string());

        let skip_cert_verification = env::var("CHATGATE_SKIP_CERT_VERIFICATION")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let connect_timeout_ms = env::var("CHATGATE_CONNECT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5_000);

        let retry_interval_ms = env::var("CHATGATE_RETRY_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1_500);

        let request_timeout_ms = env::var("CHATGATE_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15_000);

        let list_timeout_ms = env::var("CHATGATE_LIST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5_000);

        Ok(Self {
            gateway_addr,
            server_name,
            skip_cert_verification,
            connect_timeout_ms,
            retry_interval_ms,
            request_timeout_ms,
            list_timeout_ms,
        })
    }

    /// Create a configuration for local development.
    ///
    /// Connects to `127.0.0.1:7201` with TLS verification disabled.
    pub fn localhost() -> Self {
        Self {
            gateway_addr: "127.0.0.1:7201".parse().unwrap(),
            server_name: "localhost".to_string(),
            skip_cert_verification: true,
            connect_timeout_ms: 5_000,
            retry_interval_ms: 1_500,
            request_timeout_ms: 15_000,
            list_timeout_ms: 5_000,
        }
    }

    /// Set the gateway address.
    pub fn with_gateway_addr(mut self, addr: SocketAddr) -> Self {
        self.gateway_addr = addr;
        self
    }

    /// Set the server name for TLS verification.
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Skip TLS certificate verification (for development only!).
    pub fn with_skip_cert_verification(mut self, skip: bool) -> Self {
        self.skip_cert_verification = skip;
        self
    }

    /// Set the connection-style call budget.
    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    /// Set the list-call budget.
    pub fn with_list_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.list_timeout_ms = timeout_ms;
        self
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            gateway_addr: "127.0.0.1:7201".parse().unwrap(),
            server_name: "localhost".to_string(),
            skip_cert_verification: false,
            connect_timeout_ms: 5_000,
            retry_interval_ms: 1_500,
            request_timeout_ms: 15_000,
            list_timeout_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localhost_config() {
        let config = SdkConfig::localhost();
        assert_eq!(config.gateway_addr, "127.0.0.1:7201".parse().unwrap());
        assert!(config.skip_cert_verification);
        assert_eq!(config.request_timeout_ms, 15_000);
        assert_eq!(config.list_timeout_ms, 5_000);
    }

    #[test]
    fn test_default_config_verifies_certs() {
        let config = SdkConfig::default();
        assert!(!config.skip_cert_verification);
        assert_eq!(config.retry_interval_ms, 1_500);
    }

    #[test]
    fn test_builder_pattern() {
        let config = SdkConfig::default()
            .with_gateway_addr("192.168.1.1:8000".parse().unwrap())
            .with_skip_cert_verification(true)
            .with_request_timeout_ms(20_000)
            .with_list_timeout_ms(2_000);

        assert_eq!(config.gateway_addr, "192.168.1.1:8000".parse().unwrap());
        assert!(config.skip_cert_verification);
        assert_eq!(config.request_timeout_ms, 20_000);
        assert_eq!(config.list_timeout_ms, 2_000);
    }

    #[test]
    fn test_with_server_name() {
        let config = SdkConfig::default().with_server_name("gateway.internal");
        assert_eq!(config.server_name, "gateway.internal");
    }
}
