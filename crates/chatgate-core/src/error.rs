// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for chatgate-core.
//!
//! Provides a unified error type that maps to link error responses.

use std::fmt;

/// Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur during link request processing.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CoreError {
    /// The gateway is not logged in to the platform yet.
    NotReady,

    /// A channel could not be resolved or is not text-capable.
    ChannelNotFound {
        /// The channel id that could not be resolved.
        channel_id: String,
    },

    /// No registered execution matches the given id.
    ExecutionNotFound {
        /// The execution id that was not found.
        execution_id: String,
    },

    /// A platform call (send, edit, delete, fetch) failed.
    PlatformCall {
        /// The operation that failed.
        operation: String,
        /// The reason reported by the platform client.
        reason: String,
    },

    /// Input validation failed.
    ValidationError {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// Downstream delivery to the workflow engine failed.
    DeliveryFailed {
        /// The webhook id of the trigger being delivered.
        webhook_id: String,
        /// The reason for failure.
        reason: String,
    },
}

impl CoreError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotReady => "NOT_READY",
            Self::ChannelNotFound { .. } => "CHANNEL_NOT_FOUND",
            Self::ExecutionNotFound { .. } => "EXECUTION_NOT_FOUND",
            Self::PlatformCall { .. } => "PLATFORM_CALL_FAILED",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::DeliveryFailed { .. } => "DELIVERY_FAILED",
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => {
                write!(f, "Gateway is not logged in to the platform")
            }
            Self::ChannelNotFound { channel_id } => {
                write!(f, "Channel '{}' not found or not text-capable", channel_id)
            }
            Self::ExecutionNotFound { execution_id } => {
                write!(f, "Execution '{}' is not registered", execution_id)
            }
            Self::PlatformCall { operation, reason } => {
                write!(f, "Platform call '{}' failed: {}", operation, reason)
            }
            Self::ValidationError { field, message } => {
                write!(f, "Validation error for '{}': {}", field, message)
            }
            Self::DeliveryFailed { webhook_id, reason } => {
                write!(
                    f,
                    "Failed to deliver trigger '{}' downstream: {}",
                    webhook_id, reason
                )
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<crate::chat::ChatError> for CoreError {
    fn from(err: crate::chat::ChatError) -> Self {
        CoreError::PlatformCall {
            operation: err.operation.clone(),
            reason: err.reason,
        }
    }
}
