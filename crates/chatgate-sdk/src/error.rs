// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SDK-specific error types.

use chatgate_protocol::{ClientError, FrameError};
use thiserror::Error;

/// Errors that can occur in the SDK.
///
/// Link failures are recoverable by design: an execution context must never
/// crash because the gateway was unreachable.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Configuration error (missing or invalid environment variable)
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection to the gateway failed
    #[error("connection error: {0}")]
    Connection(#[from] ClientError),

    /// Frame codec failure on the link
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The call did not answer within its timeout budget
    #[error("link call timed out after {0}ms")]
    Timeout(u64),

    /// The gateway returned an error response
    #[error("gateway error: {code} - {message}")]
    Gateway {
        /// Error code from the gateway
        code: String,
        /// Error message from the gateway
        message: String,
    },

    /// The gateway answered with an unexpected response variant
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Type alias for SDK results.
pub type Result<T> = std::result::Result<T, SdkError>;
