// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Hubrelay relay.

use thiserror::Error;

/// The error type shared by the chat API capability, the engine, and the host-facing traits.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (missing credential, malformed endpoint or proxy).
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP call itself failed: DNS, connect, TLS, timeout. No response was received.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The server answered with a non-success status code.
    #[error("server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// A response arrived but its body could not be decoded.
    #[error("decode error: {message}")]
    Decode {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The credential could not be resolved to a session.
    #[error("session error: {0}")]
    Session(String),

    /// The room is not managed by this relay.
    #[error("unknown room: {0}")]
    UnknownRoom(String),

    /// Host channel errors (inbound queue closed, adapter not connected).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Whether the failure is a server-reported status worth retrying after a pause.
    ///
    /// Only HTTP statuses >= 400 qualify. Transport and decode failures are not
    /// transient: they never produced a usable response.
    pub fn is_transient(&self) -> bool {
        matches!(self, RelayError::Status { status, .. } if *status >= 400)
    }

    /// The HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RelayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the HTTP call failed before any response arrived.
    pub fn is_transport(&self) -> bool {
        matches!(self, RelayError::Transport { .. })
    }
}
