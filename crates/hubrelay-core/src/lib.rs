// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Hubrelay.
//!
//! Holds the error type, the domain types that flow between the chat service,
//! the relay engine and the host bot, and the two trait seams: [`ChatApi`]
//! (what the engine needs from the chat service) and [`ChannelAdapter`]
//! (what the host needs from the relay).

pub mod error;
pub mod traits;
pub mod types;

pub use error::RelayError;
pub use types::{
    Author, Delivery, Envelope, HealthStatus, HistoryPage, HistoryQuery, InboundRecord, Message,
    MessageId, MessageKind, RateTelemetry, RoomId, Session, SessionOwner,
};

pub use traits::{ChannelAdapter, ChatApi, PluginAdapter};
