// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host-facing channel trait: inbound records in, outbound text out.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelCapabilities, Delivery, Envelope, InboundRecord};

/// What the host bot pipeline sees of the relay.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Returns the capabilities supported by this channel.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Starts watching every configured room.
    async fn connect(&mut self) -> Result<(), RelayError>;

    /// Sends text to the envelope's room.
    async fn send(&self, envelope: &Envelope, text: &str) -> Result<Delivery, RelayError>;

    /// Sends text as an action ("/me ...").
    async fn emote(&self, envelope: &Envelope, text: &str) -> Result<Delivery, RelayError>;

    /// Sends text addressed to the envelope's user.
    async fn reply(&self, envelope: &Envelope, text: &str) -> Result<Delivery, RelayError>;

    /// Receives the next inbound record from any room.
    async fn receive(&self) -> Result<InboundRecord, RelayError>;
}
