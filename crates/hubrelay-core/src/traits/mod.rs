// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams of the relay: the chat service capability and the host channel.

pub mod adapter;
pub mod channel;
pub mod chat_api;

pub use adapter::PluginAdapter;
pub use channel::ChannelAdapter;
pub use chat_api::ChatApi;
