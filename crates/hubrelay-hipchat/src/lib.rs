// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HipChat v2 REST client for the Hubrelay engine.
//!
//! [`HipChatClient`] implements [`hubrelay_core::ChatApi`] over the four calls
//! the relay needs: room history, room message, room notification and the
//! token lookup that resolves the relay's own identity.

pub mod client;
pub mod types;

pub use client::{HipChatClient, parse_rate_telemetry};
