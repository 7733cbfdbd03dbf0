// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Hubrelay.
//!
//! Provides a scripted, in-memory chat service so engine tests run fast and
//! deterministically without a network.
//!
//! # Components
//!
//! - [`MockChatApi`] - `ChatApi` with scripted history pages and send outcomes
//! - [`message`] / [`notification`] - history item builders

pub mod mock_chat_api;

pub use mock_chat_api::{MockChatApi, PostAttempt, message, notification, status_error};
