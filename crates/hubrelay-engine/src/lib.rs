// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay engine for Hubrelay.
//!
//! Components, leaves first:
//!
//! - [`cursor`]: per-room id of the newest delivered message
//! - [`fetcher`]: reads history strictly after the cursor and advances it
//! - [`scheduler`]: adaptive per-room poll pacing from activity and rate telemetry
//! - [`delivery`]: chunked, in-order outbound sends with retry
//! - [`bridge`]: the host-facing [`ChannelAdapter`](hubrelay_core::ChannelAdapter)

pub mod bridge;
pub mod cursor;
pub mod delivery;
pub mod fetcher;
pub mod scheduler;

pub use bridge::Bridge;
pub use cursor::{CursorStore, RoomCursor};
pub use delivery::{DeliveryOptions, DeliveryPipeline};
pub use fetcher::{Fetched, HistoryFetcher};
pub use scheduler::{PollPolicy, RoomPhase, RoomPoller};
