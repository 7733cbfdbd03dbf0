// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hubrelay send` command implementation.
//!
//! Posts one message through the same delivery pipeline `serve` uses, so
//! chunking, image detection and retry behave identically.

use std::sync::Arc;

use hubrelay_config::RelayConfig;
use hubrelay_core::error::RelayError;
use hubrelay_core::traits::ChatApi;
use hubrelay_core::types::{Delivery, RoomId};
use hubrelay_engine::{DeliveryOptions, DeliveryPipeline};
use hubrelay_hipchat::HipChatClient;
use tracing::info;

/// Runs the `hubrelay send` command.
pub async fn run_send(
    config: &RelayConfig,
    room: &str,
    text: &str,
    emote: bool,
) -> Result<(), RelayError> {
    let api: Arc<dyn ChatApi> = Arc::new(HipChatClient::new(&config.hipchat)?);
    let delivery = deliver(api, config, &RoomId::from(room), text, emote).await?;

    match delivery {
        Delivery::Delivered { chunks } => {
            println!("sent {chunks} chunk(s) to {room}");
            Ok(())
        }
        Delivery::Dropped { chunks } => Err(RelayError::Internal(format!(
            "delivery to {room} aborted after {chunks} chunk(s)"
        ))),
    }
}

/// Resolves the session for its notification token, then delivers `text`.
async fn deliver(
    api: Arc<dyn ChatApi>,
    config: &RelayConfig,
    room: &RoomId,
    text: &str,
    emote: bool,
) -> Result<Delivery, RelayError> {
    let session = api.session().await?;
    let pipeline = DeliveryPipeline::new(
        api,
        session.access_token,
        DeliveryOptions::from_config(&config.delivery),
    );

    info!(room = %room, chars = text.chars().count(), emote, "sending message");
    Ok(if emote {
        pipeline.emote(room, text).await
    } else {
        pipeline.send(room, text).await
    })
}
