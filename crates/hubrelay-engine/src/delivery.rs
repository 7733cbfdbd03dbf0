// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery: chunking, image rerouting, and in-order retry.
//!
//! A job is sent chunk by chunk; chunk n+1 is attempted only after chunk n is
//! acknowledged. An error status resends the same chunk after the retry delay,
//! indefinitely. A failed request with no response ends the job and drops the
//! rest of the text unless `retry_on_transport_error` is set.

use std::sync::Arc;
use std::time::Duration;

use hubrelay_config::model::DeliveryConfig;
use hubrelay_core::error::RelayError;
use hubrelay_core::traits::ChatApi;
use hubrelay_core::types::{Delivery, Notification, RoomId};
use secrecy::SecretString;
use tracing::{debug, error, info, warn};
use url::Url;

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif"];

/// Delivery tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOptions {
    pub chunk_chars: usize,
    pub line_break_window: usize,
    pub retry_delay: Duration,
    pub retry_on_transport_error: bool,
    pub image_color: String,
}

impl DeliveryOptions {
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self {
            chunk_chars: config.chunk_chars,
            line_break_window: config.line_break_window,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            retry_on_transport_error: config.retry_on_transport_error,
            image_color: config.image_color.clone(),
        }
    }
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self::from_config(&DeliveryConfig::default())
    }
}

/// One request's worth of outbound content.
#[derive(Debug, Clone, Copy)]
enum Outbound<'a> {
    Text(&'a str),
    Image(&'a str),
}

/// Sends outbound text to rooms through the chat API.
#[derive(Clone)]
pub struct DeliveryPipeline {
    api: Arc<dyn ChatApi>,
    notification_token: SecretString,
    options: DeliveryOptions,
}

impl DeliveryPipeline {
    /// `notification_token` authenticates image notifications.
    pub fn new(
        api: Arc<dyn ChatApi>,
        notification_token: SecretString,
        options: DeliveryOptions,
    ) -> Self {
        Self {
            api,
            notification_token,
            options,
        }
    }

    pub fn options(&self) -> &DeliveryOptions {
        &self.options
    }

    /// Delivers `text` to `room`.
    ///
    /// A lone image URL goes out as a notification; anything else is split
    /// into chunks. After each acknowledged chunk the remainder is classified
    /// again, so a trailing image URL is sent as an image.
    pub async fn send(&self, room: &RoomId, text: &str) -> Delivery {
        let mut rest = text;
        let mut chunks = 0;

        while !rest.is_empty() {
            let (outbound, tail) = if is_image_url(rest) {
                (Outbound::Image(rest), "")
            } else {
                let (chunk, tail) =
                    split_chunk(rest, self.options.chunk_chars, self.options.line_break_window);
                (Outbound::Text(chunk), tail)
            };

            if let Err(e) = self.deliver(room, outbound).await {
                error!(
                    room = %room,
                    error = %e,
                    sent = chunks,
                    dropped_chars = rest.chars().count(),
                    "error sending message, dropping the rest"
                );
                return Delivery::Dropped { chunks };
            }
            chunks += 1;
            rest = tail;
        }

        debug!(room = %room, chunks, "message delivered");
        Delivery::Delivered { chunks }
    }

    /// Sends `text` as an action.
    pub async fn emote(&self, room: &RoomId, text: &str) -> Delivery {
        self.send(room, &format!("/me {text}")).await
    }

    /// Posts `url` as an inline image notification.
    pub async fn send_image(&self, room: &RoomId, url: &str) -> Result<(), RelayError> {
        self.deliver(room, Outbound::Image(url)).await
    }

    /// One chunk, retried until acknowledged or failed for good.
    async fn deliver(&self, room: &RoomId, outbound: Outbound<'_>) -> Result<(), RelayError> {
        loop {
            let result = match outbound {
                Outbound::Text(chunk) => self.api.post_message(room, chunk).await,
                Outbound::Image(url) => {
                    let notification = image_notification(url, &self.options.image_color);
                    self.api
                        .notify(room, &notification, &self.notification_token)
                        .await
                }
            };

            match result {
                Ok(()) => {
                    if let Outbound::Image(url) = outbound {
                        info!(room = %room, url, "image sent");
                    }
                    return Ok(());
                }
                Err(e) if self.should_retry(&e) => {
                    warn!(
                        room = %room,
                        status = e.status(),
                        error = %e,
                        retry_in_ms = self.options.retry_delay.as_millis() as u64,
                        "send rejected, retrying the same chunk"
                    );
                    tokio::time::sleep(self.options.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn should_retry(&self, e: &RelayError) -> bool {
        e.is_transient() || (self.options.retry_on_transport_error && e.is_transport())
    }
}

/// Whether `text` is exactly one http(s) URL whose path names an image.
pub fn is_image_url(text: &str) -> bool {
    if text.is_empty()
        || text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '<' | '>'))
    {
        return false;
    }
    let Ok(url) = Url::parse(text) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return false;
    }
    let path = url.path().to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// The notification that displays `url` inline.
///
/// The `src` attribute is the parsed, percent-encoded form of `url`, so no
/// caller text can close the attribute early.
pub fn image_notification(url: &str, color: &str) -> Notification {
    let src = match Url::parse(url) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => escape_attribute(url),
    };
    Notification {
        message: format!("<img src=\"{src}\" style=\"height:200px\"/>"),
        color: color.to_string(),
        message_format: "html".to_string(),
        notify: false,
    }
}

fn escape_attribute(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Splits off the next chunk of at most `chunk_chars` characters.
///
/// A full chunk with more text after it is cut at its last newline if that
/// newline sits at character index `chunk_chars - line_break_window` or later.
/// The newline stays at the start of the remainder, so the pieces always
/// concatenate back to `text`.
pub fn split_chunk(text: &str, chunk_chars: usize, line_break_window: usize) -> (&str, &str) {
    // Zero means unbounded.
    if chunk_chars == 0 {
        return (text, "");
    }
    let Some((end, _)) = text.char_indices().nth(chunk_chars) else {
        return (text, "");
    };

    let candidate = &text[..end];
    let earliest = chunk_chars.saturating_sub(line_break_window);
    if let Some(newline) = candidate.rfind('\n') {
        let char_index = candidate[..newline].chars().count();
        if char_index >= earliest && newline > 0 {
            return text.split_at(newline);
        }
    }
    text.split_at(end)
}
