// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Hubrelay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of silently falling back to a default.

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level Hubrelay configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub relay: RelaySection,

    /// Chat service credential, endpoint and rooms.
    #[serde(default)]
    pub hipchat: HipChatConfig,

    /// Adaptive poll scheduler tunables.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Outbound delivery tunables.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    /// Display name used in logs.
    #[serde(default = "default_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Announcement posted to each room once it is being watched.
    /// An empty string disables the announcement.
    #[serde(default = "default_connect_message")]
    pub connect_message: String,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            connect_message: default_connect_message(),
        }
    }
}

fn default_name() -> String {
    "hubrelay".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_connect_message() -> String {
    "Ready!".to_string()
}

/// Chat service connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HipChatConfig {
    /// API credential. Required by `serve`, `send` and `check`.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Base URL of the REST API, with trailing slash.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Optional outbound proxy URL.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Rooms to watch. Accepts a TOML array or a comma-separated string.
    #[serde(default, deserialize_with = "deserialize_rooms")]
    pub rooms: Vec<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for HipChatConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            endpoint: default_endpoint(),
            proxy: None,
            rooms: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.hipchat.com/v2/".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Poll scheduler configuration. Delays are in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollingConfig {
    /// Delay before the second poll of a room.
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: f64,

    /// Floor of the poll delay; used while a room is active.
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: f64,

    /// Ceiling of the poll delay.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,

    /// Multiplier applied to the delay after a poll with no new messages.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Share of the rate budget polling may consume; the rest is left for sends.
    #[serde(default = "default_budget_share")]
    pub budget_share: f64,

    /// How many ideal intervals the delay may reach before it is nudged.
    #[serde(default = "default_nudge_threshold")]
    pub nudge_threshold: f64,

    /// Pause between a room's bootstrap and its first poll.
    #[serde(default = "default_start_delay_secs")]
    pub start_delay_secs: f64,

    /// Pause before retrying a history request that got an error status.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_initial_delay_secs(),
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            backoff_factor: default_backoff_factor(),
            budget_share: default_budget_share(),
            nudge_threshold: default_nudge_threshold(),
            start_delay_secs: default_start_delay_secs(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_initial_delay_secs() -> f64 {
    5.0
}

fn default_min_delay_secs() -> f64 {
    1.0
}

fn default_max_delay_secs() -> f64 {
    10.0
}

fn default_backoff_factor() -> f64 {
    1.5
}

fn default_budget_share() -> f64 {
    0.75
}

fn default_nudge_threshold() -> f64 {
    3.0
}

fn default_start_delay_secs() -> f64 {
    1.0
}

fn default_retry_delay_ms() -> u64 {
    1000
}

/// Outbound delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Maximum characters per sent chunk.
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,

    /// A full chunk is cut at a newline found within this many trailing characters.
    #[serde(default = "default_line_break_window")]
    pub line_break_window: usize,

    /// Pause before resending a chunk that got an error status.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Retry chunks whose request failed without a response, instead of dropping the rest of the message.
    #[serde(default)]
    pub retry_on_transport_error: bool,

    /// Background color of image notifications.
    #[serde(default = "default_image_color")]
    pub image_color: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            chunk_chars: default_chunk_chars(),
            line_break_window: default_line_break_window(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_on_transport_error: false,
            image_color: default_image_color(),
        }
    }
}

fn default_chunk_chars() -> usize {
    1000
}

fn default_line_break_window() -> usize {
    100
}

fn default_image_color() -> String {
    "gray".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoomEntry {
    Number(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoomList {
    Many(Vec<RoomEntry>),
    One(RoomEntry),
}

/// Accepts `["a", "b"]`, `"a, b"`, or a bare numeric id (env values like `123`
/// arrive as integers).
fn deserialize_rooms<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match RoomList::deserialize(deserializer)? {
        RoomList::Many(entries) => entries,
        RoomList::One(entry) => vec![entry],
    };

    let mut rooms = Vec::new();
    for entry in entries {
        match entry {
            RoomEntry::Number(n) => rooms.push(n.to_string()),
            RoomEntry::Text(text) => rooms.extend(
                text.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string),
            ),
        }
    }
    Ok(rooms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooms_accept_comma_separated_string() {
        let config: RelayConfig = toml::from_str(
            r#"
[hipchat]
rooms = "ops, dev ,,release"
"#,
        )
        .unwrap();
        assert_eq!(config.hipchat.rooms, vec!["ops", "dev", "release"]);
    }

    #[test]
    fn rooms_accept_array_with_numbers() {
        let config: RelayConfig = toml::from_str(
            r#"
[hipchat]
rooms = ["ops", 12345]
"#,
        )
        .unwrap();
        assert_eq!(config.hipchat.rooms, vec!["ops", "12345"]);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = RelayConfig::default();
        assert_eq!(config.relay.connect_message, "Ready!");
        assert_eq!(config.hipchat.endpoint, "https://api.hipchat.com/v2/");
        assert_eq!(config.polling.initial_delay_secs, 5.0);
        assert_eq!(config.polling.min_delay_secs, 1.0);
        assert_eq!(config.polling.max_delay_secs, 10.0);
        assert_eq!(config.delivery.chunk_chars, 1000);
        assert_eq!(config.delivery.line_break_window, 100);
        assert!(!config.delivery.retry_on_transport_error);
    }

    #[test]
    fn unknown_delivery_key_is_rejected() {
        let result = toml::from_str::<RelayConfig>(
            r#"
[delivery]
chunk_size = 10
"#,
        );
        assert!(result.is_err());
    }
}
