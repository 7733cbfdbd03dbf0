// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the HipChat v2 REST API.
//!
//! [`HipChatClient`] implements [`ChatApi`]. It performs exactly one request
//! per call and never retries; the relay engine owns the retry policy and
//! relies on the split between [`RelayError::Status`] (a response arrived)
//! and [`RelayError::Transport`] (none did).

use std::time::Duration;

use async_trait::async_trait;
use hubrelay_config::model::HipChatConfig;
use hubrelay_core::error::RelayError;
use hubrelay_core::traits::ChatApi;
use hubrelay_core::types::{
    HistoryPage, HistoryQuery, Notification, RateTelemetry, RoomId, Session,
};
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use url::Url;

use crate::types::{ApiErrorResponse, HistoryResponse, SendMessageRequest, TokenResponse};

const RATE_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT: &str = "x-ratelimit-limit";
const RATE_RESET: &str = "x-ratelimit-reset";

/// HipChat REST client shared by every room task.
///
/// `reqwest::Client` pools connections internally, so clones are cheap and
/// concurrent calls from several rooms are safe.
#[derive(Debug, Clone)]
pub struct HipChatClient {
    http: reqwest::Client,
    base: Url,
    token: SecretString,
}

impl HipChatClient {
    /// Creates a client from the `[hipchat]` configuration section.
    ///
    /// Requires `api_token`; honours `endpoint`, `proxy` and `request_timeout_secs`.
    pub fn new(config: &HipChatConfig) -> Result<Self, RelayError> {
        let token = config.api_token.as_deref().ok_or_else(|| {
            RelayError::Config("hipchat.api_token is required".into())
        })?;
        if token.trim().is_empty() {
            return Err(RelayError::Config("hipchat.api_token cannot be empty".into()));
        }

        let base = parse_base_url(&config.endpoint)?;

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("hubrelay/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| RelayError::Config(format!("invalid hipchat.proxy `{proxy}`: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let http = builder.build().map_err(|e| RelayError::Transport {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(Self {
            http,
            base,
            token: SecretString::from(token.to_string()),
        })
    }

    /// Base URL all request paths are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Appends percent-encoded path segments to the base URL.
    fn url(&self, segments: &[&str]) -> Result<Url, RelayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| RelayError::Config(format!("endpoint `{}` cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: Url,
        body: &T,
        token: &SecretString,
    ) -> Result<Response, RelayError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await
    }
}

#[async_trait]
impl ChatApi for HipChatClient {
    async fn history(
        &self,
        room: &RoomId,
        query: &HistoryQuery,
    ) -> Result<HistoryPage, RelayError> {
        let mut url = self.url(&["room", room.as_str(), "history", "latest"])?;
        match query {
            HistoryQuery::Latest { max_results } => {
                url.query_pairs_mut()
                    .append_pair("max-results", &max_results.to_string());
            }
            HistoryQuery::NotBefore(id) => {
                url.query_pairs_mut().append_pair("not-before", id.as_str());
            }
        }

        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        let telemetry = parse_rate_telemetry(response.headers());

        let history: HistoryResponse = response.json().await.map_err(|e| RelayError::Decode {
            message: format!("malformed history for room {room}: {e}"),
            source: Some(Box::new(e)),
        })?;

        debug!(room = %room, items = history.items.len(), "history page received");

        Ok(HistoryPage {
            items: history
                .items
                .into_iter()
                .map(|item| item.into_message(room))
                .collect(),
            telemetry,
        })
    }

    async fn post_message(&self, room: &RoomId, message: &str) -> Result<(), RelayError> {
        let url = self.url(&["room", room.as_str(), "message"])?;
        self.post_json(url, &SendMessageRequest { message }, &self.token)
            .await?;
        debug!(room = %room, chars = message.chars().count(), "message posted");
        Ok(())
    }

    async fn notify(
        &self,
        room: &RoomId,
        notification: &Notification,
        token: &SecretString,
    ) -> Result<(), RelayError> {
        let url = self.url(&["room", room.as_str(), "notification"])?;
        self.post_json(url, notification, token).await?;
        debug!(room = %room, "notification posted");
        Ok(())
    }

    async fn session(&self) -> Result<Session, RelayError> {
        let url = self.url(&["oauth", "token", self.token.expose_secret()])?;
        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Session(format!(
                "expected status 200 from token lookup, got {status}: {}",
                error_message(&body)
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Session(format!("malformed token lookup response: {e}")))?;

        Ok(Session {
            owner: token.owner.into(),
            access_token: SecretString::from(token.access_token),
        })
    }
}

/// Parses the endpoint, making sure it ends with `/` so paths append to it.
fn parse_base_url(endpoint: &str) -> Result<Url, RelayError> {
    let mut endpoint = endpoint.trim().to_string();
    if !endpoint.ends_with('/') {
        endpoint.push('/');
    }
    let url = Url::parse(&endpoint)
        .map_err(|e| RelayError::Config(format!("invalid hipchat.endpoint `{endpoint}`: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(RelayError::Config(format!(
            "hipchat.endpoint `{endpoint}` cannot be a base URL"
        )));
    }
    Ok(url)
}

fn transport_error(e: reqwest::Error) -> RelayError {
    RelayError::Transport {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Passes successful responses through and turns everything else into [`RelayError::Status`].
async fn check_status(response: Response) -> Result<Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    warn!(status = status.as_u16(), error = %message, "HipChat API returned an error status");
    Err(RelayError::Status {
        status: status.as_u16(),
        message,
    })
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => match api_err.error.type_ {
            Some(kind) => format!("{} ({kind})", api_err.error.message),
            None => api_err.error.message,
        },
        Err(_) if body.is_empty() => "no response body".to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

/// Reads the `x-ratelimit-*` headers. All three must be present and numeric.
pub fn parse_rate_telemetry(headers: &HeaderMap) -> Option<RateTelemetry> {
    fn header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
        headers.get(name)?.to_str().ok()?.trim().parse().ok()
    }

    Some(RateTelemetry {
        remaining: header(headers, RATE_REMAINING)?,
        limit: header(headers, RATE_LIMIT)?,
        reset_at: header(headers, RATE_RESET)?,
    })
}
