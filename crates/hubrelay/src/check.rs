// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hubrelay check` command implementation.

use hubrelay_config::RelayConfig;
use hubrelay_core::error::RelayError;
use hubrelay_core::traits::ChatApi;
use hubrelay_hipchat::HipChatClient;

/// Resolves the configured token and prints what the relay would do with it.
pub async fn run_check(config: &RelayConfig) -> Result<(), RelayError> {
    let client = HipChatClient::new(&config.hipchat)?;
    let session = client.session().await?;

    println!("endpoint: {}", client.base_url());
    println!("owner:    {} (id {})", session.owner.name, session.owner.id);
    if config.hipchat.rooms.is_empty() {
        println!("rooms:    none configured");
    } else {
        println!("rooms:    {}", config.hipchat.rooms.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: String) -> RelayConfig {
        let mut config = RelayConfig::default();
        config.hipchat.api_token = Some("api-token".into());
        config.hipchat.endpoint = endpoint;
        config
    }

    #[tokio::test]
    async fn check_succeeds_for_valid_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/token/api-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "session-token",
                "owner": {"id": 5, "name": "Relay Bot"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        run_check(&config(server.uri())).await.unwrap();
    }

    #[tokio::test]
    async fn check_fails_for_rejected_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/token/api-token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = run_check(&config(server.uri())).await.unwrap_err();
        assert!(matches!(err, RelayError::Session(_)));
    }
}
