// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hubrelay serve` command implementation.
//!
//! Resolves the credential to a session (fatal on failure), starts one
//! polling loop per configured room, and hands every inbound record to the
//! host loop until SIGINT/SIGTERM or until no room is left running.

use std::sync::Arc;
use std::time::Duration;

use hubrelay_config::RelayConfig;
use hubrelay_core::error::RelayError;
use hubrelay_core::traits::{ChannelAdapter, ChatApi, PluginAdapter};
use hubrelay_core::types::{HealthStatus, InboundRecord};
use hubrelay_engine::Bridge;
use hubrelay_hipchat::HipChatClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::shutdown;

const HEALTH_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the `hubrelay serve` command.
pub async fn run_serve(config: RelayConfig) -> Result<(), RelayError> {
    info!(name = %config.relay.name, "starting hubrelay serve");

    if config.hipchat.rooms.is_empty() {
        return Err(RelayError::Config(
            "hipchat.rooms is empty, there is nothing to watch".into(),
        ));
    }

    let client = HipChatClient::new(&config.hipchat)?;
    info!(
        endpoint = %client.base_url(),
        rooms = config.hipchat.rooms.len(),
        "HipChat client ready"
    );
    let api: Arc<dyn ChatApi> = Arc::new(client);

    let session = api.session().await.inspect_err(|e| {
        error!(error = %e, "could not resolve the API token to a session");
    })?;
    info!(
        owner_id = %session.owner.id,
        owner = %session.owner.name,
        "session established"
    );

    let mut bridge = Bridge::new(api, session, &config);
    bridge.connect().await?;

    let cancel = shutdown::install_signal_handler();
    let result = host_loop(&bridge, cancel, HEALTH_INTERVAL).await;

    bridge.shutdown().await?;
    info!("hubrelay stopped");
    result
}

/// Receives records until `cancel` fires or the channel closes.
///
/// Health is polled every `health_every` and logged when it changes.
pub async fn host_loop<C: ChannelAdapter>(
    channel: &C,
    cancel: CancellationToken,
    health_every: Duration,
) -> Result<(), RelayError> {
    let mut health = tokio::time::interval(health_every);
    health.tick().await;
    let mut last = HealthStatus::Healthy;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = health.tick() => {
                let status = channel.health_check().await?;
                if status != last {
                    log_health(&status);
                    last = status;
                }
            }
            record = channel.receive() => handle_record(&record?),
        }
    }
}

fn handle_record(record: &InboundRecord) {
    info!(
        room = %record.room,
        id = %record.id,
        author = %record.author.name,
        "message received"
    );
    debug!(room = %record.room, id = %record.id, body = %record.body, "message body");
}

fn log_health(status: &HealthStatus) {
    match status {
        HealthStatus::Healthy => info!("relay healthy"),
        HealthStatus::Degraded(reason) => warn!(reason = %reason, "relay degraded"),
        HealthStatus::Unhealthy(reason) => error!(reason = %reason, "relay unhealthy"),
    }
}

/// Installs the global tracing subscriber. `RUST_LOG` overrides `log_level`.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hubrelay={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubrelay_test_utils::{MockChatApi, message};

    fn config(rooms: &[&str]) -> RelayConfig {
        let mut config = RelayConfig::default();
        config.hipchat.api_token = Some("api-token".into());
        config.hipchat.rooms = rooms.iter().map(|r| r.to_string()).collect();
        config
    }

    #[tokio::test]
    async fn serve_needs_rooms() {
        let err = run_serve(config(&[])).await.unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[tokio::test]
    async fn serve_needs_token() {
        let mut config = config(&["ops"]);
        config.hipchat.api_token = None;
        assert!(matches!(
            run_serve(config).await,
            Err(RelayError::Config(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn host_loop_stops_on_cancel() {
        let api = Arc::new(MockChatApi::new());
        api.push_history("ops", vec![message("M1", "7", "anchor")]).await;
        api.push_history(
            "ops",
            vec![message("M1", "7", "anchor"), message("M2", "7", "hi bot")],
        )
        .await;
        let session = api.session().await.unwrap();
        let mut bridge = Bridge::new(api.clone(), session, &config(&["ops"]));
        bridge.connect().await.unwrap();

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        let watcher = api.clone();
        tokio::spawn(async move {
            watcher.wait_for_history_calls("ops", 3).await;
            stopper.cancel();
        });

        host_loop(&bridge, cancel, Duration::from_secs(1)).await.unwrap();
        bridge.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn host_loop_fails_when_every_room_stops() {
        let api = Arc::new(MockChatApi::new());
        api.push_history_result(
            "ops",
            Err(RelayError::Transport {
                message: "connection refused".into(),
                source: None,
            }),
        )
        .await;
        let session = api.session().await.unwrap();
        let mut bridge = Bridge::new(api, session, &config(&["ops"]));
        bridge.connect().await.unwrap();

        let result = host_loop(&bridge, CancellationToken::new(), HEALTH_INTERVAL).await;
        assert!(matches!(result, Err(RelayError::Channel { .. })));
        assert_eq!(bridge.stopped_rooms().len(), 1);
    }
}
