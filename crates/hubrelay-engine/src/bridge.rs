// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host-facing channel adapter tying the engine together.
//!
//! [`Bridge::connect`] spawns one task per room. Each task bootstraps its
//! cursor, posts the connect message, then polls until shutdown or a fatal
//! error. Messages written by the relay's own account and notifications are
//! filtered out; the rest reach the host through [`ChannelAdapter::receive`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use hubrelay_config::RelayConfig;
use hubrelay_core::error::RelayError;
use hubrelay_core::traits::{ChannelAdapter, ChatApi, PluginAdapter};
use hubrelay_core::types::{
    ChannelCapabilities, Delivery, Envelope, HealthStatus, InboundRecord, Message, MessageKind,
    RoomId, Session, SessionOwner,
};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cursor::CursorStore;
use crate::delivery::{DeliveryOptions, DeliveryPipeline};
use crate::fetcher::HistoryFetcher;
use crate::scheduler::{PollPolicy, RoomPoller};

const INBOUND_CAPACITY: usize = 100;

/// The relay as seen by the host bot.
pub struct Bridge {
    name: String,
    owner: SessionOwner,
    rooms: Vec<RoomId>,
    cursors: CursorStore,
    fetcher: HistoryFetcher,
    delivery: DeliveryPipeline,
    policy: PollPolicy,
    connect_message: String,
    inbound_tx: Option<mpsc::Sender<InboundRecord>>,
    inbound_rx: Mutex<mpsc::Receiver<InboundRecord>>,
    stopped: Arc<DashMap<RoomId, String>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Bridge {
    /// Builds a bridge for the rooms in `config`, acting as `session`'s owner.
    pub fn new(api: Arc<dyn ChatApi>, session: Session, config: &RelayConfig) -> Self {
        let rooms: Vec<RoomId> = config
            .hipchat
            .rooms
            .iter()
            .map(|room| RoomId::from(room.as_str()))
            .collect();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);

        Self {
            name: config.relay.name.clone(),
            owner: session.owner,
            cursors: CursorStore::new(rooms.iter().cloned()),
            rooms,
            fetcher: HistoryFetcher::new(
                api.clone(),
                Duration::from_millis(config.polling.retry_delay_ms),
            ),
            delivery: DeliveryPipeline::new(
                api,
                session.access_token,
                DeliveryOptions::from_config(&config.delivery),
            ),
            policy: PollPolicy::from_config(&config.polling),
            connect_message: config.relay.connect_message.clone(),
            inbound_tx: Some(inbound_tx),
            inbound_rx: Mutex::new(inbound_rx),
            stopped: Arc::new(DashMap::new()),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Rooms watched by this bridge, in configuration order.
    pub fn rooms(&self) -> &[RoomId] {
        &self.rooms
    }

    pub fn owner(&self) -> &SessionOwner {
        &self.owner
    }

    pub fn cursors(&self) -> &CursorStore {
        &self.cursors
    }

    /// Token that stops every room loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Rooms whose loop ended with an error, with the error text.
    pub fn stopped_rooms(&self) -> Vec<(RoomId, String)> {
        let mut stopped: Vec<(RoomId, String)> = self
            .stopped
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        stopped.sort();
        stopped
    }

    /// Waits for every room task to finish.
    pub async fn join(&self) {
        let handles: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "room task panicked");
            }
        }
    }
}

/// Whether a fetched message should reach the host.
pub fn admit(message: Message, owner_id: &str) -> Option<InboundRecord> {
    if message.kind == MessageKind::Notification {
        return None;
    }
    if message.author.id.as_deref() == Some(owner_id) {
        return None;
    }
    Some(InboundRecord::from(message))
}

/// `text` addressed to the envelope's author when it has a mention name.
pub fn addressed(envelope: &Envelope, text: &str) -> String {
    match envelope
        .user
        .as_ref()
        .and_then(|user| user.mention_name.as_deref())
    {
        Some(mention) if !mention.is_empty() => format!("@{mention} {text}"),
        _ => text.to_string(),
    }
}

/// Everything one room's loop needs; owned by the room's task.
struct RoomTask {
    poller: RoomPoller,
    delivery: DeliveryPipeline,
    owner_id: String,
    connect_message: String,
    start_delay: Duration,
    tx: mpsc::Sender<InboundRecord>,
    cancel: CancellationToken,
}

impl RoomTask {
    async fn run(&mut self) -> Result<(), RelayError> {
        let room = self.poller.room().clone();

        tokio::select! {
            _ = self.cancel.cancelled() => return Ok(()),
            result = self.poller.bootstrap() => { result?; }
        }

        if !self.connect_message.is_empty() {
            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                delivery = self.delivery.send(&room, &self.connect_message) => {
                    if !delivery.is_delivered() {
                        warn!(room = %room, "connect message was not delivered");
                    }
                }
            }
        }

        tokio::select! {
            _ = self.cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(self.start_delay) => {}
        }

        loop {
            let cycle = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                result = self.poller.poll_once() => result?,
            };

            for message in cycle.messages {
                let Some(record) = admit(message, &self.owner_id) else {
                    continue;
                };
                let sent = tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(()),
                    sent = self.tx.send(record) => sent,
                };
                if sent.is_err() {
                    debug!(room = %room, "inbound queue closed, stopping room loop");
                    return Ok(());
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(cycle.next_delay) => {}
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for Bridge {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        if self.cancel.is_cancelled() {
            return Ok(HealthStatus::Unhealthy("relay is shut down".into()));
        }
        if self.inbound_tx.is_some() && !self.rooms.is_empty() {
            return Ok(HealthStatus::Unhealthy("relay is not connected".into()));
        }

        let stopped = self.stopped_rooms();
        if stopped.is_empty() {
            return Ok(HealthStatus::Healthy);
        }
        let names: Vec<&str> = stopped.iter().map(|(room, _)| room.as_str()).collect();
        if stopped.len() == self.rooms.len() {
            Ok(HealthStatus::Unhealthy(format!(
                "every room loop stopped: {}",
                names.join(", ")
            )))
        } else {
            Ok(HealthStatus::Degraded(format!(
                "room loops stopped: {}",
                names.join(", ")
            )))
        }
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        info!("relay shutting down");
        self.cancel.cancel();
        self.join().await;
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for Bridge {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_images: true,
            supports_emote: true,
            max_message_length: None,
        }
    }

    async fn connect(&mut self) -> Result<(), RelayError> {
        let Some(tx) = self.inbound_tx.take() else {
            return Ok(()); // Already connected
        };

        let mut tasks = self.tasks.lock().await;
        for room in &self.rooms {
            let task = RoomTask {
                poller: RoomPoller::new(
                    self.cursors.handle(room)?,
                    self.fetcher.clone(),
                    self.policy,
                ),
                delivery: self.delivery.clone(),
                owner_id: self.owner.id.clone(),
                connect_message: self.connect_message.clone(),
                start_delay: self.policy.start_delay,
                tx: tx.clone(),
                cancel: self.cancel.child_token(),
            };
            let stopped = Arc::clone(&self.stopped);
            let room = room.clone();

            info!(room = %room, "watching room");
            tasks.push(tokio::spawn(async move {
                let mut task = task;
                if let Err(e) = task.run().await {
                    error!(room = %room, error = %e, "room loop stopped");
                    stopped.insert(room, e.to_string());
                }
                // The inbound sender goes last so a closed queue implies a recorded stop.
                drop(task);
            }));
        }
        Ok(())
    }

    async fn send(&self, envelope: &Envelope, text: &str) -> Result<Delivery, RelayError> {
        Ok(self.delivery.send(&envelope.room, text).await)
    }

    async fn emote(&self, envelope: &Envelope, text: &str) -> Result<Delivery, RelayError> {
        Ok(self.delivery.emote(&envelope.room, text).await)
    }

    async fn reply(&self, envelope: &Envelope, text: &str) -> Result<Delivery, RelayError> {
        Ok(self
            .delivery
            .send(&envelope.room, &addressed(envelope, text))
            .await)
    }

    async fn receive(&self) -> Result<InboundRecord, RelayError> {
        self.inbound_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| RelayError::Channel {
                message: "every room loop has stopped".into(),
                source: None,
            })
    }
}
