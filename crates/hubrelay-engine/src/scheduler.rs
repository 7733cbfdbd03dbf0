// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adaptive poll pacing.
//!
//! Two pure heuristics decide how long a room waits between fetches:
//!
//! - [`activity_delay`]: any new message drops the delay to the floor; a
//!   quiet poll multiplies it by the back-off factor, up to the ceiling.
//! - [`rate_nudge`]: from the server's rate telemetry, the ideal interval is
//!   `window / (remaining * budget_share)`. A delay more than
//!   `nudge_threshold` ideal intervals long is doubled.
//!
//! [`next_delay`] chains both and clamps the result to `[floor, ceiling]`.
//! [`RoomPoller`] owns one room's scheduler state and drives the fetcher.

use std::time::Duration;

use hubrelay_config::model::PollingConfig;
use hubrelay_core::error::RelayError;
use hubrelay_core::types::{Message, MessageId, RateTelemetry, RoomId};
use tracing::{debug, info};

use crate::cursor::RoomCursor;
use crate::fetcher::HistoryFetcher;

/// Scheduler tunables, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub initial: f64,
    pub floor: f64,
    pub ceiling: f64,
    pub backoff_factor: f64,
    pub budget_share: f64,
    pub nudge_threshold: f64,
    pub start_delay: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &PollingConfig) -> Self {
        Self {
            initial: config.initial_delay_secs,
            floor: config.min_delay_secs,
            ceiling: config.max_delay_secs,
            backoff_factor: config.backoff_factor,
            budget_share: config.budget_share,
            nudge_threshold: config.nudge_threshold,
            start_delay: Duration::from_secs_f64(config.start_delay_secs),
        }
    }

    pub fn clamp(&self, delay: f64) -> f64 {
        delay.clamp(self.floor, self.ceiling)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

/// Delay after a poll that returned `new_messages` messages.
pub fn activity_delay(previous: f64, new_messages: usize, policy: &PollPolicy) -> f64 {
    if new_messages > 0 {
        return policy.floor;
    }
    (policy.clamp(previous) * policy.backoff_factor).min(policy.ceiling)
}

/// Seconds per call that would spend `budget_share` of the remaining calls
/// evenly over the rest of the window.
///
/// `None` when there is nothing to spread: no calls left or the window is
/// already over.
pub fn ideal_interval(telemetry: &RateTelemetry, now: i64, budget_share: f64) -> Option<f64> {
    let window = telemetry.window_secs(now);
    if telemetry.remaining == 0 || window <= 0 {
        return None;
    }
    Some(window as f64 / (telemetry.remaining as f64 * budget_share))
}

/// Doubles `delay` when it exceeds `nudge_threshold` ideal intervals.
pub fn rate_nudge(
    delay: f64,
    telemetry: Option<&RateTelemetry>,
    now: i64,
    policy: &PollPolicy,
) -> f64 {
    let Some(ideal) = telemetry.and_then(|t| ideal_interval(t, now, policy.budget_share)) else {
        return delay;
    };
    if delay > ideal * policy.nudge_threshold {
        debug!(ideal_secs = ideal, delay_secs = delay, nudged_secs = delay * 2.0, "nudging poll delay");
        delay * 2.0
    } else {
        delay
    }
}

/// The full delay computation for one cycle, clamped to `[floor, ceiling]`.
pub fn next_delay(
    previous: f64,
    new_messages: usize,
    telemetry: Option<&RateTelemetry>,
    now: i64,
    policy: &PollPolicy,
) -> f64 {
    let delay = activity_delay(previous, new_messages, policy);
    policy.clamp(rate_nudge(delay, telemetry, now, policy))
}

/// Lifecycle of a room loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Bootstrapping,
    Polling,
}

/// One room's scheduler state.
#[derive(Debug, Clone)]
pub struct SchedulerState {
    pub phase: RoomPhase,
    pub delay_secs: f64,
    /// Most recently observed telemetry; kept when a response carries none.
    pub telemetry: Option<RateTelemetry>,
}

impl SchedulerState {
    pub fn new(policy: &PollPolicy) -> Self {
        Self {
            phase: RoomPhase::Bootstrapping,
            delay_secs: policy.initial,
            telemetry: None,
        }
    }

    /// Folds one fetch into the state and returns the wait before the next.
    pub fn record(
        &mut self,
        new_messages: usize,
        telemetry: Option<RateTelemetry>,
        now: i64,
        policy: &PollPolicy,
    ) -> Duration {
        if telemetry.is_some() {
            self.telemetry = telemetry;
        }
        self.delay_secs = next_delay(
            self.delay_secs,
            new_messages,
            self.telemetry.as_ref(),
            now,
            policy,
        );
        Duration::from_secs_f64(self.delay_secs)
    }
}

/// Drives one room: bootstrap once, then fetch and compute the next wait.
///
/// Sleeping is left to the caller so it can race the wait against shutdown.
pub struct RoomPoller {
    cursor: RoomCursor,
    fetcher: HistoryFetcher,
    policy: PollPolicy,
    state: SchedulerState,
}

/// Result of one poll cycle.
#[derive(Debug)]
pub struct PollCycle {
    pub messages: Vec<Message>,
    pub next_delay: Duration,
}

impl RoomPoller {
    pub fn new(cursor: RoomCursor, fetcher: HistoryFetcher, policy: PollPolicy) -> Self {
        let state = SchedulerState::new(&policy);
        Self {
            cursor,
            fetcher,
            policy,
            state,
        }
    }

    pub fn room(&self) -> &RoomId {
        self.cursor.room()
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Anchors the cursor and moves to [`RoomPhase::Polling`].
    pub async fn bootstrap(&mut self) -> Result<Option<MessageId>, RelayError> {
        let anchored = self.fetcher.initialize(&self.cursor).await?;
        self.state.phase = RoomPhase::Polling;
        info!(
            room = %self.room(),
            cursor = anchored.as_ref().map(MessageId::as_str).unwrap_or("<unset>"),
            "room bootstrapped"
        );
        Ok(anchored)
    }

    /// Fetches once and computes the delay before the next cycle.
    pub async fn poll_once(&mut self) -> Result<PollCycle, RelayError> {
        let fetched = self.fetcher.fetch_since(&self.cursor).await?;
        let now = chrono::Utc::now().timestamp();
        let next_delay = self
            .state
            .record(fetched.messages.len(), fetched.telemetry, now, &self.policy);
        debug!(
            room = %self.room(),
            count = fetched.messages.len(),
            delay_secs = self.state.delay_secs,
            "poll cycle complete"
        );
        Ok(PollCycle {
            messages: fetched.messages,
            next_delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NOW: i64 = 1_700_000_000;

    fn policy() -> PollPolicy {
        PollPolicy::default()
    }

    fn telemetry(remaining: u64, window: i64) -> RateTelemetry {
        RateTelemetry {
            remaining,
            limit: 100,
            reset_at: NOW + window,
        }
    }

    #[test]
    fn quiet_poll_backs_off() {
        assert_eq!(activity_delay(5.0, 0, &policy()), 7.5);
        assert_eq!(activity_delay(8.0, 0, &policy()), 10.0);
        assert_eq!(activity_delay(10.0, 0, &policy()), 10.0);
    }

    #[test]
    fn activity_resets_to_floor() {
        assert_eq!(activity_delay(7.5, 1, &policy()), 1.0);
        assert_eq!(activity_delay(10.0, 30, &policy()), 1.0);
    }

    #[test]
    fn previous_delay_is_clamped_first() {
        assert_eq!(activity_delay(0.1, 0, &policy()), 1.5);
        assert_eq!(activity_delay(50.0, 0, &policy()), 10.0);
    }

    #[test]
    fn ideal_interval_spreads_budget() {
        // 300s window, 100 calls, 75% of them for polling: 4s per call.
        assert_eq!(ideal_interval(&telemetry(100, 300), NOW, 0.75), Some(4.0));
        assert_eq!(ideal_interval(&telemetry(0, 300), NOW, 0.75), None);
        assert_eq!(ideal_interval(&telemetry(10, 0), NOW, 0.75), None);
        assert_eq!(ideal_interval(&telemetry(10, -5), NOW, 0.75), None);
    }

    #[test]
    fn nudge_doubles_far_over_ideal() {
        // ideal = 60 / (100 * 0.75) = 0.8s; 3x = 2.4s
        let t = telemetry(100, 60);
        assert_eq!(rate_nudge(3.0, Some(&t), NOW, &policy()), 6.0);
        assert_eq!(rate_nudge(2.0, Some(&t), NOW, &policy()), 2.0);
    }

    #[test]
    fn nudge_skipped_without_usable_telemetry() {
        assert_eq!(rate_nudge(9.0, None, NOW, &policy()), 9.0);
        assert_eq!(rate_nudge(9.0, Some(&telemetry(0, 60)), NOW, &policy()), 9.0);
        assert_eq!(rate_nudge(9.0, Some(&telemetry(100, -1)), NOW, &policy()), 9.0);
    }

    #[test]
    fn next_delay_clamps_nudged_value() {
        let t = telemetry(100, 60);
        // 7.5 * 1.5 = 10 (capped), nudged to 20, clamped back to 10.
        assert_eq!(next_delay(7.5, 0, Some(&t), NOW, &policy()), 10.0);
    }

    #[test]
    fn state_keeps_last_telemetry() {
        let policy = policy();
        let mut state = SchedulerState::new(&policy);
        assert_eq!(state.phase, RoomPhase::Bootstrapping);
        assert_eq!(state.delay_secs, 5.0);

        let wait = state.record(0, Some(telemetry(100, 600)), NOW, &policy);
        assert_eq!(wait, Duration::from_secs_f64(7.5));
        state.record(0, None, NOW, &policy);
        assert_eq!(state.telemetry, Some(telemetry(100, 600)));
        assert_eq!(state.delay_secs, 10.0);

        let wait = state.record(2, None, NOW, &policy);
        assert_eq!(wait, Duration::from_secs(1));
    }

    #[test]
    fn policy_reads_config() {
        let config = PollingConfig {
            min_delay_secs: 2.0,
            max_delay_secs: 30.0,
            start_delay_secs: 0.5,
            ..PollingConfig::default()
        };
        let policy = PollPolicy::from_config(&config);
        assert_eq!(policy.floor, 2.0);
        assert_eq!(policy.ceiling, 30.0);
        assert_eq!(policy.start_delay, Duration::from_millis(500));
    }

    proptest! {
        #[test]
        fn delay_stays_within_bounds(
            previous in 0.0f64..100.0,
            new_messages in 0usize..50,
            remaining in 0u64..10_000,
            window in -100i64..3_600,
            with_telemetry in any::<bool>(),
        ) {
            let policy = policy();
            let t = telemetry(remaining, window);
            let delay = next_delay(
                previous,
                new_messages,
                with_telemetry.then_some(&t),
                NOW,
                &policy,
            );
            prop_assert!(delay >= policy.floor);
            prop_assert!(delay <= policy.ceiling);
        }
    }
}
