// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::RelayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration, collecting every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.relay.log_level.as_str()) {
        fail(format!(
            "relay.log_level `{}` must be one of {}",
            config.relay.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let endpoint = config.hipchat.endpoint.trim();
    if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
        fail(format!(
            "hipchat.endpoint `{endpoint}` must be an http:// or https:// URL"
        ));
    }

    if let Some(proxy) = &config.hipchat.proxy
        && !proxy.contains("://")
    {
        fail(format!("hipchat.proxy `{proxy}` must include a scheme"));
    }

    if config.hipchat.request_timeout_secs == 0 {
        fail("hipchat.request_timeout_secs must be at least 1".to_string());
    }

    let mut seen = HashSet::new();
    for room in &config.hipchat.rooms {
        if !seen.insert(room) {
            fail(format!("room `{room}` is listed more than once in hipchat.rooms"));
        }
    }

    let polling = &config.polling;
    for (key, value) in [
        ("initial_delay_secs", polling.initial_delay_secs),
        ("min_delay_secs", polling.min_delay_secs),
        ("max_delay_secs", polling.max_delay_secs),
        ("start_delay_secs", polling.start_delay_secs),
        ("backoff_factor", polling.backoff_factor),
        ("budget_share", polling.budget_share),
        ("nudge_threshold", polling.nudge_threshold),
    ] {
        if !value.is_finite() {
            fail(format!("polling.{key} must be a finite number, got {value}"));
        }
    }
    if polling.initial_delay_secs < 0.0 {
        fail(format!(
            "polling.initial_delay_secs must not be negative, got {}",
            polling.initial_delay_secs
        ));
    }
    if !(polling.min_delay_secs > 0.0) {
        fail(format!(
            "polling.min_delay_secs must be positive, got {}",
            polling.min_delay_secs
        ));
    }
    if polling.max_delay_secs < polling.min_delay_secs {
        fail(format!(
            "polling.max_delay_secs ({}) must not be below polling.min_delay_secs ({})",
            polling.max_delay_secs, polling.min_delay_secs
        ));
    }
    if polling.backoff_factor < 1.0 {
        fail(format!(
            "polling.backoff_factor must be at least 1.0, got {}",
            polling.backoff_factor
        ));
    }
    if !(polling.budget_share > 0.0 && polling.budget_share <= 1.0) {
        fail(format!(
            "polling.budget_share must be in (0, 1], got {}",
            polling.budget_share
        ));
    }
    if !(polling.nudge_threshold > 0.0) {
        fail(format!(
            "polling.nudge_threshold must be positive, got {}",
            polling.nudge_threshold
        ));
    }
    if polling.start_delay_secs < 0.0 {
        fail(format!(
            "polling.start_delay_secs must not be negative, got {}",
            polling.start_delay_secs
        ));
    }

    let delivery = &config.delivery;
    if delivery.chunk_chars == 0 {
        fail("delivery.chunk_chars must be at least 1".to_string());
    }
    if delivery.line_break_window >= delivery.chunk_chars {
        fail(format!(
            "delivery.line_break_window ({}) must be smaller than delivery.chunk_chars ({})",
            delivery.line_break_window, delivery.chunk_chars
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn inverted_delay_bounds_fail() {
        let mut config = RelayConfig::default();
        config.polling.min_delay_secs = 12.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "max_delay_secs"));
    }

    #[test]
    fn non_finite_delays_fail() {
        let mut config = RelayConfig::default();
        config.polling.max_delay_secs = f64::NAN;
        config.polling.start_delay_secs = f64::NAN;
        config.polling.initial_delay_secs = f64::INFINITY;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "polling.max_delay_secs must be a finite number"));
        assert!(has_error(&errors, "polling.start_delay_secs must be a finite number"));
        assert!(has_error(&errors, "polling.initial_delay_secs must be a finite number"));
    }

    #[test]
    fn nan_backoff_factor_fails() {
        let mut config = RelayConfig::default();
        config.polling.backoff_factor = f64::NAN;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "polling.backoff_factor must be a finite number"));
    }

    #[test]
    fn negative_initial_delay_fails() {
        let mut config = RelayConfig::default();
        config.polling.initial_delay_secs = -1.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "initial_delay_secs must not be negative"));
    }

    #[test]
    fn budget_share_out_of_range_fails() {
        let mut config = RelayConfig::default();
        config.polling.budget_share = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "budget_share"));
    }

    #[test]
    fn duplicate_rooms_fail() {
        let mut config = RelayConfig::default();
        config.hipchat.rooms = vec!["ops".into(), "dev".into(), "ops".into()];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "more than once"));
    }

    #[test]
    fn window_must_fit_in_chunk() {
        let mut config = RelayConfig::default();
        config.delivery.chunk_chars = 50;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "line_break_window"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = RelayConfig::default();
        config.relay.log_level = "loud".into();
        config.hipchat.endpoint = "api.hipchat.com".into();
        config.hipchat.proxy = Some("proxy.local:3128".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
