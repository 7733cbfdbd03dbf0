// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./hubrelay.toml` > `~/.config/hubrelay/hubrelay.toml` >
//! `/etc/hubrelay/hubrelay.toml`, overridden by `HUBRELAY_*` variables and the
//! `HUBOT_HIPCHAT_API_*` variables understood by older deployments.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RelayConfig;

/// File name looked up in each configuration directory.
pub const CONFIG_FILE: &str = "hubrelay.toml";

/// Legacy variable names and the keys they set.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("HUBOT_HIPCHAT_API_TOKEN", "hipchat.api_token"),
    ("HUBOT_HIPCHAT_API_ENDPOINT", "hipchat.endpoint"),
    ("HUBOT_HIPCHAT_API_PROXY", "hipchat.proxy"),
    ("HUBOT_HIPCHAT_API_ROOMS", "hipchat.rooms"),
    ("HUBOT_HIPCHAT_API_CONNECT_MSG", "relay.connect_message"),
];

/// Config files in merge order (lowest precedence first).
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/hubrelay").join(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("hubrelay").join(CONFIG_FILE));
    }
    paths.push(PathBuf::from(CONFIG_FILE));
    paths
}

/// Build the full Figment: defaults, config files, then environment.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(RelayConfig::default()));
    for path in config_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(legacy_env_provider()).merge(env_provider())
}

/// Load configuration from the standard hierarchy with environment overrides.
pub fn load_config() -> Result<RelayConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
pub fn load_config_from_str(toml_content: &str) -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, with environment overrides.
pub fn load_config_from_path(path: &Path) -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_env_provider())
        .merge(env_provider())
        .extract()
}

/// `HUBRELAY_<SECTION>_<KEY>` variables.
///
/// Uses `Env::map()` rather than `Env::split("_")`: keys such as `api_token`
/// contain underscores, so only the first segment names the section.
pub fn env_provider() -> Env {
    Env::prefixed("HUBRELAY_").map(|key| {
        let key_str = key.as_str();
        let mapped = ["relay_", "hipchat_", "polling_", "delivery_"]
            .iter()
            .find(|section| key_str.starts_with(*section))
            .map(|section| key_str.replacen(section, &section.replace('_', "."), 1))
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}

/// The `HUBOT_HIPCHAT_API_*` variables.
pub fn legacy_env_provider() -> Env {
    let names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| legacy_key(key.as_str()).into())
}

fn legacy_key(env_key: &str) -> String {
    LEGACY_ENV
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(env_key))
        .map(|(_, mapped)| mapped.to_string())
        .unwrap_or_else(|| env_key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_keys_map_to_sections() {
        assert_eq!(legacy_key("hubot_hipchat_api_token"), "hipchat.api_token");
        assert_eq!(legacy_key("HUBOT_HIPCHAT_API_ROOMS"), "hipchat.rooms");
        assert_eq!(
            legacy_key("hubot_hipchat_api_connect_msg"),
            "relay.connect_message"
        );
    }

    #[test]
    fn config_paths_end_with_local_file() {
        let paths = config_paths();
        assert_eq!(paths.first(), Some(&PathBuf::from("/etc/hubrelay/hubrelay.toml")));
        assert_eq!(paths.last(), Some(&PathBuf::from(CONFIG_FILE)));
    }

    #[test]
    fn from_str_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[polling]
max_delay_secs = 20.0
"#,
        )
        .unwrap();
        assert_eq!(config.polling.max_delay_secs, 20.0);
        assert_eq!(config.polling.min_delay_secs, 1.0);
    }
}
