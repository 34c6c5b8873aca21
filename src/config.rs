//! Player configuration model and defaults.

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::protocol::{DEFAULT_CUSTOM_NAMESPACE, DEFAULT_RECEIVER_APP_ID, PROGRESS_REPORT_PERIOD_MS};

/// Root configuration persisted to `cast_player.toml`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlayerConfig {
    /// Namespace carrying progress/finish messages from the receiver app.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_receiver_app_id")]
    pub receiver_app_id: String,
    #[serde(default = "default_progress_report_period_ms")]
    pub progress_report_period_ms: u64,
    /// Keys the persisted play intent per application.
    #[serde(default = "default_app_key")]
    pub app_key: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            receiver_app_id: default_receiver_app_id(),
            progress_report_period_ms: default_progress_report_period_ms(),
            app_key: default_app_key(),
        }
    }
}

fn default_namespace() -> String {
    DEFAULT_CUSTOM_NAMESPACE.to_string()
}

fn default_receiver_app_id() -> String {
    DEFAULT_RECEIVER_APP_ID.to_string()
}

fn default_progress_report_period_ms() -> u64 {
    PROGRESS_REPORT_PERIOD_MS
}

fn default_app_key() -> String {
    "cast-player".to_string()
}

/// Replaces values the player cannot work with by their defaults.
pub fn sanitize_config(mut config: PlayerConfig) -> PlayerConfig {
    if config.progress_report_period_ms == 0 {
        config.progress_report_period_ms = default_progress_report_period_ms();
    }
    if config.namespace.trim().is_empty() {
        config.namespace = default_namespace();
    }
    if config.app_key.trim().is_empty() {
        config.app_key = default_app_key();
    }
    config
}

/// Loads the config file, falling back to defaults when it is missing or invalid.
pub fn load_config(path: &Path) -> PlayerConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        info!(
            "Config file not found. Using defaults. path={}",
            path.display()
        );
        return PlayerConfig::default();
    };
    match toml::from_str::<PlayerConfig>(&contents) {
        Ok(config) => sanitize_config(config),
        Err(err) => {
            warn!("Failed parsing config at {}: {}", path.display(), err);
            PlayerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{load_config, sanitize_config, PlayerConfig};
    use crate::protocol::{DEFAULT_CUSTOM_NAMESPACE, PROGRESS_REPORT_PERIOD_MS};

    #[test]
    fn test_default_config_has_expected_values() {
        let config = PlayerConfig::default();
        assert_eq!(config.namespace, DEFAULT_CUSTOM_NAMESPACE);
        assert_eq!(config.receiver_app_id, "CC1AD845");
        assert_eq!(config.progress_report_period_ms, PROGRESS_REPORT_PERIOD_MS);
        assert_eq!(config.app_key, "cast-player");
    }

    #[test]
    fn test_partial_toml_fills_missing_fields() {
        let config: PlayerConfig =
            toml::from_str("namespace = \"urn:x-cast:com.example\"").expect("valid toml");
        assert_eq!(config.namespace, "urn:x-cast:com.example");
        assert_eq!(config.progress_report_period_ms, 1000);
    }

    #[test]
    fn test_sanitize_replaces_zero_period_and_blank_keys() {
        let config = sanitize_config(PlayerConfig {
            progress_report_period_ms: 0,
            namespace: "  ".to_string(),
            app_key: String::new(),
            ..PlayerConfig::default()
        });
        assert_eq!(config, PlayerConfig::default());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("cast-player-definitely-missing.toml");
        assert_eq!(load_config(&path), PlayerConfig::default());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = PlayerConfig {
            app_key: "my-app".to_string(),
            ..PlayerConfig::default()
        };
        let text = toml::to_string(&config).expect("serialize");
        let parsed: PlayerConfig = toml::from_str(&text).expect("parse");
        assert_eq!(parsed, config);
    }
}
