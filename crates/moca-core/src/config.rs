// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MocaError, Result};
use crate::types::{LogLevel, PLUGIN_NAME};

/// How native-originated events reach the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDelivery {
    /// Each registration is forwarded as a persistent native callback.
    NativeCallback,
    /// The host dispatches DOM-style named events; registration is local.
    Dom,
}

/// Bridge settings, usually read from the host application's config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Plugin identifier sent with every call.
    pub plugin_name: String,
    /// MOCA application key (`moca_app_key`).
    pub app_key: Option<String>,
    /// MOCA application secret (`moca_app_secret`).
    pub app_secret: Option<String>,
    /// Push sender id. Without it remote push is unavailable.
    pub gcm_sender: Option<String>,
    /// Initial SDK log level.
    pub log_level: LogLevel,
    /// Event transport.
    pub event_delivery: EventDelivery,
    /// Default suppression flag for content-action registrations.
    pub suppress_default_ui: bool,
    /// Whether proximity is switched on at startup.
    pub proximity_enabled: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            plugin_name: PLUGIN_NAME.to_string(),
            app_key: None,
            app_secret: None,
            gcm_sender: None,
            log_level: LogLevel::Info,
            event_delivery: EventDelivery::NativeCallback,
            suppress_default_ui: false,
            proximity_enabled: true,
        }
    }
}

impl BridgeConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        debug!(path = %path.display(), "bridge config loaded");
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject configurations the native SDK would refuse to start with.
    pub fn validate(&self) -> Result<()> {
        if self.plugin_name.trim().is_empty() {
            return Err(MocaError::Config("plugin name is empty".into()));
        }
        if blank(&self.app_key) {
            return Err(MocaError::Config(
                "MOCA app key not specified. Missing 'moca_app_key' preference.".into(),
            ));
        }
        if blank(&self.app_secret) {
            return Err(MocaError::Config(
                "MOCA app secret not specified. Missing 'moca_app_secret' preference.".into(),
            ));
        }
        if blank(&self.gcm_sender) {
            warn!("GCM sender not set. Remote push notifications won't be available.");
        }
        Ok(())
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> BridgeConfig {
        BridgeConfig {
            app_key: Some("key".into()),
            app_secret: Some("secret".into()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_use_the_fixed_plugin_name() {
        let config = BridgeConfig::default();
        assert_eq!(config.plugin_name, "MOCAPlugin");
        assert_eq!(config.event_delivery, EventDelivery::NativeCallback);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn missing_app_key_is_rejected() {
        let err = BridgeConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("moca_app_key"));
    }

    #[test]
    fn missing_secret_is_rejected() {
        let config = BridgeConfig {
            app_secret: Some("  ".into()),
            ..configured()
        };
        assert!(config.validate().unwrap_err().to_string().contains("moca_app_secret"));
    }

    #[test]
    fn complete_config_validates() {
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moca.json");
        let config = BridgeConfig {
            log_level: LogLevel::Debug,
            event_delivery: EventDelivery::Dom,
            ..configured()
        };
        config.save(&path).unwrap();
        assert_eq!(BridgeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moca.json");
        std::fs::write(&path, r#"{ "app_key": "k", "log_level": 2 }"#).unwrap();
        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.log_level, LogLevel::Warning);
        assert_eq!(config.plugin_name, "MOCAPlugin");
        assert!(config.proximity_enabled);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = BridgeConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, MocaError::Io(_)));
    }
}
