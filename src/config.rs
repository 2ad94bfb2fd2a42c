//! Bridge configuration

use crate::player::PlayerVars;
use tracing::warn;

/// Script that exposes the embedded player API
pub const DEFAULT_SCRIPT_URL: &str = "https://www.youtube.com/iframe_api";

/// How the player library becomes available
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetMode {
    /// The library is already loaded; players are built on the spot
    Immediate,
    /// The library script must be injected and report readiness first
    Deferred { script_url: String },
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub asset: AssetMode,
    pub player_vars: PlayerVars,
    /// Second argument of `seekTo`
    pub allow_seek_ahead: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            asset: AssetMode::Immediate,
            player_vars: PlayerVars::default(),
            allow_seek_ahead: true,
        }
    }
}

impl BridgeConfig {
    /// Deferred construction behind the default script URL
    pub fn deferred() -> Self {
        Self {
            asset: AssetMode::Deferred {
                script_url: DEFAULT_SCRIPT_URL.to_string(),
            },
            ..Default::default()
        }
    }

    /// Read overrides from `YTBRIDGE_SCRIPT_URL` and `YTBRIDGE_SEEK_AHEAD`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("YTBRIDGE_SCRIPT_URL").filter(|u| !u.trim().is_empty()) {
            config.asset = AssetMode::Deferred { script_url: url };
        }

        if let Some(raw) = lookup("YTBRIDGE_SEEK_AHEAD") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "0" | "false" | "no" => config.allow_seek_ahead = false,
                "1" | "true" | "yes" => config.allow_seek_ahead = true,
                other => warn!("Ignoring YTBRIDGE_SEEK_AHEAD={:?}, expected true/false", other),
            }
        }

        config
    }
}
