use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

const ENV_PREFIX: &str = "STRATEGY_GRAPH_";

/// Runtime settings shared by the validator, compiler, executor and live engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on a single node's execution within a tick.
    pub node_timeout_ms: u64,
    /// TTL applied to persisted temporal state.
    pub state_ttl_secs: u64,
    /// Size of each session's recent-error ring.
    pub max_recent_errors: usize,
    /// Number of emitted signals kept per session.
    pub max_signal_history: usize,
    pub event_channel_capacity: usize,
    pub max_nodes_warning: usize,
    pub max_edges_per_node_warning: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_timeout_ms: 5_000,
            state_ttl_secs: 86_400,
            max_recent_errors: 50,
            max_signal_history: 1_000,
            event_channel_capacity: 1_024,
            max_nodes_warning: 100,
            max_edges_per_node_warning: 10,
        }
    }
}

impl EngineConfig {
    /// Loads a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Applies `STRATEGY_GRAPH_<FIELD>` environment overrides, e.g.
    /// `STRATEGY_GRAPH_NODE_TIMEOUT_MS=250`.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        override_from_env("NODE_TIMEOUT_MS", &mut self.node_timeout_ms)?;
        override_from_env("STATE_TTL_SECS", &mut self.state_ttl_secs)?;
        override_from_env("MAX_RECENT_ERRORS", &mut self.max_recent_errors)?;
        override_from_env("MAX_SIGNAL_HISTORY", &mut self.max_signal_history)?;
        override_from_env("EVENT_CHANNEL_CAPACITY", &mut self.event_channel_capacity)?;
        override_from_env("MAX_NODES_WARNING", &mut self.max_nodes_warning)?;
        override_from_env(
            "MAX_EDGES_PER_NODE_WARNING",
            &mut self.max_edges_per_node_warning,
        )?;
        Ok(self)
    }

    pub fn node_timeout(&self) -> Duration {
        Duration::from_millis(self.node_timeout_ms)
    }

    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_secs)
    }
}

fn override_from_env<T: std::str::FromStr>(field: &str, target: &mut T) -> Result<(), ConfigError> {
    let name = format!("{}{}", ENV_PREFIX, field);
    if let Ok(value) = std::env::var(&name) {
        *target = value
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { name, value })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"node_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.node_timeout(), Duration::from_millis(250));
        assert_eq!(config.max_recent_errors, 50);
    }

    #[test]
    fn env_overrides_apply_and_reject_garbage() {
        const VAR: &str = "STRATEGY_GRAPH_MAX_SIGNAL_HISTORY";
        // SAFETY: no other test in this crate touches this variable.
        unsafe { std::env::set_var(VAR, "7") };
        let config = EngineConfig::default().with_env_overrides().unwrap();
        assert_eq!(config.max_signal_history, 7);
        assert_eq!(config.node_timeout_ms, 5_000);

        unsafe { std::env::set_var(VAR, "lots") };
        let result = EngineConfig::default().with_env_overrides();
        unsafe { std::env::remove_var(VAR) };
        assert!(matches!(result, Err(ConfigError::InvalidEnv { name, .. }) if name == VAR));
    }
}
