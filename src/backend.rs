//! The indicator-computation backend consumed by indicator nodes.
//!
//! Numeric computation happens elsewhere; the engine only registers the
//! indicators a plan needs and reads their latest values.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one indicator series: `symbol:kind:period`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndicatorKey(String);

impl IndicatorKey {
    pub fn new(symbol: &str, kind: &str, period: u32) -> Self {
        Self(format!("{}:{}:{}", symbol, kind, period))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait IndicatorBackend: Send + Sync {
    /// Latest value for a registered indicator, or `None` while it warms up.
    async fn get(&self, key: &IndicatorKey) -> Option<f64>;

    /// Registers an indicator series and returns the key to read it with.
    async fn add(
        &self,
        symbol: &str,
        kind: &str,
        period: u32,
        extra: &serde_json::Value,
    ) -> IndicatorKey;
}

/// Outcome of reading an indicator for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorReading {
    Ready(f64),
    /// A backend is configured but has no value for this series yet.
    NotReady,
    /// No backend was injected; callers fall back to [`mock_value`].
    NoBackendConfigured,
}

/// Fixed stand-in values used only when no backend is configured.
pub fn mock_value(kind: &str) -> f64 {
    match kind {
        "rsi" => 50.0,
        "macd" => 0.0,
        "atr" => 1.0,
        "sma" | "ema" => 100.0,
        _ => 0.0,
    }
}

pub async fn read_indicator(
    backend: Option<&dyn IndicatorBackend>,
    key: &IndicatorKey,
) -> IndicatorReading {
    match backend {
        None => IndicatorReading::NoBackendConfigured,
        Some(backend) => match backend.get(key).await {
            Some(value) => IndicatorReading::Ready(value),
            None => IndicatorReading::NotReady,
        },
    }
}

/// A process-local backend whose values are pushed in by the caller.
#[derive(Debug, Default)]
pub struct InMemoryIndicatorStore {
    values: DashMap<IndicatorKey, f64>,
    registered: DashMap<IndicatorKey, serde_json::Value>,
}

impl InMemoryIndicatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &IndicatorKey, value: f64) {
        self.values.insert(key.clone(), value);
    }

    pub fn clear(&self, key: &IndicatorKey) {
        self.values.remove(key);
    }

    pub fn is_registered(&self, key: &IndicatorKey) -> bool {
        self.registered.contains_key(key)
    }
}

#[async_trait]
impl IndicatorBackend for InMemoryIndicatorStore {
    async fn get(&self, key: &IndicatorKey) -> Option<f64> {
        self.values.get(key).map(|v| *v)
    }

    async fn add(
        &self,
        symbol: &str,
        kind: &str,
        period: u32,
        extra: &serde_json::Value,
    ) -> IndicatorKey {
        let key = IndicatorKey::new(symbol, kind, period);
        self.registered.insert(key.clone(), extra.clone());
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn readings_distinguish_missing_backend_from_cold_series() {
        let store = InMemoryIndicatorStore::new();
        let key = store
            .add("BTC_USDT", "rsi", 14, &serde_json::Value::Null)
            .await;
        assert!(store.is_registered(&key));

        assert_eq!(
            read_indicator(None, &key).await,
            IndicatorReading::NoBackendConfigured
        );
        assert_eq!(
            read_indicator(Some(&store), &key).await,
            IndicatorReading::NotReady
        );
        store.set(&key, 71.5);
        assert_eq!(
            read_indicator(Some(&store), &key).await,
            IndicatorReading::Ready(71.5)
        );
    }
}
