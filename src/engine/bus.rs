use crate::runtime::{MarketSnapshot, MarketTick, Side, Signal, SignalType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::broadcast;

pub const INDICATOR_UPDATED: &str = "indicator.updated";
pub const SIGNAL_GENERATED: &str = "signal.generated";

/// Inbound notice that fresh indicator or market data exists for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorUpdated {
    pub symbol: String,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl IndicatorUpdated {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            timestamp: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: f64) -> Self {
        self.fields.insert(name.to_string(), serde_json::json!(value));
        self
    }

    /// The snapshot handed to every session on this symbol. Non-numeric fields are ignored.
    pub fn to_snapshot(&self) -> MarketSnapshot {
        let numeric = self
            .fields
            .iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name.clone(), v)))
            .collect();
        MarketSnapshot::single(&self.symbol, MarketTick::from_fields(numeric))
    }
}

/// Outbound signal, carrying both the strategy view and the order-management view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalGenerated {
    pub session_id: String,
    pub strategy_name: String,
    pub symbol: String,
    pub signal_type: SignalType,
    pub confidence: f64,
    pub position_size: f64,
    pub risk_level: String,
    pub indicators: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
    pub side: Option<Side>,
    pub quantity: f64,
    pub price: Option<f64>,
    pub signal_id: String,
    pub node_id: String,
    pub message: Option<String>,
}

impl SignalGenerated {
    pub fn from_signal(session_id: &str, strategy_name: &str, signal: &Signal) -> Self {
        Self {
            session_id: session_id.to_string(),
            strategy_name: strategy_name.to_string(),
            symbol: signal.symbol.clone(),
            signal_type: signal.signal_type,
            confidence: signal.confidence,
            position_size: signal.quantity,
            risk_level: signal.risk_level.clone(),
            indicators: signal.indicators.clone(),
            timestamp: signal.timestamp,
            side: signal.side,
            quantity: signal.quantity,
            price: signal.price,
            signal_id: signal.signal_id.clone(),
            node_id: signal.node_id.clone(),
            message: signal.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload")]
pub enum EngineEvent {
    #[serde(rename = "indicator.updated")]
    IndicatorUpdated(IndicatorUpdated),
    #[serde(rename = "signal.generated")]
    SignalGenerated(SignalGenerated),
}

impl EngineEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            EngineEvent::IndicatorUpdated(_) => INDICATOR_UPDATED,
            EngineEvent::SignalGenerated(_) => SIGNAL_GENERATED,
        }
    }
}

/// In-process pub/sub for engine events. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes to every current subscriber and returns how many there were.
    pub fn publish(&self, event: EngineEvent) -> usize {
        let topic = event.topic();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                log::trace!("No subscribers for {}", topic);
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_update_flattens_fields() {
        let json = r#"{"symbol":"BTC_USDT","close":51000.0,"rsi":28.5,"source":"feed","timestamp":1700000000.0}"#;
        let update: IndicatorUpdated = serde_json::from_str(json).unwrap();
        assert_eq!(update.timestamp, Some(1_700_000_000.0));
        assert_eq!(update.fields.len(), 3);

        let snapshot = update.to_snapshot();
        let tick = snapshot.slice("BTC_USDT").unwrap();
        assert_eq!(tick.price, Some(51_000.0));
        assert_eq!(tick.fields.get("rsi"), Some(&28.5));
    }

    #[test]
    fn events_carry_their_topic() {
        let event = EngineEvent::IndicatorUpdated(IndicatorUpdated::new("ETH_USDT"));
        assert_eq!(event.topic(), INDICATOR_UPDATED);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["topic"], INDICATOR_UPDATED);
    }

    #[tokio::test]
    async fn publish_reaches_subscribers() {
        let bus = EventBus::new(8);
        assert_eq!(bus.publish(EngineEvent::IndicatorUpdated(IndicatorUpdated::new("X"))), 0);

        let mut rx = bus.subscribe();
        assert_eq!(
            bus.publish(EngineEvent::IndicatorUpdated(IndicatorUpdated::new("X"))),
            1
        );
        assert!(matches!(rx.recv().await, Ok(EngineEvent::IndicatorUpdated(u)) if u.symbol == "X"));
    }
}
