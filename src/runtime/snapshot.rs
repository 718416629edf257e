use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The latest market observation for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketTick {
    pub price: Option<f64>,
    pub volume: Option<f64>,
    /// Any other numeric fields carried by the update.
    #[serde(default)]
    pub fields: BTreeMap<String, f64>,
}

impl MarketTick {
    pub fn with_price(price: f64) -> Self {
        Self {
            price: Some(price),
            ..Default::default()
        }
    }

    /// Builds a tick from loose numeric fields. `close` is accepted as price.
    pub fn from_fields(mut fields: BTreeMap<String, f64>) -> Self {
        let price = fields.remove("price").or_else(|| fields.remove("close"));
        let volume = fields.remove("volume");
        Self {
            price,
            volume,
            fields,
        }
    }
}

/// Market state handed to one plan execution, keyed by symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSnapshot {
    ticks: AHashMap<String, MarketTick>,
}

impl MarketSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(symbol: &str, tick: MarketTick) -> Self {
        Self::new().with_tick(symbol, tick)
    }

    pub fn with_tick(mut self, symbol: &str, tick: MarketTick) -> Self {
        self.ticks.insert(symbol.to_string(), tick);
        self
    }

    pub fn slice(&self, symbol: &str) -> Option<&MarketTick> {
        self.ticks.get(symbol)
    }
}
