use std::collections::HashMap;

use parking_lot::RwLock;

use crate::events::Tick;

/// Latest oracle tick per instrument. The feed task writes, the cadence loop
/// reads; each tick overwrites whatever came before it for that instrument.
#[derive(Debug, Default)]
pub struct PriceBook {
    latest: RwLock<HashMap<String, Tick>>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, tick: Tick) {
        self.latest.write().insert(tick.instrument.clone(), tick);
    }

    pub fn latest(&self, instrument: &str) -> Option<Tick> {
        self.latest.read().get(instrument).cloned()
    }

    /// Snapshot of the newest tick for every instrument seen so far.
    pub fn iter_latest(&self) -> Vec<Tick> {
        self.latest.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(instrument: &str, price: f64, timestamp_ms: i64) -> Tick {
        Tick {
            instrument: instrument.to_string(),
            price,
            confidence: 1.0,
            timestamp_ms,
        }
    }

    #[test]
    fn upsert_overwrites_previous_tick() {
        let book = PriceBook::new();
        book.upsert(tick("BTCUSD", 50_000.0, 1));
        book.upsert(tick("BTCUSD", 50_100.0, 2));

        let latest = book.latest("BTCUSD").unwrap();
        assert_eq!(latest.price, 50_100.0);
        assert_eq!(latest.timestamp_ms, 2);
    }

    #[test]
    fn missing_instrument_yields_none() {
        let book = PriceBook::new();

        assert!(book.latest("ETHUSD").is_none());
    }

    #[test]
    fn iter_latest_returns_one_entry_per_instrument() {
        let book = PriceBook::new();
        book.upsert(tick("BTCUSD", 50_000.0, 1));
        book.upsert(tick("ETHUSD", 3_000.0, 1));
        book.upsert(tick("BTCUSD", 50_050.0, 2));

        let mut latest = book.iter_latest();
        latest.sort_by(|a, b| a.instrument.cmp(&b.instrument));

        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].price, 50_050.0);
        assert_eq!(latest[1].price, 3_000.0);
    }
}
