use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::events::Tick;

/// Ticks retained per instrument. Purely observational; the trading path
/// never reads the ring.
pub const SNAPSHOT_CAPACITY: usize = 100;

#[derive(Debug, Default)]
pub struct SnapshotRing {
    rings: Mutex<HashMap<String, VecDeque<Tick>>>,
}

impl SnapshotRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, tick: Tick) {
        let mut rings = self.rings.lock();
        let ring = rings.entry(tick.instrument.clone()).or_default();

        if ring.len() == SNAPSHOT_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(tick);
    }

    /// Up to `n` most recent ticks, oldest first.
    pub fn tail(&self, instrument: &str, n: usize) -> Vec<Tick> {
        let rings = self.rings.lock();
        match rings.get(instrument) {
            None => Vec::new(),
            Some(ring) => {
                let skip = ring.len().saturating_sub(n);
                ring.iter().skip(skip).cloned().collect()
            }
        }
    }

    pub fn latest(&self, instrument: &str) -> Option<Tick> {
        self.rings.lock().get(instrument).and_then(|ring| ring.back().cloned())
    }

    pub fn len(&self, instrument: &str) -> usize {
        self.rings.lock().get(instrument).map_or(0, VecDeque::len)
    }
}
