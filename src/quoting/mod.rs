pub mod engine;
pub mod instrument_state;
pub mod quote_math;

use crate::events::Tick;
use crate::market::projection::MarketProjection;

/// Observability hook invoked at the end of each cadence step for an
/// instrument. Implementations must not block.
pub trait SnapshotObserver: Send + Sync {
    fn on_cycle(&self, tick: &Tick, projection: &MarketProjection);
}
