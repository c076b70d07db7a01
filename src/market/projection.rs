use crate::events::Tick;
use crate::quoting::quote_math;
use crate::types::instrument_config::InstrumentConfig;

/// Per-cycle view of where quotes should sit relative to the oracle mid.
///
/// The projected bid/ask here use a half-spread offset on each side, while
/// placement prices use the full offset. The two deliberately disagree; the
/// risk pass keys off `mid` and `max_dev_abs` only.
#[derive(Debug, Clone)]
pub struct MarketProjection {
    pub instrument: String,
    pub mid: f64,
    pub bid_target: f64,
    pub ask_target: f64,
    pub max_dev_abs: f64,
    pub computed_ms: i64,
}

impl MarketProjection {
    pub fn for_cycle(config: &InstrumentConfig, tick: &Tick, now_ms: i64) -> Self {
        let mid = tick.price;
        let spread_amount = mid * quote_math::bp_to_decimal(config.spread_bp as f64);

        Self {
            instrument: config.ticker.clone(),
            mid,
            bid_target: mid - spread_amount / 2.0,
            ask_target: mid + spread_amount / 2.0,
            max_dev_abs: quote_math::max_dev_abs(mid, config.max_deviation_pct),
            computed_ms: now_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetParams;
    use crate::execution::ProductInfo;

    fn config() -> InstrumentConfig {
        InstrumentConfig::assemble(
            &AssetParams {
                order_size: 0.001,
                spread_bp: 10,
                max_deviation_pct: 5.0,
            },
            &ProductInfo {
                ticker: "BTCUSD".to_string(),
                product_id: "BTCUSD_PERP".to_string(),
                tick_size: 1.0,
                min_qty: 0.0001,
                max_qty: 100.0,
            },
        )
        .unwrap()
    }

    fn tick(price: f64) -> Tick {
        Tick {
            instrument: "BTCUSD".to_string(),
            price,
            confidence: 5.0,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn projection_uses_half_spread_offsets() {
        let projection = MarketProjection::for_cycle(&config(), &tick(50_000.0), 1);

        // spread_amount = 50_000 * 10 / 10_000 = 50; half on each side.
        assert_eq!(projection.bid_target, 49_975.0);
        assert_eq!(projection.ask_target, 50_025.0);
        // max_dev_abs = 50_000 * 5% = 2_500.
        assert_eq!(projection.max_dev_abs, 2_500.0);
    }

    #[test]
    fn zero_price_tick_projects_zero_targets() {
        let projection = MarketProjection::for_cycle(&config(), &tick(0.0), 1);

        assert_eq!(projection.bid_target, 0.0);
        assert_eq!(projection.ask_target, 0.0);
        assert_eq!(projection.max_dev_abs, 0.0);
    }
}
