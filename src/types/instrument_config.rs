use anyhow::{bail, Result};

use crate::config::AssetParams;
use crate::execution::ProductInfo;

/// Per-instrument quoting parameters, assembled once at startup from the
/// environment surface and the venue's product catalog. Immutable afterwards.
#[derive(Debug, Clone)]
pub struct InstrumentConfig {
    pub ticker: String,
    pub product_id: String,
    pub order_size: f64,
    pub spread_bp: u32,
    pub max_deviation_pct: f64,
    pub tick_size: f64,
    pub min_qty: f64,
    pub max_qty: f64,
}

impl InstrumentConfig {
    pub fn assemble(params: &AssetParams, product: &ProductInfo) -> Result<Self> {
        let config = Self {
            ticker: product.ticker.clone(),
            product_id: product.product_id.clone(),
            order_size: params.order_size,
            spread_bp: params.spread_bp,
            max_deviation_pct: params.max_deviation_pct,
            tick_size: product.tick_size,
            min_qty: product.min_qty,
            max_qty: product.max_qty,
        };
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tick_size <= 0.0 {
            bail!("tick_size must be > 0 for {}", self.ticker);
        }
        if self.order_size <= 0.0 {
            bail!("order_size must be > 0 for {}", self.ticker);
        }
        if self.order_size < self.min_qty || self.order_size > self.max_qty {
            bail!(
                "order_size {} outside venue bounds [{}, {}] for {}",
                self.order_size,
                self.min_qty,
                self.max_qty,
                self.ticker
            );
        }
        if self.max_deviation_pct < 0.0 {
            bail!("max_deviation_pct must be >= 0 for {}", self.ticker);
        }
        if self.spread_bp >= 10_000 {
            bail!(
                "spread of {} bp would push the bid through zero for {}",
                self.spread_bp,
                self.ticker
            );
        }
        Ok(())
    }
}
