use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::execution::{
    CancelRequest, CancelResponse, ExchangeAdapter, OpenOrder, PlaceRequest, PlaceResponse,
    PositionRecord, ProductInfo,
};

/// Paper venue. Accepts most placements with a synthetic id, rejects roughly
/// one in ten to exercise the empty-response path, and starts flat.
#[derive(Debug)]
pub struct DryRunAdapter {
    tickers: Vec<String>,
}

impl DryRunAdapter {
    pub fn new(tickers: &[String]) -> Self {
        Self {
            tickers: tickers.to_vec(),
        }
    }
}

#[async_trait]
impl ExchangeAdapter for DryRunAdapter {
    async fn place(&self, request: &PlaceRequest) -> Result<PlaceResponse> {
        let will_reject = {
            let mut rng = rand::rng();
            rng.random_range(0..10) == 0
        };

        if will_reject {
            info!(
                instrument = %request.instrument,
                side = %request.side,
                "dry-run venue rejected placement"
            );
            return Ok(PlaceResponse { order_id: None });
        }

        let order_id = Uuid::new_v4().to_string();
        info!(
            instrument = %request.instrument,
            side = %request.side,
            price = request.price,
            quantity = request.quantity,
            order_id = %order_id,
            "dry-run placement accepted"
        );

        Ok(PlaceResponse {
            order_id: Some(order_id),
        })
    }

    async fn cancel(&self, request: &CancelRequest) -> Result<CancelResponse> {
        info!(order_ids = ?request.order_ids, "dry-run cancel");

        Ok(CancelResponse {
            canceled: request.order_ids.len(),
        })
    }

    async fn positions(
        &self,
        _subaccount_id: &str,
        _product_ids: &[String],
    ) -> Result<Vec<PositionRecord>> {
        Ok(Vec::new())
    }

    async fn open_orders(&self, _subaccount_id: &str) -> Result<Vec<OpenOrder>> {
        Ok(Vec::new())
    }

    async fn products(&self) -> Result<Vec<ProductInfo>> {
        Ok(self
            .tickers
            .iter()
            .map(|ticker| ProductInfo {
                ticker: ticker.clone(),
                product_id: format!("{ticker}_PERP"),
                tick_size: 0.1,
                min_qty: 0.000_1,
                max_qty: 1_000_000.0,
            })
            .collect())
    }
}
