pub mod dry_run;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::order::Side;

/// Placed orders expire venue-side five minutes after submission, so quotes
/// the process loses track of are garbage-collected by the exchange.
pub const ORDER_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    Gtd,
}

#[derive(Debug, Clone)]
pub struct PlaceRequest {
    pub instrument: String,
    pub product_id: String,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub expires_at_sec: i64,
}

/// A response without an order id is a venue-side reject; the caller leaves
/// the slot empty and the next cycle retries.
#[derive(Debug, Clone)]
pub struct PlaceResponse {
    pub order_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CancelRequest {
    pub order_ids: Vec<String>,
    pub subaccount: String,
}

#[derive(Debug, Clone)]
pub struct CancelResponse {
    pub canceled: usize,
}

/// Position row from the venue, quantity sign already parsed: positive is
/// long, negative is short.
#[derive(Debug, Clone)]
pub struct PositionRecord {
    pub product_id: String,
    pub quantity: f64,
    pub entry_price: f64,
}

#[derive(Debug, Clone)]
pub struct OpenOrder {
    pub id: String,
}

/// Venue product metadata backing an instrument's trading rules.
#[derive(Debug, Clone)]
pub struct ProductInfo {
    pub ticker: String,
    pub product_id: String,
    pub tick_size: f64,
    pub min_qty: f64,
    pub max_qty: f64,
}

#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    async fn place(&self, request: &PlaceRequest) -> Result<PlaceResponse>;
    async fn cancel(&self, request: &CancelRequest) -> Result<CancelResponse>;
    async fn positions(
        &self,
        subaccount_id: &str,
        product_ids: &[String],
    ) -> Result<Vec<PositionRecord>>;
    async fn open_orders(&self, subaccount_id: &str) -> Result<Vec<OpenOrder>>;
    async fn products(&self) -> Result<Vec<ProductInfo>>;
}
