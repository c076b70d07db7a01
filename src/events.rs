use crate::types::order::OrderStatus;

/// Normalized oracle price update. The feed applies its staleness filter
/// before these are emitted; consumers trust the timestamp.
#[derive(Debug, Clone)]
pub struct Tick {
    pub instrument: String,
    pub price: f64,
    pub confidence: f64,
    pub timestamp_ms: i64,
}

/// Order lifecycle transition delivered by the venue's event stream.
#[derive(Debug, Clone)]
pub struct OrderStatusEvent {
    pub order_id: String,
    pub status: OrderStatus,
}

/// Trade execution notice. Informational only; status events are the
/// authoritative input to reconciliation.
#[derive(Debug, Clone)]
pub struct FillEvent {
    pub order_id: String,
    pub price: f64,
    pub quantity: f64,
    pub timestamp_ms: i64,
}
