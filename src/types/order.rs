use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};

use crate::types::price::Price;

/// Order ids carrying this prefix were synthesized from an exchange position
/// during warmup. They exist only in memory and are never submitted to the
/// venue, neither for placement nor for cancellation.
pub const POSITION_ID_PREFIX: &str = "position-";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Integer side encoding used by the order endpoint: 0 = buy, 1 = sell.
    pub fn wire_code(self) -> u8 {
        match self {
            Side::Bid => 0,
            Side::Ask => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "BID"),
            Side::Ask => write!(f, "ASK"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Expired,
}

impl OrderStatus {
    /// Canceled and Expired orders vacate their slot immediately; Filled
    /// orders stay resident until paired-fill cleanup.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Canceled | OrderStatus::Expired)
    }
}

impl FromStr for OrderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "NEW" => Ok(Self::New),
            "PARTIALLY_FILLED" | "PARTIALLYFILLED" => Ok(Self::PartiallyFilled),
            "FILLED" => Ok(Self::Filled),
            "CANCELED" | "CANCELLED" => Ok(Self::Canceled),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(anyhow!("unknown order status: {other}")),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: String,
    pub instrument: String,
    pub side: Side,
    pub price: Price,
    pub quantity: f64,
    pub filled_qty: f64,
    pub status: OrderStatus,
    pub created_ms: i64,
}

impl Order {
    /// A filled stand-in for an open position, installed at warmup so the
    /// engine does not quote over existing exposure.
    pub fn synthetic(
        side: Side,
        instrument: &str,
        product_id: &str,
        entry_price: f64,
        quantity: f64,
        now_ms: i64,
    ) -> Self {
        let side_tag = match side {
            Side::Bid => "bid",
            Side::Ask => "ask",
        };

        Self {
            id: format!("{POSITION_ID_PREFIX}{side_tag}-{product_id}"),
            instrument: instrument.to_string(),
            side,
            price: Price::new(entry_price),
            quantity,
            filled_qty: quantity,
            status: OrderStatus::Filled,
            created_ms: now_ms,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.id.starts_with(POSITION_ID_PREFIX)
    }
}
