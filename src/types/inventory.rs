use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Position observed at warmup. Quantity is always positive; the sign of the
/// exchange-reported quantity is folded into `direction`.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub instrument: String,
    pub direction: Direction,
    pub quantity: f64,
    pub entry_price: f64,
    pub observed_ms: i64,
}
