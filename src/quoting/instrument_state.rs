use tracing::warn;

use crate::types::inventory::Inventory;
use crate::types::order::{Order, OrderStatus, Side};

/// Authoritative per-instrument record: one order slot per side, warmup
/// inventory, and the in-flight flags guarding placement and cancellation.
///
/// Created lazily on first reference and kept for the life of the process.
/// All mutation happens under the instrument's mutex.
#[derive(Debug)]
pub struct InstrumentState {
    pub instrument: String,
    pub bid: Option<Order>,
    pub ask: Option<Order>,
    pub long_inventory: Option<Inventory>,
    pub short_inventory: Option<Inventory>,
    pub placing_lock: bool,
    pub canceling_bid_lock: bool,
    pub canceling_ask_lock: bool,
}

impl InstrumentState {
    pub fn new(instrument: &str) -> Self {
        Self {
            instrument: instrument.to_string(),
            bid: None,
            ask: None,
            long_inventory: None,
            short_inventory: None,
            placing_lock: false,
            canceling_bid_lock: false,
            canceling_ask_lock: false,
        }
    }

    pub fn slot(&self, side: Side) -> Option<&Order> {
        match side {
            Side::Bid => self.bid.as_ref(),
            Side::Ask => self.ask.as_ref(),
        }
    }

    pub fn cancel_lock(&self, side: Side) -> bool {
        match side {
            Side::Bid => self.canceling_bid_lock,
            Side::Ask => self.canceling_ask_lock,
        }
    }

    pub fn set_cancel_lock(&mut self, side: Side, engaged: bool) {
        match side {
            Side::Bid => self.canceling_bid_lock = engaged,
            Side::Ask => self.canceling_ask_lock = engaged,
        }
    }

    /// Installs a freshly placed order into its side's slot. The caller must
    /// only place into an empty slot.
    pub fn install_placed(&mut self, order: Order) {
        let slot = match order.side {
            Side::Bid => &mut self.bid,
            Side::Ask => &mut self.ask,
        };

        if let Some(existing) = slot {
            warn!(
                instrument = %self.instrument,
                side = %order.side,
                existing_id = %existing.id,
                replacement_id = %order.id,
                "installing order over an occupied slot"
            );
        }

        *slot = Some(order);
    }

    pub fn clear(&mut self, side: Side) {
        match side {
            Side::Bid => self.bid = None,
            Side::Ask => self.ask = None,
        }
    }

    /// Applies a venue status transition to whichever slot holds `order_id`.
    /// Terminal statuses vacate the slot. Returns whether the id matched.
    pub fn apply_status(&mut self, order_id: &str, status: OrderStatus) -> bool {
        for side in [Side::Bid, Side::Ask] {
            let slot = match side {
                Side::Bid => &mut self.bid,
                Side::Ask => &mut self.ask,
            };

            if let Some(order) = slot {
                if order.id == order_id {
                    if status.is_terminal() {
                        *slot = None;
                    } else {
                        order.status = status;
                    }
                    return true;
                }
            }
        }

        false
    }

    /// When both sides have filled, the round-trip is complete and both slots
    /// reopen for quoting. Synthetic position orders participate like any
    /// other fill, so a real fill opposite a warmup position also clears the
    /// position's stand-in.
    pub fn paired_fill_cleanup(&mut self) -> bool {
        let both_filled = matches!(&self.bid, Some(bid) if bid.status == OrderStatus::Filled)
            && matches!(&self.ask, Some(ask) if ask.status == OrderStatus::Filled);

        if both_filled {
            self.bid = None;
            self.ask = None;
        }

        both_filled
    }

    pub fn clear_locks(&mut self) {
        self.placing_lock = false;
        self.canceling_bid_lock = false;
        self.canceling_ask_lock = false;
    }

    /// Ids that must be included in a shutdown bulk cancel: real exchange
    /// orders still resting as NEW. Synthetic position orders never qualify.
    pub fn live_exchange_order_ids(&self) -> Vec<String> {
        [&self.bid, &self.ask]
            .into_iter()
            .flatten()
            .filter(|order| !order.is_synthetic() && order.status == OrderStatus::New)
            .map(|order| order.id.clone())
            .collect()
    }
}
