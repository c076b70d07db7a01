use crate::market::projection::MarketProjection;
use crate::quoting::instrument_state::InstrumentState;
use crate::quoting::quote_math;
use crate::types::order::OrderStatus;

/// What the risk pass wants done for one instrument this cycle.
///
/// `close_inventory` is surfaced for future policy but nothing acts on it:
/// the engine only cancels orders, it never flattens positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskActions {
    pub cancel_bid: bool,
    pub cancel_ask: bool,
    pub close_inventory: bool,
}

pub struct RiskEvaluator;

impl RiskEvaluator {
    /// Flags a side for cancellation when its resting NEW order has drifted
    /// strictly beyond the deviation threshold from the current mid.
    /// Deviation exactly at the threshold does not trigger.
    pub fn evaluate(state: &InstrumentState, projection: &MarketProjection) -> RiskActions {
        let beyond = |price: f64| quote_math::dev(price, projection.mid) > projection.max_dev_abs;

        let drifted = |order: &Option<crate::types::order::Order>| {
            order
                .as_ref()
                .is_some_and(|o| o.status == OrderStatus::New && beyond(o.price.as_f64()))
        };

        let inventory_beyond = [&state.long_inventory, &state.short_inventory]
            .into_iter()
            .flatten()
            .any(|inventory| beyond(inventory.entry_price));

        RiskActions {
            cancel_bid: drifted(&state.bid),
            cancel_ask: drifted(&state.ask),
            close_inventory: inventory_beyond,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::inventory::{Direction, Inventory};
    use crate::types::order::{Order, Side};
    use crate::types::price::Price;

    fn projection(mid: f64, max_dev_abs: f64) -> MarketProjection {
        MarketProjection {
            instrument: "BTCUSD".to_string(),
            mid,
            bid_target: mid,
            ask_target: mid,
            max_dev_abs,
            computed_ms: 0,
        }
    }

    fn order(id: &str, side: Side, price: f64, status: OrderStatus) -> Order {
        Order {
            id: id.to_string(),
            instrument: "BTCUSD".to_string(),
            side,
            price: Price::new(price),
            quantity: 0.001,
            filled_qty: 0.0,
            status,
            created_ms: 0,
        }
    }

    #[test]
    fn drifted_new_order_is_flagged() {
        let mut state = InstrumentState::new("BTCUSD");
        state.install_placed(order("b1", Side::Bid, 49_950.0, OrderStatus::New));

        // dev(49_950, 53_000) = 3_050 > 53_000 * 5% = 2_650.
        let actions = RiskEvaluator::evaluate(&state, &projection(53_000.0, 2_650.0));

        assert!(actions.cancel_bid);
        assert!(!actions.cancel_ask);
    }

    #[test]
    fn deviation_at_threshold_does_not_trigger() {
        let mut state = InstrumentState::new("BTCUSD");
        state.install_placed(order("b1", Side::Bid, 49_000.0, OrderStatus::New));

        // dev = 1_000, threshold = 1_000: strict comparison, no cancel.
        let actions = RiskEvaluator::evaluate(&state, &projection(50_000.0, 1_000.0));

        assert!(!actions.cancel_bid);
    }

    #[test]
    fn non_new_orders_are_never_flagged() {
        let mut state = InstrumentState::new("BTCUSD");
        state.install_placed(order("b1", Side::Bid, 10_000.0, OrderStatus::Filled));
        state.install_placed(order("a1", Side::Ask, 90_000.0, OrderStatus::PartiallyFilled));

        let actions = RiskEvaluator::evaluate(&state, &projection(50_000.0, 100.0));

        assert!(!actions.cancel_bid);
        assert!(!actions.cancel_ask);
    }

    #[test]
    fn empty_slots_produce_no_actions() {
        let state = InstrumentState::new("BTCUSD");
        let actions = RiskEvaluator::evaluate(&state, &projection(50_000.0, 100.0));

        assert_eq!(actions, RiskActions::default());
    }

    #[test]
    fn inventory_beyond_threshold_is_reported_not_acted_on() {
        let mut state = InstrumentState::new("BTCUSD");
        state.long_inventory = Some(Inventory {
            instrument: "BTCUSD".to_string(),
            direction: Direction::Long,
            quantity: 0.005,
            entry_price: 45_000.0,
            observed_ms: 0,
        });

        // dev(45_000, 50_000) = 5_000 > 2_500.
        let actions = RiskEvaluator::evaluate(&state, &projection(50_000.0, 2_500.0));

        assert!(actions.close_inventory);
        assert!(!actions.cancel_bid);
        assert!(!actions.cancel_ask);
    }

    #[test]
    fn zero_mid_yields_zero_threshold_but_no_spurious_cancels() {
        let mut state = InstrumentState::new("BTCUSD");
        state.install_placed(order("b1", Side::Bid, 0.0, OrderStatus::New));

        // dev(0, 0) = 0 is not strictly greater than 0.
        let actions = RiskEvaluator::evaluate(&state, &projection(0.0, 0.0));

        assert!(!actions.cancel_bid);
    }
}
