use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::{FillEvent, OrderStatusEvent, Tick};
use crate::execution::{
    CancelRequest, ExchangeAdapter, OrderType, PlaceRequest, TimeInForce, ORDER_TTL_SECS,
};
use crate::market::price_book::PriceBook;
use crate::market::projection::MarketProjection;
use crate::market::snapshot_ring::SnapshotRing;
use crate::quoting::instrument_state::InstrumentState;
use crate::quoting::quote_math;
use crate::quoting::SnapshotObserver;
use crate::risk::evaluator::RiskEvaluator;
use crate::types::instrument_config::InstrumentConfig;
use crate::types::inventory::{Direction, Inventory};
use crate::types::order::{Order, OrderStatus, Side};
use crate::types::price::Price;

type SharedState = Arc<Mutex<InstrumentState>>;
type CancelKey = (String, Side, String);

/// The quoting orchestrator.
///
/// A cadence timer drives `run_cycle`; the feed task feeds `on_tick`; the
/// venue event task feeds `reconcile`/`on_fill`. State is shared through one
/// mutex per instrument plus a read-mostly lock over the instrument map, so
/// reconciliation lands immediately even while a placement or cancel round
/// is awaiting the venue.
pub struct QuotingEngine {
    adapter: Arc<dyn ExchangeAdapter>,
    instruments: HashMap<String, InstrumentConfig>,
    price_book: PriceBook,
    snapshots: SnapshotRing,
    states: RwLock<HashMap<String, SharedState>>,
    cancels_in_flight: Mutex<HashSet<CancelKey>>,
    subaccount: Option<String>,
    subaccount_id: String,
    observer: Option<Box<dyn SnapshotObserver>>,
}

impl QuotingEngine {
    pub fn new(
        adapter: Arc<dyn ExchangeAdapter>,
        instruments: HashMap<String, InstrumentConfig>,
        subaccount: Option<String>,
        subaccount_id: String,
    ) -> Self {
        Self {
            adapter,
            instruments,
            price_book: PriceBook::new(),
            snapshots: SnapshotRing::new(),
            states: RwLock::new(HashMap::new()),
            cancels_in_flight: Mutex::new(HashSet::new()),
            subaccount,
            subaccount_id,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn SnapshotObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Cancel whatever the subaccount still has resting from a previous
    /// session. Failures are logged and startup continues; the venue's GTD
    /// expiry reclaims anything missed.
    pub async fn sweep_open_orders(&self) {
        let orders = match self.adapter.open_orders(&self.subaccount_id).await {
            Ok(orders) => orders,
            Err(error) => {
                warn!(error = %error, "open order sweep failed; continuing startup");
                return;
            }
        };
        if orders.is_empty() {
            return;
        }

        let Some(subaccount) = &self.subaccount else {
            warn!("no subaccount configured; skipping open order sweep");
            return;
        };

        let order_ids: Vec<String> = orders.into_iter().map(|order| order.id).collect();
        info!(count = order_ids.len(), "cancelling resting orders from a previous session");

        let request = CancelRequest {
            order_ids,
            subaccount: subaccount.clone(),
        };
        if let Err(error) = self.adapter.cancel(&request).await {
            warn!(error = %error, "startup bulk cancel failed; GTD expiry will reclaim the orders");
        }
    }

    /// Folds pre-existing positions into memory: each nonzero position
    /// becomes an inventory record plus a filled stand-in order on the
    /// matching side, so the engine does not re-quote over live exposure.
    pub async fn warm_up_positions(&self) -> anyhow::Result<()> {
        let product_ids: Vec<String> = self
            .instruments
            .values()
            .map(|config| config.product_id.clone())
            .collect();

        let positions = self
            .adapter
            .positions(&self.subaccount_id, &product_ids)
            .await?;
        let now = now_ms();

        for position in positions {
            if position.quantity == 0.0 {
                continue;
            }

            let Some(config) = self
                .instruments
                .values()
                .find(|config| config.product_id == position.product_id)
            else {
                warn!(product_id = %position.product_id, "position for unconfigured product; ignoring");
                continue;
            };

            let (side, direction) = if position.quantity > 0.0 {
                (Side::Bid, Direction::Long)
            } else {
                (Side::Ask, Direction::Short)
            };
            let quantity = position.quantity.abs();

            let order = Order::synthetic(
                side,
                &config.ticker,
                &position.product_id,
                position.entry_price,
                quantity,
                now,
            );
            let inventory = Inventory {
                instrument: config.ticker.clone(),
                direction,
                quantity,
                entry_price: position.entry_price,
                observed_ms: now,
            };

            info!(
                instrument = %config.ticker,
                direction = %direction,
                quantity,
                entry_price = position.entry_price,
                "seeding inventory from existing position"
            );

            let state = self.state_for(&config.ticker);
            let mut state = state.lock();
            match direction {
                Direction::Long => {
                    state.long_inventory = Some(inventory);
                    state.bid = Some(order);
                }
                Direction::Short => {
                    state.short_inventory = Some(inventory);
                    state.ask = Some(order);
                }
            }
        }

        Ok(())
    }

    /// Feed callback: record the latest tick. Must stay non-blocking.
    pub fn on_tick(&self, tick: Tick) {
        self.price_book.upsert(tick);
    }

    /// One cadence step over every instrument with a known tick: snapshot,
    /// project, cancel drifted quotes, fill empty slots, sweep paired fills.
    pub async fn run_cycle(&self) {
        let now = now_ms();

        for tick in self.price_book.iter_latest() {
            self.snapshots.push(tick.clone());

            let Some(config) = self.instruments.get(&tick.instrument) else {
                debug!(instrument = %tick.instrument, "tick without instrument config; not quoting");
                continue;
            };

            let projection = MarketProjection::for_cycle(config, &tick, now);

            self.risk_pass(config, &projection).await;
            self.place_pass(config, &projection).await;

            let state = self.state_for(&config.ticker);
            if state.lock().paired_fill_cleanup() {
                info!(instrument = %config.ticker, "both sides filled; slots reopened");
            }

            if let Some(observer) = &self.observer {
                observer.on_cycle(&tick, &projection);
            }
        }
    }

    /// Venue event callback. Applies the transition to the first slot whose
    /// order id matches; ids are globally unique so one match suffices.
    pub fn reconcile(&self, event: &OrderStatusEvent) {
        let states = self.states.read();
        for state in states.values() {
            let mut state = state.lock();
            if state.apply_status(&event.order_id, event.status) {
                info!(
                    instrument = %state.instrument,
                    order_id = %event.order_id,
                    status = %event.status,
                    "order status reconciled"
                );
                return;
            }
        }

        debug!(order_id = %event.order_id, status = %event.status, "status event for unknown order; ignoring");
    }

    /// Fills are informational; status events carry the state transitions.
    pub fn on_fill(&self, fill: &FillEvent) {
        info!(
            order_id = %fill.order_id,
            price = fill.price,
            quantity = fill.quantity,
            "fill reported"
        );
    }

    /// Flatten the book on the way out: release every lock, bulk-cancel all
    /// resting exchange orders in one call, then drop all slots.
    pub async fn shutdown(&self) {
        info!("shutting down quoting engine");

        let mut order_ids = Vec::new();
        {
            let states = self.states.read();
            for state in states.values() {
                let mut state = state.lock();
                state.clear_locks();
                order_ids.extend(state.live_exchange_order_ids());
            }
        }

        match &self.subaccount {
            None => error!("no subaccount configured; skipping shutdown bulk cancel"),
            Some(_) if order_ids.is_empty() => info!("no live orders to cancel"),
            Some(subaccount) => {
                let request = CancelRequest {
                    order_ids: order_ids.clone(),
                    subaccount: subaccount.clone(),
                };
                match self.adapter.cancel(&request).await {
                    Ok(response) => info!(
                        requested = order_ids.len(),
                        canceled = response.canceled,
                        "shutdown bulk cancel complete"
                    ),
                    Err(error) => error!(error = %error, "shutdown bulk cancel failed"),
                }
            }
        }

        let states = self.states.read();
        for state in states.values() {
            let mut state = state.lock();
            state.clear(Side::Bid);
            state.clear(Side::Ask);
        }
    }

    async fn risk_pass(&self, config: &InstrumentConfig, projection: &MarketProjection) {
        let state = self.state_for(&config.ticker);
        let actions = {
            let state = state.lock();
            RiskEvaluator::evaluate(&state, projection)
        };

        if actions.close_inventory {
            // Surfaced only; inventory is never flattened from here.
            warn!(
                instrument = %config.ticker,
                mid = projection.mid,
                "inventory entry price beyond deviation threshold"
            );
        }

        if actions.cancel_bid {
            self.cancel_side(config, &state, Side::Bid, projection).await;
        }
        if actions.cancel_ask {
            self.cancel_side(config, &state, Side::Ask, projection).await;
        }
    }

    /// Cancels one side's resting order, single-flight per
    /// (instrument, side, order_id). On venue error the slot is left alone;
    /// the terminal status event will clear it eventually.
    async fn cancel_side(
        &self,
        config: &InstrumentConfig,
        state: &SharedState,
        side: Side,
        projection: &MarketProjection,
    ) {
        let Some(subaccount) = self.subaccount.clone() else {
            error!(instrument = %config.ticker, "no subaccount configured; cannot cancel");
            return;
        };

        let key: CancelKey;
        let order_id = {
            let mut state = state.lock();

            let Some(order) = state.slot(side) else {
                return;
            };
            let order_id = order.id.clone();

            if state.cancel_lock(side) {
                debug!(
                    instrument = %config.ticker,
                    side = %side,
                    "cancel already in flight; skipping"
                );
                return;
            }

            key = (config.ticker.clone(), side, order_id.clone());
            if !self.cancels_in_flight.lock().insert(key.clone()) {
                debug!(
                    instrument = %config.ticker,
                    side = %side,
                    order_id = %order_id,
                    "cancel key already in flight; skipping"
                );
                return;
            }
            state.set_cancel_lock(side, true);

            order_id
        };

        info!(
            instrument = %config.ticker,
            side = %side,
            order_id = %order_id,
            mid = projection.mid,
            max_dev_abs = projection.max_dev_abs,
            "cancelling drifted quote"
        );

        let request = CancelRequest {
            order_ids: vec![order_id.clone()],
            subaccount,
        };
        let result = self.adapter.cancel(&request).await;

        {
            let mut state = state.lock();
            match result {
                Ok(_) => state.clear(side),
                Err(error) => error!(
                    instrument = %config.ticker,
                    side = %side,
                    order_id = %order_id,
                    error = %error,
                    "cancel failed; waiting for venue status event"
                ),
            }
            state.set_cancel_lock(side, false);
        }
        self.cancels_in_flight.lock().remove(&key);
    }

    /// Fills whichever sides are empty, at most one placement round per
    /// instrument at a time. Slot occupancy is sampled once on entry.
    async fn place_pass(&self, config: &InstrumentConfig, projection: &MarketProjection) {
        let state = self.state_for(&config.ticker);

        let (need_bid, need_ask) = {
            let mut state = state.lock();
            if state.placing_lock {
                debug!(instrument = %config.ticker, "placement round already in progress; skipping");
                return;
            }
            state.placing_lock = true;
            (state.bid.is_none(), state.ask.is_none())
        };

        if need_bid {
            self.place_side(config, &state, Side::Bid, projection.mid).await;
        }
        if need_ask {
            self.place_side(config, &state, Side::Ask, projection.mid).await;
        }

        state.lock().placing_lock = false;
    }

    async fn place_side(
        &self,
        config: &InstrumentConfig,
        state: &SharedState,
        side: Side,
        mid: f64,
    ) {
        let target = match side {
            Side::Bid => quote_math::bid_target(mid, config.spread_bp as f64),
            Side::Ask => quote_math::ask_target(mid, config.spread_bp as f64),
        };
        let price = quote_math::round_to_tick(target, config.tick_size);

        let request = PlaceRequest {
            instrument: config.ticker.clone(),
            product_id: config.product_id.clone(),
            side,
            price,
            quantity: config.order_size,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtd,
            expires_at_sec: now_sec() + ORDER_TTL_SECS,
        };

        match self.adapter.place(&request).await {
            Err(error) => error!(
                instrument = %config.ticker,
                side = %side,
                error = %error,
                "placement failed"
            ),
            Ok(response) => match response.order_id {
                None => warn!(
                    instrument = %config.ticker,
                    side = %side,
                    "placement response carried no order id; leaving slot empty"
                ),
                Some(order_id) => {
                    info!(
                        instrument = %config.ticker,
                        side = %side,
                        order_id = %order_id,
                        price,
                        quantity = config.order_size,
                        "quote placed"
                    );

                    let order = Order {
                        id: order_id,
                        instrument: config.ticker.clone(),
                        side,
                        price: Price::new(price),
                        quantity: config.order_size,
                        filled_qty: 0.0,
                        status: OrderStatus::New,
                        created_ms: now_ms(),
                    };
                    state.lock().install_placed(order);
                }
            },
        }
    }

    fn state_for(&self, instrument: &str) -> SharedState {
        if let Some(state) = self.states.read().get(instrument) {
            return Arc::clone(state);
        }

        let mut states = self.states.write();
        Arc::clone(
            states
                .entry(instrument.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(InstrumentState::new(instrument)))),
        )
    }

    #[cfg(test)]
    fn snapshot_len(&self, instrument: &str) -> usize {
        self.snapshots.len(instrument)
    }

    #[cfg(test)]
    fn latest_tick(&self, instrument: &str) -> Option<Tick> {
        self.price_book.latest(instrument)
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn now_sec() -> i64 {
    chrono::Utc::now().timestamp()
}
