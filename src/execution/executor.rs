use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::exchange::{ExchangeClient, ExchangeResult};
use crate::execution::ExecutorState;
use crate::models::{HistoryOrder, OrderStatus, Side};

/// Consistent view of the exchange for one polling cycle: last price, the
/// set of order ids currently open, and recent terminal order records
/// keyed by id. Captured once per tick and shared by every executor, so
/// request cost stays O(1) in the executor count.
#[derive(Debug, Clone)]
pub struct TickSnapshot {
    pub current_price: f64,
    pub open_order_ids: HashSet<String>,
    pub history: HashMap<String, HistoryOrder>,
}

impl TickSnapshot {
    pub fn capture(client: &mut dyn ExchangeClient, history_limit: usize) -> ExchangeResult<Self> {
        let current_price = client.get_current_price()?;
        let open_order_ids = client
            .get_open_orders()?
            .into_iter()
            .map(|o| o.order_id)
            .collect();
        let history = client
            .get_order_history(history_limit)?
            .into_iter()
            .map(|h| (h.order_id.clone(), h))
            .collect();
        Ok(Self {
            current_price,
            open_order_ids,
            history,
        })
    }

    /// Outcome of the two-source merge for a single order id.
    fn resolve(&self, order_id: &str) -> OrderOutcome<'_> {
        if self.open_order_ids.contains(order_id) {
            return OrderOutcome::StillOpen;
        }
        match self.history.get(order_id) {
            Some(record) if record.status == OrderStatus::Filled => OrderOutcome::Filled(record),
            Some(record) if record.status.is_terminal_non_fill() => OrderOutcome::TerminalNonFill,
            // Working statuses with the id absent from the open set are
            // indistinguishable from snapshot latency
            _ => OrderOutcome::Unknown,
        }
    }
}

/// Three-outcomes-plus-unknown merge of the open-order set and history.
/// `Unknown` is a valid no-op, never a transition.
enum OrderOutcome<'a> {
    StillOpen,
    Filled(&'a HistoryOrder),
    TerminalNonFill,
    Unknown,
}

/// State machine for one entry+exit order pair.
///
/// Advances one step per tick from the snapshot alone, so repeated ticks
/// with the same snapshot are idempotent. At most one order id is ever
/// outstanding; a new order is never placed while one is.
#[derive(Debug, Clone)]
pub struct PositionExecutor {
    pub target_entry: f64,
    pub target_exit: f64,
    pub qty: f64,
    pub maker_offset_buy: f64,
    pub maker_offset_sell: f64,
    pub loop_trade: bool,
    state: ExecutorState,
    active_order_id: Option<String>,
    entry_fill_price: f64,
    exit_fill_price: f64,
    stop_requested: bool,
}

/// Persisted form of an executor. `#[serde(default)]` keeps legacy state
/// files readable when newer fields are absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutorRecord {
    pub target_entry: f64,
    pub target_exit: f64,
    pub qty: f64,
    pub maker_offset_buy: f64,
    pub maker_offset_sell: f64,
    #[serde(default)]
    pub loop_trade: bool,
    pub state: ExecutorState,
    pub active_order_id: Option<String>,
    #[serde(default)]
    pub entry_fill_price: f64,
}

impl PositionExecutor {
    pub fn new(
        target_entry: f64,
        target_exit: f64,
        qty: f64,
        maker_offset_buy: f64,
        maker_offset_sell: f64,
        loop_trade: bool,
    ) -> Self {
        Self {
            target_entry,
            target_exit,
            qty,
            maker_offset_buy,
            maker_offset_sell,
            loop_trade,
            state: ExecutorState::PendingEntry,
            active_order_id: None,
            entry_fill_price: 0.0,
            exit_fill_price: 0.0,
            stop_requested: false,
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn active_order_id(&self) -> Option<&str> {
        self.active_order_id.as_deref()
    }

    pub fn entry_fill_price(&self) -> f64 {
        self.entry_fill_price
    }

    pub fn is_completed(&self) -> bool {
        self.state == ExecutorState::Completed
    }

    /// Advance the lifecycle one step against a consistent tick snapshot.
    pub fn execute_cycle(
        &mut self,
        client: &mut dyn ExchangeClient,
        snapshot: &TickSnapshot,
    ) -> ExecutorState {
        if self.stop_requested && self.state == ExecutorState::PendingEntry {
            self.state = ExecutorState::Completed;
            return self.state;
        }

        match self.state {
            ExecutorState::PendingEntry => self.place_entry(client, snapshot.current_price),
            ExecutorState::PlacedEntry => self.track_entry(snapshot),
            ExecutorState::FilledWait => self.place_exit(client, snapshot.current_price),
            ExecutorState::PlacedExit => self.track_exit(snapshot),
            ExecutorState::Completed => {}
        }

        self.state
    }

    fn place_entry(&mut self, client: &mut dyn ExchangeClient, current_price: f64) {
        // Market already better than target: shade below it to stay maker
        let limit_price = if current_price < self.target_entry {
            current_price - self.maker_offset_buy
        } else {
            self.target_entry
        };

        match client.place_limit_order(Side::Buy, self.qty, limit_price, false, true) {
            Ok(order_id) => {
                tracing::info!("Entry placed at {} | id: {}", limit_price, order_id);
                self.active_order_id = Some(order_id);
                self.state = ExecutorState::PlacedEntry;
            }
            Err(e) => {
                // Typically a post-only collision; retried next tick
                tracing::warn!("Entry placement failed: {}", e);
            }
        }
    }

    fn track_entry(&mut self, snapshot: &TickSnapshot) {
        let Some(order_id) = self.active_order_id.clone() else {
            // No order to track: fall back to re-placing the entry
            self.state = ExecutorState::PendingEntry;
            return;
        };

        match snapshot.resolve(&order_id) {
            OrderOutcome::StillOpen | OrderOutcome::Unknown => {}
            OrderOutcome::Filled(record) => {
                tracing::info!("Entry order {} filled at {}", order_id, record.avg_price);
                self.entry_fill_price = record.avg_price;
                self.active_order_id = None;
                self.state = ExecutorState::FilledWait;
            }
            OrderOutcome::TerminalNonFill => {
                tracing::warn!("Entry order {} cancelled/rejected, retrying", order_id);
                self.active_order_id = None;
                self.state = ExecutorState::PendingEntry;
            }
        }
    }

    fn place_exit(&mut self, client: &mut dyn ExchangeClient, current_price: f64) {
        // Market already beyond target: shade above it to stay maker
        let limit_price = if current_price > self.target_exit {
            current_price + self.maker_offset_sell
        } else {
            self.target_exit
        };

        match client.place_limit_order(Side::Sell, self.qty, limit_price, true, true) {
            Ok(order_id) => {
                tracing::info!("Exit placed at {} | id: {}", limit_price, order_id);
                self.active_order_id = Some(order_id);
                self.state = ExecutorState::PlacedExit;
            }
            Err(e) if e.is_reduce_only_violation() => {
                // Phantom state: the position this exit was meant to close
                // no longer exists
                tracing::warn!("Reduce-only violation on exit, resetting to entry: {}", e);
                self.active_order_id = None;
                self.entry_fill_price = 0.0;
                self.state = ExecutorState::PendingEntry;
            }
            Err(e) => {
                tracing::warn!("Exit placement failed: {}", e);
            }
        }
    }

    fn track_exit(&mut self, snapshot: &TickSnapshot) {
        let Some(order_id) = self.active_order_id.clone() else {
            self.state = ExecutorState::FilledWait;
            return;
        };

        match snapshot.resolve(&order_id) {
            OrderOutcome::StillOpen | OrderOutcome::Unknown => {}
            OrderOutcome::Filled(record) => {
                self.exit_fill_price = record.avg_price;
                let pnl = (self.exit_fill_price - self.entry_fill_price) * self.qty;
                tracing::info!(
                    target: "pnl",
                    "CLOSED | entry: {} | exit: {} | pnl: {:.4}",
                    self.entry_fill_price,
                    self.exit_fill_price,
                    pnl
                );

                if self.loop_trade && !self.stop_requested {
                    self.reset_for_next_round();
                } else {
                    self.active_order_id = None;
                    self.state = ExecutorState::Completed;
                }
            }
            OrderOutcome::TerminalNonFill => {
                tracing::warn!("Exit order {} cancelled/rejected, retrying", order_id);
                self.active_order_id = None;
                self.state = ExecutorState::FilledWait;
            }
        }
    }

    fn reset_for_next_round(&mut self) {
        tracing::info!("Loop trade: resetting to PENDING_ENTRY");
        self.active_order_id = None;
        self.entry_fill_price = 0.0;
        self.exit_fill_price = 0.0;
        self.state = ExecutorState::PendingEntry;
    }

    /// Shutdown path: stop entering. Cancels a resting entry order and
    /// completes, but leaves an open position (FILLED_WAIT/PLACED_EXIT)
    /// to close out naturally.
    pub fn abort_entry(&mut self, client: &mut dyn ExchangeClient) {
        self.stop_requested = true;

        match self.state {
            ExecutorState::PendingEntry => {
                self.state = ExecutorState::Completed;
                tracing::info!("Executor stopped before placing entry");
            }
            ExecutorState::PlacedEntry => {
                if let Some(order_id) = self.active_order_id.take() {
                    tracing::info!("Shutdown: cancelling entry order {}", order_id);
                    if let Err(e) = client.cancel_order(&order_id) {
                        tracing::error!("Failed to cancel entry order {}: {}", order_id, e);
                    }
                }
                self.state = ExecutorState::Completed;
            }
            _ => {}
        }
    }

    pub fn to_record(&self) -> ExecutorRecord {
        ExecutorRecord {
            target_entry: self.target_entry,
            target_exit: self.target_exit,
            qty: self.qty,
            maker_offset_buy: self.maker_offset_buy,
            maker_offset_sell: self.maker_offset_sell,
            loop_trade: self.loop_trade,
            state: self.state,
            active_order_id: self.active_order_id.clone(),
            entry_fill_price: self.entry_fill_price,
        }
    }

    pub fn from_record(record: ExecutorRecord) -> Self {
        Self {
            target_entry: record.target_entry,
            target_exit: record.target_exit,
            qty: record.qty,
            maker_offset_buy: record.maker_offset_buy,
            maker_offset_sell: record.maker_offset_sell,
            loop_trade: record.loop_trade,
            state: record.state,
            active_order_id: record.active_order_id,
            entry_fill_price: record.entry_fill_price,
            exit_fill_price: 0.0,
            stop_requested: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::PaperExchange;

    fn snapshot_of(venue: &mut PaperExchange) -> TickSnapshot {
        TickSnapshot::capture(venue, 200).unwrap()
    }

    fn executor() -> PositionExecutor {
        PositionExecutor::new(95.0, 105.0, 1.0, 0.05, 0.05, false)
    }

    #[test]
    fn test_entry_uses_target_when_market_above() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = executor();

        let snap = snapshot_of(&mut venue);
        assert_eq!(
            exec.execute_cycle(&mut venue, &snap),
            ExecutorState::PlacedEntry
        );
        assert!(exec.active_order_id().is_some());

        let orders = venue.get_open_orders().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].price, 95.0);
    }

    #[test]
    fn test_entry_shades_below_better_market() {
        // Market already below target entry: bid current - offset
        let mut venue = PaperExchange::new(90.0, 10_000.0);
        let mut exec = executor();

        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);

        let orders = venue.get_open_orders().unwrap();
        assert!((orders[0].price - 89.95).abs() < 1e-9);
    }

    #[test]
    fn test_post_only_collision_retries_without_state_change() {
        // Target entry above market: the post-only order would cross
        let mut venue = PaperExchange::new(90.0, 10_000.0);
        let mut exec = PositionExecutor::new(95.0, 105.0, 1.0, -1.0, 0.05, false);
        // Negative offset forces limit = 91 > market, rejected by the venue

        let snap = snapshot_of(&mut venue);
        assert_eq!(
            exec.execute_cycle(&mut venue, &snap),
            ExecutorState::PendingEntry
        );
        assert!(exec.active_order_id().is_none());
        assert_eq!(venue.open_order_count(), 0);
    }

    #[test]
    fn test_placed_entry_waits_while_order_open() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = executor();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);

        // Several ticks with the order still open: no movement
        for _ in 0..3 {
            let snap = snapshot_of(&mut venue);
            assert_eq!(
                exec.execute_cycle(&mut venue, &snap),
                ExecutorState::PlacedEntry
            );
        }
    }

    #[test]
    fn test_entry_fill_advances_and_records_avg_price() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = executor();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);

        let order_id = exec.active_order_id().unwrap().to_string();
        venue.fill_order(&order_id).unwrap();

        let snap = snapshot_of(&mut venue);
        assert_eq!(
            exec.execute_cycle(&mut venue, &snap),
            ExecutorState::FilledWait
        );
        assert_eq!(exec.entry_fill_price(), 95.0);
        assert!(exec.active_order_id().is_none());
    }

    #[test]
    fn test_entry_cancel_returns_to_pending() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = executor();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);

        let order_id = exec.active_order_id().unwrap().to_string();
        venue.cancel_order_as_venue(&order_id).unwrap();

        let snap = snapshot_of(&mut venue);
        assert_eq!(
            exec.execute_cycle(&mut venue, &snap),
            ExecutorState::PendingEntry
        );
        assert!(exec.active_order_id().is_none());
    }

    #[test]
    fn test_visibility_latency_is_a_no_op() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = executor();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);

        // Order vanishes from the open set with no history record yet
        let order_id = exec.active_order_id().unwrap().to_string();
        venue.drop_order(&order_id);

        let snap = snapshot_of(&mut venue);
        assert_eq!(
            exec.execute_cycle(&mut venue, &snap),
            ExecutorState::PlacedEntry
        );
        assert_eq!(exec.active_order_id(), Some(order_id.as_str()));
    }

    #[test]
    fn test_exit_placement_after_fill() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = executor();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);
        venue
            .fill_order(&exec.active_order_id().unwrap().to_string())
            .unwrap();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);
        assert_eq!(exec.state(), ExecutorState::FilledWait);

        let snap = snapshot_of(&mut venue);
        assert_eq!(
            exec.execute_cycle(&mut venue, &snap),
            ExecutorState::PlacedExit
        );
        let orders = venue.get_open_orders().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].price, 105.0);
        assert_eq!(orders[0].side, Side::Sell);
    }

    #[test]
    fn test_exit_shades_above_better_market() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = executor();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);
        venue
            .fill_order(&exec.active_order_id().unwrap().to_string())
            .unwrap();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);

        // Market gapped past the exit target
        venue.set_price(110.0);
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);

        let orders = venue.get_open_orders().unwrap();
        assert!((orders[0].price - 110.05).abs() < 1e-9);
    }

    #[test]
    fn test_phantom_state_resets_to_pending_entry() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = executor();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);
        venue
            .fill_order(&exec.active_order_id().unwrap().to_string())
            .unwrap();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);
        assert_eq!(exec.state(), ExecutorState::FilledWait);

        // Position closed externally: the reduce-only exit is refused
        venue.set_position(None);
        let snap = snapshot_of(&mut venue);
        assert_eq!(
            exec.execute_cycle(&mut venue, &snap),
            ExecutorState::PendingEntry
        );
        assert!(exec.active_order_id().is_none());
        assert_eq!(exec.entry_fill_price(), 0.0);
    }

    #[test]
    fn test_exit_fill_completes_trade() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = executor();
        run_to_placed_exit(&mut venue, &mut exec);

        venue
            .fill_order(&exec.active_order_id().unwrap().to_string())
            .unwrap();
        let snap = snapshot_of(&mut venue);
        assert_eq!(
            exec.execute_cycle(&mut venue, &snap),
            ExecutorState::Completed
        );
        assert!(exec.is_completed());
    }

    #[test]
    fn test_exit_cancel_returns_to_filled_wait() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = executor();
        run_to_placed_exit(&mut venue, &mut exec);

        venue
            .cancel_order_as_venue(&exec.active_order_id().unwrap().to_string())
            .unwrap();
        let snap = snapshot_of(&mut venue);
        assert_eq!(
            exec.execute_cycle(&mut venue, &snap),
            ExecutorState::FilledWait
        );
    }

    #[test]
    fn test_loop_trade_restarts_cycle() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = PositionExecutor::new(95.0, 105.0, 1.0, 0.05, 0.05, true);
        run_to_placed_exit(&mut venue, &mut exec);

        venue
            .fill_order(&exec.active_order_id().unwrap().to_string())
            .unwrap();
        let snap = snapshot_of(&mut venue);
        assert_eq!(
            exec.execute_cycle(&mut venue, &snap),
            ExecutorState::PendingEntry
        );
        assert!(exec.active_order_id().is_none());
        assert_eq!(exec.entry_fill_price(), 0.0);
    }

    #[test]
    fn test_never_two_outstanding_orders() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = PositionExecutor::new(95.0, 105.0, 1.0, 0.05, 0.05, true);

        // Drive many cycles with venue-side fills in between; the venue
        // book never holds more than one of this executor's orders.
        for round in 0..20 {
            let snap = snapshot_of(&mut venue);
            exec.execute_cycle(&mut venue, &snap);
            assert!(venue.open_order_count() <= 1, "round {}", round);
            if let Some(order_id) = exec.active_order_id().map(str::to_string) {
                if round % 2 == 0 {
                    venue.fill_order(&order_id).unwrap();
                }
            }
        }
    }

    #[test]
    fn test_abort_entry_cancels_resting_buy() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = executor();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);
        assert_eq!(venue.open_order_count(), 1);

        exec.abort_entry(&mut venue);
        assert!(exec.is_completed());
        assert_eq!(venue.open_order_count(), 0);
    }

    #[test]
    fn test_abort_entry_leaves_open_position_alone() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = executor();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);
        venue
            .fill_order(&exec.active_order_id().unwrap().to_string())
            .unwrap();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);
        assert_eq!(exec.state(), ExecutorState::FilledWait);

        exec.abort_entry(&mut venue);
        // Position still open: the executor keeps running to close it
        assert_eq!(exec.state(), ExecutorState::FilledWait);
        assert!(venue.get_open_position().unwrap().is_some());
    }

    #[test]
    fn test_record_round_trip() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        let mut exec = executor();
        let snap = snapshot_of(&mut venue);
        exec.execute_cycle(&mut venue, &snap);

        let record = exec.to_record();
        let restored = PositionExecutor::from_record(record.clone());
        assert_eq!(restored.to_record(), record);
        assert_eq!(restored.state(), ExecutorState::PlacedEntry);
        assert_eq!(restored.active_order_id(), exec.active_order_id());
    }

    #[test]
    fn test_record_tolerates_legacy_fields() {
        // Older state files predate loop_trade and entry_fill_price
        let json = r#"{
            "target_entry": 95.0,
            "target_exit": 105.0,
            "qty": 1.0,
            "maker_offset_buy": 0.05,
            "maker_offset_sell": 0.05,
            "state": "PLACED_ENTRY",
            "active_order_id": "abc-123"
        }"#;
        let record: ExecutorRecord = serde_json::from_str(json).unwrap();
        assert!(!record.loop_trade);
        assert_eq!(record.entry_fill_price, 0.0);
        assert_eq!(record.state, ExecutorState::PlacedEntry);

        let exec = PositionExecutor::from_record(record);
        assert_eq!(exec.active_order_id(), Some("abc-123"));
    }

    fn run_to_placed_exit(venue: &mut PaperExchange, exec: &mut PositionExecutor) {
        let snap = TickSnapshot::capture(venue, 200).unwrap();
        exec.execute_cycle(venue, &snap);
        venue
            .fill_order(&exec.active_order_id().unwrap().to_string())
            .unwrap();
        let snap = TickSnapshot::capture(venue, 200).unwrap();
        exec.execute_cycle(venue, &snap);
        let snap = TickSnapshot::capture(venue, 200).unwrap();
        exec.execute_cycle(venue, &snap);
        assert_eq!(exec.state(), ExecutorState::PlacedExit);
    }
}
