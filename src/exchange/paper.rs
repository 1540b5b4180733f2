use std::collections::VecDeque;
use uuid::Uuid;

use crate::exchange::{ExchangeClient, ExchangeError, ExchangeResult, SymbolPrecision};
use crate::models::{HistoryOrder, OpenOrder, OrderStatus, OrderType, PositionInfo, Side};

const HISTORY_CAP: usize = 200;

/// In-memory venue double for tests and dry runs.
///
/// Behaves like the real access layer at the seam: post-only orders are
/// rejected when they would cross the current price, reduce-only orders
/// require an opposite-side position, filled/cancelled orders move from
/// the open book into a bounded history. Tests drive it through the
/// scripting helpers (`set_price`, `fill_order`, `cancel_order_as_venue`,
/// `drop_order`) to replay any venue scenario, including visibility
/// latency.
pub struct PaperExchange {
    price: f64,
    balance: f64,
    leverage: u32,
    open_orders: Vec<OpenOrder>,
    history: VecDeque<HistoryOrder>,
    position: Option<PositionInfo>,
    precision: SymbolPrecision,
    fail_calls: u32,
}

impl PaperExchange {
    pub fn new(price: f64, balance: f64) -> Self {
        Self {
            price,
            balance,
            leverage: 1,
            open_orders: Vec::new(),
            history: VecDeque::new(),
            position: None,
            precision: SymbolPrecision::default(),
            fail_calls: 0,
        }
    }

    pub fn with_precision(mut self, precision: SymbolPrecision) -> Self {
        self.precision = precision;
        self
    }

    fn check_transport(&mut self) -> ExchangeResult<()> {
        if self.fail_calls > 0 {
            self.fail_calls -= 1;
            return Err(ExchangeError::Transport("injected failure".into()));
        }
        Ok(())
    }

    fn push_history(&mut self, record: HistoryOrder) {
        self.history.push_back(record);
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }
    }

    fn apply_fill(&mut self, side: Side, qty: f64, price: f64, reduce_only: bool) {
        match (&mut self.position, side) {
            (Some(pos), s) if pos.side == s.opposite() => {
                // Fill against the existing position
                let closed = qty.min(pos.qty);
                let pnl = match pos.side {
                    Side::Buy => (price - pos.entry_price) * closed,
                    Side::Sell => (pos.entry_price - price) * closed,
                };
                self.balance += pnl;
                pos.qty -= closed;
                if pos.qty <= f64::EPSILON {
                    self.position = None;
                }
                let remainder = qty - closed;
                if remainder > f64::EPSILON && !reduce_only {
                    self.position = Some(PositionInfo {
                        side,
                        qty: remainder,
                        entry_price: price,
                        unrealized_pnl: 0.0,
                        leverage: self.leverage,
                    });
                }
            }
            (Some(pos), _) => {
                // Same side: volume-weighted average entry
                let total = pos.qty + qty;
                pos.entry_price = (pos.entry_price * pos.qty + price * qty) / total;
                pos.qty = total;
            }
            (None, _) => {
                if !reduce_only {
                    self.position = Some(PositionInfo {
                        side,
                        qty,
                        entry_price: price,
                        unrealized_pnl: 0.0,
                        leverage: self.leverage,
                    });
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Scripting helpers (the "venue side" of a test scenario)
    // ------------------------------------------------------------------

    pub fn set_price(&mut self, price: f64) {
        self.price = price;
    }

    /// Move the price and fill any resting order the move would have
    /// touched (buys at or above the new price, sells at or below).
    pub fn advance_price(&mut self, price: f64) {
        self.price = price;
        let touched: Vec<String> = self
            .open_orders
            .iter()
            .filter(|o| match o.side {
                Side::Buy => price <= o.price,
                Side::Sell => price >= o.price,
            })
            .map(|o| o.order_id.clone())
            .collect();
        for order_id in touched {
            let _ = self.fill_order(&order_id);
        }
    }

    /// Fill a resting order at its own limit price.
    pub fn fill_order(&mut self, order_id: &str) -> ExchangeResult<()> {
        let idx = self
            .open_orders
            .iter()
            .position(|o| o.order_id == order_id)
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))?;
        let order = self.open_orders.remove(idx);
        let reduce_only = self
            .position
            .as_ref()
            .is_some_and(|p| p.side == order.side.opposite());
        self.apply_fill(order.side, order.qty, order.price, reduce_only);
        self.push_history(HistoryOrder {
            order_id: order.order_id,
            avg_price: order.price,
            status: OrderStatus::Filled,
        });
        Ok(())
    }

    /// Venue-side cancellation (e.g. order expired or was killed manually).
    pub fn cancel_order_as_venue(&mut self, order_id: &str) -> ExchangeResult<()> {
        let idx = self
            .open_orders
            .iter()
            .position(|o| o.order_id == order_id)
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))?;
        let order = self.open_orders.remove(idx);
        self.push_history(HistoryOrder {
            order_id: order.order_id,
            avg_price: 0.0,
            status: OrderStatus::Cancelled,
        });
        Ok(())
    }

    /// Remove an order from the open book without writing history,
    /// simulating the visibility window where an order is in neither
    /// snapshot.
    pub fn drop_order(&mut self, order_id: &str) {
        self.open_orders.retain(|o| o.order_id != order_id);
    }

    pub fn set_position(&mut self, position: Option<PositionInfo>) {
        self.position = position;
    }

    pub fn set_balance(&mut self, balance: f64) {
        self.balance = balance;
    }

    /// Make the next `n` client calls fail with a transport error.
    pub fn fail_next_calls(&mut self, n: u32) {
        self.fail_calls = n;
    }

    pub fn open_order_count(&self) -> usize {
        self.open_orders.len()
    }
}

impl ExchangeClient for PaperExchange {
    fn get_current_price(&mut self) -> ExchangeResult<f64> {
        self.check_transport()?;
        Ok(self.price)
    }

    fn get_balance(&mut self) -> ExchangeResult<f64> {
        self.check_transport()?;
        Ok(self.balance)
    }

    fn place_limit_order(
        &mut self,
        side: Side,
        qty: f64,
        price: f64,
        reduce_only: bool,
        post_only: bool,
    ) -> ExchangeResult<String> {
        self.check_transport()?;

        // Venue filters apply before any acceptance check
        let price = self.precision.round_price(price, side);
        let qty = self.precision.round_qty(qty);

        if post_only {
            let crosses = match side {
                Side::Buy => price >= self.price,
                Side::Sell => price <= self.price,
            };
            if crosses {
                return Err(ExchangeError::PostOnlyWouldCross { price });
            }
        }
        if reduce_only
            && !self
                .position
                .as_ref()
                .is_some_and(|p| p.side == side.opposite())
        {
            return Err(ExchangeError::ReduceOnlyNoPosition);
        }

        let order_id = Uuid::new_v4().to_string();
        self.open_orders.push(OpenOrder {
            order_id: order_id.clone(),
            price,
            qty,
            side,
            order_type: OrderType::Limit,
            status: OrderStatus::New,
        });
        Ok(order_id)
    }

    fn place_market_order(
        &mut self,
        side: Side,
        qty: f64,
        reduce_only: bool,
    ) -> ExchangeResult<String> {
        self.check_transport()?;

        let qty = self.precision.round_qty(qty);

        if reduce_only
            && !self
                .position
                .as_ref()
                .is_some_and(|p| p.side == side.opposite())
        {
            return Err(ExchangeError::ReduceOnlyNoPosition);
        }

        let order_id = Uuid::new_v4().to_string();
        let price = self.price;
        self.apply_fill(side, qty, price, reduce_only);
        self.push_history(HistoryOrder {
            order_id: order_id.clone(),
            avg_price: price,
            status: OrderStatus::Filled,
        });
        Ok(order_id)
    }

    fn get_open_orders(&mut self) -> ExchangeResult<Vec<OpenOrder>> {
        self.check_transport()?;
        Ok(self.open_orders.clone())
    }

    fn get_order_history(&mut self, limit: usize) -> ExchangeResult<Vec<HistoryOrder>> {
        self.check_transport()?;
        let skip = self.history.len().saturating_sub(limit);
        Ok(self.history.iter().skip(skip).cloned().collect())
    }

    fn get_open_position(&mut self) -> ExchangeResult<Option<PositionInfo>> {
        self.check_transport()?;
        Ok(self.position.clone())
    }

    fn cancel_order(&mut self, order_id: &str) -> ExchangeResult<()> {
        self.check_transport()?;
        self.cancel_order_as_venue(order_id)
    }

    fn cancel_all_orders(&mut self) -> ExchangeResult<()> {
        self.check_transport()?;
        let ids: Vec<String> = self.open_orders.iter().map(|o| o.order_id.clone()).collect();
        for order_id in ids {
            self.cancel_order_as_venue(&order_id)?;
        }
        Ok(())
    }

    fn set_leverage(&mut self, leverage: u32) -> ExchangeResult<()> {
        self.check_transport()?;
        self.leverage = leverage;
        Ok(())
    }
}
