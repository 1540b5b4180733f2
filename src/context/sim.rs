use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::context::{ExecutionContext, OrderOptions, PendingOrder};
use crate::models::{Candle, PositionInfo, Side, TradeKind, TradeRecord};

/// Open position inside the simulator.
#[derive(Debug, Clone)]
struct SimPosition {
    side: Side,
    qty: f64,
    entry_price: f64,
    /// Wallet margin locked against this position.
    margin: f64,
}

/// Deterministic fill simulator implementing [`ExecutionContext`].
///
/// Emulates a venue matching engine against replayed candles: wallet
/// balance, leverage/margin, maker and taker orders, reduce-only
/// protection, fees, and a book of resting limit orders. Price and time
/// only move through [`SimulationContext::advance`], once per replay
/// step, so no strategy can observe a bar before trading on it.
///
/// Resting limit orders touched by a bar's high/low range fill at their
/// own limit price. That is optimistic relative to a live venue (queue
/// position and partial fills are not modeled) and is a known
/// backtest-vs-live divergence.
pub struct SimulationContext {
    balance: f64,
    leverage: u32,
    fee_rate: f64,
    position: Option<SimPosition>,
    pending: Vec<PendingOrder>,
    trades: Vec<TradeRecord>,
    current_price: f64,
    current_time: DateTime<Utc>,
    log_lines: Vec<String>,
}

impl SimulationContext {
    pub fn new(initial_balance: f64, fee_rate: f64) -> Self {
        Self {
            balance: initial_balance,
            leverage: 1,
            fee_rate,
            position: None,
            pending: Vec::new(),
            trades: Vec::new(),
            current_price: 0.0,
            current_time: DateTime::<Utc>::MIN_UTC,
            log_lines: Vec::new(),
        }
    }

    pub fn current_price(&self) -> f64 {
        self.current_price
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<TradeRecord> {
        self.trades
    }

    pub fn log_lines(&self) -> &[String] {
        &self.log_lines
    }

    /// Advance the simulated clock to `candle` and resolve resting orders
    /// against its full high/low range. The bar passed here must be the
    /// same bar the decision logic is about to observe.
    pub fn advance(&mut self, candle: &Candle) {
        self.current_price = candle.close;
        self.current_time = candle.timestamp;

        let resting = std::mem::take(&mut self.pending);
        for order in resting {
            let touched = match order.side {
                Side::Buy => order.price >= candle.low,
                Side::Sell => order.price <= candle.high,
            };
            if !touched {
                self.pending.push(order);
                continue;
            }
            if order.reduce_only && !self.has_position_opposite(order.side) {
                self.log(&format!(
                    "Dropping reduce-only {} order {}: position already closed",
                    order.side, order.order_id
                ));
                continue;
            }
            // Fills at the order's own limit price
            if self
                .execute(order.side, order.qty, order.price, order.reduce_only)
                .is_none()
            {
                self.log(&format!(
                    "Dropping resting {} order {}: rejected at fill time",
                    order.side, order.order_id
                ));
            }
        }
    }

    fn has_position_opposite(&self, side: Side) -> bool {
        self.position
            .as_ref()
            .is_some_and(|p| p.side == side.opposite())
    }

    fn order(&mut self, side: Side, qty: f64, price: Option<f64>, opts: OrderOptions)
        -> Option<String> {
        // 1. Post-only must rest strictly inside the book
        if opts.post_only {
            let crosses = match (side, price) {
                (Side::Buy, Some(p)) => p >= self.current_price,
                (Side::Sell, Some(p)) => p <= self.current_price,
                // A maker guarantee is meaningless for a market order
                (_, None) => true,
            };
            if crosses {
                self.log(&format!(
                    "Rejected post-only {} at {:?}: would execute as taker",
                    side, price
                ));
                return None;
            }
        }

        // 2. Reduce-only needs an opposite-side position to reduce
        if opts.reduce_only && !self.has_position_opposite(side) {
            self.log(&format!("Rejected reduce-only {}: no position to reduce", side));
            return None;
        }

        // 3. A limit strictly better than market rests on the book
        if let Some(limit) = price {
            let rests = match side {
                Side::Buy => limit < self.current_price,
                Side::Sell => limit > self.current_price,
            };
            if rests {
                let order_id = format!("SIM-{}", Uuid::new_v4());
                self.pending.push(PendingOrder {
                    order_id: order_id.clone(),
                    side,
                    qty,
                    price: limit,
                    post_only: opts.post_only,
                    reduce_only: opts.reduce_only,
                });
                return Some(order_id);
            }
        }

        // 4. Immediate execution at the limit or at market
        let exec_price = price.unwrap_or(self.current_price);
        self.execute(side, qty, exec_price, opts.reduce_only)
    }

    /// Execute `qty` at `price` against wallet and position. Returns the
    /// synthetic order id, or `None` when the balance cannot cover
    /// margin + fee.
    fn execute(&mut self, side: Side, qty: f64, price: f64, reduce_only: bool) -> Option<String> {
        if reduce_only || self.has_position_opposite(side) {
            if reduce_only {
                self.reduce_position(qty, price);
                return Some(format!("SIM-{}", Uuid::new_v4()));
            }
            // Flip: margin for the new side must clear before the old
            // side is closed
            let notional = qty * price;
            let required = notional / self.leverage as f64 + notional * self.fee_rate;
            if self.balance < required {
                self.log(&format!(
                    "Insufficient balance for {}: need {:.2}, have {:.2}",
                    side, required, self.balance
                ));
                return None;
            }
            self.close_position(price);
            return self.open_or_add(side, qty, price);
        }

        self.open_or_add(side, qty, price)
    }

    fn open_or_add(&mut self, side: Side, qty: f64, price: f64) -> Option<String> {
        let notional = qty * price;
        let margin = notional / self.leverage as f64;
        let fee = notional * self.fee_rate;
        let cost = margin + fee;

        if self.balance < cost {
            self.log(&format!(
                "Insufficient balance for {}: need {:.2}, have {:.2} ({}x leverage)",
                side, cost, self.balance, self.leverage
            ));
            return None;
        }

        match &mut self.position {
            Some(pos) => {
                // Same side: quantity-weighted average entry
                let total = pos.qty + qty;
                pos.entry_price = (pos.entry_price * pos.qty + price * qty) / total;
                pos.qty = total;
                pos.margin += margin;
            }
            None => {
                self.position = Some(SimPosition {
                    side,
                    qty,
                    entry_price: price,
                    margin,
                });
            }
        }

        self.balance -= cost;
        let kind = match side {
            Side::Buy => TradeKind::Buy,
            Side::Sell => TradeKind::Sell,
        };
        self.trades
            .push(TradeRecord::fill(kind, price, qty, self.current_time));
        Some(format!("SIM-{}", Uuid::new_v4()))
    }

    /// Shrink the open position by up to `qty`, realizing PnL net of the
    /// exit fee and releasing margin proportionally. Never flips.
    fn reduce_position(&mut self, qty: f64, price: f64) {
        let Some(pos) = self.position.as_mut() else {
            return;
        };
        let closed = qty.min(pos.qty);
        let raw_pnl = match pos.side {
            Side::Buy => (price - pos.entry_price) * closed,
            Side::Sell => (pos.entry_price - price) * closed,
        };
        let fee = closed * price * self.fee_rate;
        let net_pnl = raw_pnl - fee;
        let released = pos.margin * (closed / pos.qty);

        pos.qty -= closed;
        pos.margin -= released;
        let fully_closed = pos.qty <= f64::EPSILON;

        self.balance += released + net_pnl;
        self.trades
            .push(TradeRecord::close(price, net_pnl, self.current_time));
        if fully_closed {
            self.position = None;
        }
    }

    /// Close the whole position at `price`.
    fn close_position(&mut self, price: f64) {
        if let Some(pos) = self.position.clone() {
            self.reduce_position(pos.qty, price);
        }
    }
}

impl ExecutionContext for SimulationContext {
    fn set_leverage(&mut self, leverage: u32) -> crate::Result<()> {
        if leverage == 0 {
            return Err("leverage must be at least 1".into());
        }
        self.leverage = leverage;
        Ok(())
    }

    fn buy(
        &mut self,
        qty: f64,
        price: Option<f64>,
        opts: OrderOptions,
    ) -> crate::Result<Option<String>> {
        Ok(self.order(Side::Buy, qty, price, opts))
    }

    fn sell(
        &mut self,
        qty: f64,
        price: Option<f64>,
        opts: OrderOptions,
    ) -> crate::Result<Option<String>> {
        Ok(self.order(Side::Sell, qty, price, opts))
    }

    fn balance(&mut self) -> crate::Result<f64> {
        Ok(self.balance)
    }

    fn position(&mut self) -> crate::Result<Option<PositionInfo>> {
        Ok(self.position.as_ref().map(|p| {
            let unrealized_pnl = match p.side {
                Side::Buy => (self.current_price - p.entry_price) * p.qty,
                Side::Sell => (p.entry_price - self.current_price) * p.qty,
            };
            PositionInfo {
                side: p.side,
                qty: p.qty,
                entry_price: p.entry_price,
                unrealized_pnl,
                leverage: self.leverage,
            }
        }))
    }

    fn pending_orders(&mut self) -> crate::Result<Vec<PendingOrder>> {
        Ok(self.pending.clone())
    }

    fn log(&mut self, message: &str) {
        tracing::debug!(target: "sim", "{}", message);
        self.log_lines.push(message.to_string());
    }
}
