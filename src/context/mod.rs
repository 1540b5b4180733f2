// Execution contexts: the contract a strategy trades through, with a
// live implementation forwarding to the exchange seam and a simulated
// implementation backing backtests.
pub mod live;
pub mod sim;

pub use live::LiveContext;
pub use sim::SimulationContext;

use serde::{Deserialize, Serialize};

use crate::models::{PositionInfo, Side};

/// Flags on an order request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderOptions {
    /// Maker-or-reject: never cross the spread.
    pub post_only: bool,
    /// Only shrink/close an existing position, never open or flip one.
    pub reduce_only: bool,
}

impl OrderOptions {
    pub fn post_only() -> Self {
        Self {
            post_only: true,
            reduce_only: false,
        }
    }

    pub fn post_only_reduce_only() -> Self {
        Self {
            post_only: true,
            reduce_only: true,
        }
    }
}

/// A limit order resting unexecuted, visible to the strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    pub order_id: String,
    pub side: Side,
    pub qty: f64,
    pub price: f64,
    pub post_only: bool,
    pub reduce_only: bool,
}

/// Unified interface a trade-decision component drives, implemented by
/// [`LiveContext`] and [`SimulationContext`]. Both implementations must
/// agree on rejection semantics: a refused order (post-only collision,
/// reduce-only without a position, insufficient balance) is logged and
/// surfaces as `Ok(None)`, never as an error.
pub trait ExecutionContext {
    fn set_leverage(&mut self, leverage: u32) -> crate::Result<()>;

    /// Buy `qty`, as a limit order at `price` or at market when `None`.
    /// Returns the order id, or `None` when the venue refused the order.
    fn buy(&mut self, qty: f64, price: Option<f64>, opts: OrderOptions)
        -> crate::Result<Option<String>>;

    /// Mirror of [`ExecutionContext::buy`].
    fn sell(
        &mut self,
        qty: f64,
        price: Option<f64>,
        opts: OrderOptions,
    ) -> crate::Result<Option<String>>;

    fn balance(&mut self) -> crate::Result<f64>;

    fn position(&mut self) -> crate::Result<Option<PositionInfo>>;

    /// Limit orders currently resting unexecuted.
    fn pending_orders(&mut self) -> crate::Result<Vec<PendingOrder>>;

    fn log(&mut self, message: &str);
}
