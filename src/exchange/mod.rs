// Exchange access layer: the venue seam as a trait, plus a scripted
// in-memory implementation for tests and dry runs. A real HTTP client
// lives behind this trait and performs its own retries and timeouts.
pub mod error;
pub mod paper;
pub mod precision;

pub use error::ExchangeError;
pub use paper::PaperExchange;
pub use precision::SymbolPrecision;

use crate::models::{HistoryOrder, OpenOrder, PositionInfo, Side};

pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;

/// Contract with the venue for a single bound symbol.
///
/// Implementations authenticate, round price/quantity to venue precision
/// and retry transient connectivity failures internally; callers only see
/// the typed rejections in [`ExchangeError`].
pub trait ExchangeClient {
    fn get_current_price(&mut self) -> ExchangeResult<f64>;

    fn get_balance(&mut self) -> ExchangeResult<f64>;

    /// Place a resting limit order. `post_only` guarantees maker-or-reject.
    fn place_limit_order(
        &mut self,
        side: Side,
        qty: f64,
        price: f64,
        reduce_only: bool,
        post_only: bool,
    ) -> ExchangeResult<String>;

    fn place_market_order(&mut self, side: Side, qty: f64, reduce_only: bool)
        -> ExchangeResult<String>;

    fn get_open_orders(&mut self) -> ExchangeResult<Vec<OpenOrder>>;

    /// Most recent `limit` terminal (and near-terminal) order records,
    /// newest last.
    fn get_order_history(&mut self, limit: usize) -> ExchangeResult<Vec<HistoryOrder>>;

    /// The open position for the bound symbol, if size > 0.
    fn get_open_position(&mut self) -> ExchangeResult<Option<PositionInfo>>;

    fn cancel_order(&mut self, order_id: &str) -> ExchangeResult<()>;

    fn cancel_all_orders(&mut self) -> ExchangeResult<()>;

    fn set_leverage(&mut self, leverage: u32) -> ExchangeResult<()>;
}
