use thiserror::Error;

/// Typed rejection taxonomy for order placement and venue queries.
///
/// The state machine matches on these variants instead of sniffing venue
/// error strings, so a post-only collision and a reduce-only violation
/// take different transitions.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("post-only order at {price} would cross the book")]
    PostOnlyWouldCross { price: f64 },

    #[error("reduce-only order has no position to reduce")]
    ReduceOnlyNoPosition,

    #[error("insufficient balance: need {needed:.2}, have {available:.2}")]
    InsufficientBalance { needed: f64, available: f64 },

    #[error("venue rejected order: {0}")]
    Rejected(String),

    #[error("order {0} not found")]
    OrderNotFound(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl ExchangeError {
    /// Exit placement failing this way means the position no longer exists
    /// (closed externally), i.e. the executor is in a phantom state.
    pub fn is_reduce_only_violation(&self) -> bool {
        match self {
            ExchangeError::ReduceOnlyNoPosition => true,
            ExchangeError::Rejected(msg) => {
                // Bybit retCode 110017: "reduce-only rule not satisfied"
                msg.contains("110017") || msg.to_lowercase().contains("reduce")
            }
            _ => false,
        }
    }
}
