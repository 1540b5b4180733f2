// Trading strategy module
pub mod maker_scalp;

pub use maker_scalp::MakerScalpStrategy;

use crate::context::ExecutionContext;
use crate::indicators::IndicatorRow;
use crate::models::Candle;
use crate::Result;

/// Everything decision logic may see on one tick: the candle series up
/// to and including the current bar, plus the matching precomputed
/// indicator rows. Never holds future bars.
#[derive(Debug, Clone, Copy)]
pub struct MarketFrame<'a> {
    pub candles: &'a [Candle],
    pub indicators: &'a [IndicatorRow],
}

impl<'a> MarketFrame<'a> {
    pub fn new(candles: &'a [Candle], indicators: &'a [IndicatorRow]) -> Self {
        debug_assert_eq!(candles.len(), indicators.len());
        Self {
            candles,
            indicators,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// The bar being traded on.
    pub fn current(&self) -> &Candle {
        &self.candles[self.candles.len() - 1]
    }

    pub fn current_indicators(&self) -> &IndicatorRow {
        &self.indicators[self.indicators.len() - 1]
    }

    pub fn close(&self) -> f64 {
        self.current().close
    }
}

/// Base trait for trade-decision logic. The same implementation runs
/// unchanged against the live context and the fill simulator.
pub trait Strategy {
    /// Strategy name for logs and reports
    fn name(&self) -> &str;

    /// Called once before the first tick (set leverage, warm caches)
    fn on_init(&mut self, ctx: &mut dyn ExecutionContext) -> Result<()>;

    /// Called once per closed bar with everything visible up to it
    fn on_candle(&mut self, ctx: &mut dyn ExecutionContext, frame: &MarketFrame<'_>)
        -> Result<()>;
}
