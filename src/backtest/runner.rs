use crate::backtest::report::BacktestReport;
use crate::context::{ExecutionContext, SimulationContext};
use crate::indicators::{compute_rows, IndicatorConfig};
use crate::models::Candle;
use crate::strategy::{MarketFrame, Strategy};
use crate::Result;

/// Bars skipped at the start of a replay so lookback indicators have a
/// full window before the first decision.
const DEFAULT_WARMUP: usize = 50;

/// Replays a historical candle series through the fill simulator and a
/// strategy, one bar at a time.
///
/// The bar loop keeps two guarantees: the simulator's clock advances to
/// bar `i` before the strategy sees it (so resting orders resolve
/// against the same bar the strategy observes next), and the slice
/// passed to the strategy at step `i` ends exactly at bar `i` — no
/// future data ever leaks in.
pub struct BacktestRunner {
    initial_balance: f64,
    fee_rate: f64,
    warmup: usize,
    indicator_config: IndicatorConfig,
}

impl BacktestRunner {
    pub fn new(initial_balance: f64, fee_rate: f64) -> Self {
        Self {
            initial_balance,
            fee_rate,
            warmup: DEFAULT_WARMUP,
            indicator_config: IndicatorConfig::default(),
        }
    }

    pub fn with_warmup(mut self, warmup: usize) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_indicator_config(mut self, config: IndicatorConfig) -> Self {
        self.indicator_config = config;
        self
    }

    pub fn run<S: Strategy>(&self, strategy: &mut S, candles: Vec<Candle>) -> Result<BacktestReport> {
        if candles.len() <= self.warmup {
            return Err(format!(
                "Not enough candles for backtest: need more than {}, got {}",
                self.warmup,
                candles.len()
            )
            .into());
        }

        tracing::info!(
            "Starting backtest: {} candles, {} warmup, strategy {}",
            candles.len(),
            self.warmup,
            strategy.name()
        );

        // Indicators are precomputed in one pass; row i only derives
        // from bars 0..=i, so handing out precomputed rows leaks nothing
        let rows = compute_rows(&candles, &self.indicator_config);

        let mut ctx = SimulationContext::new(self.initial_balance, self.fee_rate);
        strategy.on_init(&mut ctx)?;

        for i in self.warmup..candles.len() {
            // Clock first: resting orders resolve against bar i before
            // the strategy trades on it
            ctx.advance(&candles[i]);

            let frame = MarketFrame::new(&candles[..=i], &rows[..=i]);
            if let Err(e) = strategy.on_candle(&mut ctx, &frame) {
                tracing::warn!("Strategy error on bar {}: {}", i, e);
            }
        }

        let final_balance = ctx.balance()?;
        let roi_pct = (final_balance - self.initial_balance) / self.initial_balance * 100.0;
        let trades_log = ctx.into_trades();

        tracing::info!(
            "Backtest complete: {} trades, ROI {:.2}%",
            trades_log.len(),
            roi_pct
        );

        Ok(BacktestReport {
            strategy_name: strategy.name().to_string(),
            initial_balance: self.initial_balance,
            final_balance,
            roi_pct,
            total_trades: trades_log.len(),
            trades_log,
            candles,
            indicator_rows: rows,
        })
    }
}
