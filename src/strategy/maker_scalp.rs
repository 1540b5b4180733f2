use crate::context::{ExecutionContext, OrderOptions};
use crate::models::Side;
use crate::strategy::{MarketFrame, Strategy};
use crate::Result;

/// Maker-only scalper: rests a post-only buy slightly below the market,
/// then parks a single post-only reduce-only exit a fixed profit above
/// the realized entry. Sizing is a fraction of the current wallet.
///
/// It never holds more than one working order per side, so a fill can
/// never cascade into duplicate exits.
pub struct MakerScalpStrategy {
    /// Entry rests this fraction below the current close (0.0005 = 5 bps).
    pub entry_offset: f64,
    /// Exit targets this fraction above the entry price.
    pub profit_target: f64,
    /// Fraction of the wallet committed per entry.
    pub risk_fraction: f64,
    /// Skip new entries while RSI is at or above this level.
    pub rsi_ceiling: f64,
    pub leverage: u32,
}

impl Default for MakerScalpStrategy {
    fn default() -> Self {
        Self {
            entry_offset: 0.0005,
            profit_target: 0.0010,
            risk_fraction: 0.20,
            rsi_ceiling: 70.0,
            leverage: 1,
        }
    }
}

impl Strategy for MakerScalpStrategy {
    fn name(&self) -> &str {
        "maker_scalp"
    }

    fn on_init(&mut self, ctx: &mut dyn ExecutionContext) -> Result<()> {
        ctx.set_leverage(self.leverage)?;
        ctx.log(&format!(
            "maker_scalp ready: offset {:.4}%, target {:.4}%, risk {:.0}%",
            self.entry_offset * 100.0,
            self.profit_target * 100.0,
            self.risk_fraction * 100.0
        ));
        Ok(())
    }

    fn on_candle(
        &mut self,
        ctx: &mut dyn ExecutionContext,
        frame: &MarketFrame<'_>,
    ) -> Result<()> {
        let current_price = frame.close();

        if let Some(position) = ctx.position()? {
            // One exit order at a time; a second would double-close
            let has_pending_sell = ctx
                .pending_orders()?
                .iter()
                .any(|o| o.side == Side::Sell);
            if !has_pending_sell {
                let limit_sell = position.entry_price * (1.0 + self.profit_target);
                ctx.log(&format!(
                    "Position open at {}, placing exit at {}",
                    position.entry_price, limit_sell
                ));
                ctx.sell(
                    position.qty,
                    Some(limit_sell),
                    OrderOptions::post_only_reduce_only(),
                )?;
            }
            return Ok(());
        }

        // Flat: hunt an entry unless one is already resting
        let has_pending_buy = ctx
            .pending_orders()?
            .iter()
            .any(|o| o.side == Side::Buy);
        if has_pending_buy {
            return Ok(());
        }

        if let Some(rsi) = frame.current_indicators().rsi {
            if rsi >= self.rsi_ceiling {
                return Ok(());
            }
        }

        let limit_buy = current_price * (1.0 - self.entry_offset);
        let qty = ctx.balance()? * self.risk_fraction / limit_buy;
        if qty <= 0.0 {
            return Ok(());
        }
        ctx.buy(qty, Some(limit_buy), OrderOptions::post_only())?;
        Ok(())
    }
}
