use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::models::Side;

/// Venue precision filters for one symbol: price tick size, quantity step
/// size and minimum order quantity.
///
/// Prices round conservatively by side (buy floors to tick, sell ceils) so
/// a rounded order is never more aggressive than the caller asked for.
/// Quantities floor to the step and clamp up to the minimum.
#[derive(Debug, Clone)]
pub struct SymbolPrecision {
    price_tick: Decimal,
    qty_step: Decimal,
    min_qty: Decimal,
}

impl SymbolPrecision {
    pub fn new(price_tick: &str, qty_step: &str, min_qty: &str) -> anyhow::Result<Self> {
        Ok(Self {
            price_tick: Decimal::from_str(price_tick)?,
            qty_step: Decimal::from_str(qty_step)?,
            min_qty: Decimal::from_str(min_qty)?,
        })
    }

    pub fn round_price(&self, price: f64, side: Side) -> f64 {
        let price = Decimal::from_f64(price).unwrap_or_default();
        let ticks = price / self.price_tick;
        let ticks = match side {
            Side::Buy => ticks.floor(),
            Side::Sell => ticks.ceil(),
        };
        (ticks * self.price_tick).to_f64().unwrap_or(0.0)
    }

    pub fn round_qty(&self, qty: f64) -> f64 {
        let qty = Decimal::from_f64(qty).unwrap_or_default();
        let rounded = (qty / self.qty_step).floor() * self.qty_step;
        let rounded = rounded.max(self.min_qty);
        rounded.to_f64().unwrap_or(0.0)
    }
}

impl Default for SymbolPrecision {
    fn default() -> Self {
        // Generic USDT-perp filters: 0.01 tick, 0.001 step
        Self {
            price_tick: Decimal::new(1, 2),
            qty_step: Decimal::new(1, 3),
            min_qty: Decimal::new(1, 3),
        }
    }
}

/// Round to a fixed number of decimal places (half-up). Used for grid
/// price generation where both sides share one precision.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(decimals).to_f64().unwrap_or(value))
        .unwrap_or(value)
}
