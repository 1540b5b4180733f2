//! Pure indicator math over closed candles. Stateless: everything is
//! recomputed from the series, nothing survives a restart.

pub mod moving_average;
pub mod rsi;

pub use moving_average::{calculate_ema, calculate_sma};
pub use rsi::calculate_rsi;

use crate::models::Candle;

/// Indicator values aligned to one bar of the series. `None` until the
/// lookback window is filled.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorRow {
    pub sma_fast: Option<f64>,
    pub sma_slow: Option<f64>,
    pub ema: Option<f64>,
    pub rsi: Option<f64>,
}

/// Periods used by [`compute_rows`].
#[derive(Debug, Clone, Copy)]
pub struct IndicatorConfig {
    pub sma_fast_period: usize,
    pub sma_slow_period: usize,
    pub ema_period: usize,
    pub rsi_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_fast_period: 9,
            sma_slow_period: 21,
            ema_period: 20,
            rsi_period: 14,
        }
    }
}

/// Precompute one [`IndicatorRow`] per candle. Row `i` only sees closes
/// up to and including bar `i`, so precomputed rows are safe to hand to
/// decision logic during a replay.
pub fn compute_rows(candles: &[Candle], config: &IndicatorConfig) -> Vec<IndicatorRow> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    (0..closes.len())
        .map(|i| {
            let visible = &closes[..=i];
            IndicatorRow {
                sma_fast: calculate_sma(visible, config.sma_fast_period),
                sma_slow: calculate_sma(visible, config.sma_slow_period),
                ema: calculate_ema(visible, config.ema_period),
                rsi: calculate_rsi(visible, config.rsi_period),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::minutes(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_rows_align_with_series() {
        let series = candles(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        let config = IndicatorConfig {
            sma_fast_period: 3,
            sma_slow_period: 5,
            ema_period: 3,
            rsi_period: 3,
        };
        let rows = compute_rows(&series, &config);

        assert_eq!(rows.len(), series.len());
        // Warmup rows have no value yet
        assert!(rows[1].sma_fast.is_none());
        assert_eq!(rows[2].sma_fast, Some(101.0));
        assert!(rows[3].sma_slow.is_none());
        assert_eq!(rows[4].sma_slow, Some(102.0));
    }

    #[test]
    fn test_row_only_sees_past_bars() {
        let config = IndicatorConfig {
            sma_fast_period: 3,
            ..Default::default()
        };
        let short = candles(&[100.0, 101.0, 102.0]);
        let long = candles(&[100.0, 101.0, 102.0, 500.0]);

        let short_rows = compute_rows(&short, &config);
        let long_rows = compute_rows(&long, &config);
        // Appending a future bar cannot change an earlier row
        assert_eq!(short_rows[2], long_rows[2]);
    }
}
