/// Simple moving average over the trailing `period` values.
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Exponential moving average seeded from the SMA of the first `period`
/// values, then smoothed across the rest of the series.
pub fn calculate_ema(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed = prices[..period].iter().sum::<f64>() / period as f64;

    Some(
        prices[period..]
            .iter()
            .fold(seed, |ema, price| (price - ema) * multiplier + ema),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_uses_trailing_window() {
        let prices = vec![1.0, 2.0, 100.0, 102.0, 104.0];
        assert_eq!(calculate_sma(&prices, 3), Some(102.0));
    }

    #[test]
    fn test_sma_insufficient_data() {
        assert!(calculate_sma(&[100.0, 102.0], 5).is_none());
        assert!(calculate_sma(&[], 1).is_none());
    }

    #[test]
    fn test_ema_tracks_recent_prices() {
        let prices = vec![100.0, 100.0, 100.0, 100.0, 100.0, 120.0];
        let ema = calculate_ema(&prices, 5).unwrap();
        // Pulled toward the jump but not all the way
        assert!(ema > 100.0 && ema < 120.0);
    }

    #[test]
    fn test_ema_equals_sma_at_exact_period() {
        let prices = vec![100.0, 102.0, 104.0];
        assert_eq!(calculate_ema(&prices, 3), calculate_sma(&prices, 3));
    }
}
