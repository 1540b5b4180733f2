/// Relative Strength Index over the trailing `period` price changes.
///
/// Above ~70 reads overbought, below ~30 oversold. Returns 100 when the
/// window contains no losses at all.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let changes: Vec<f64> = prices
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .collect();
    let recent = &changes[changes.len() - period..];

    let avg_gain: f64 = recent.iter().filter(|c| **c > 0.0).sum::<f64>() / period as f64;
    let avg_loss: f64 =
        recent.iter().filter(|c| **c < 0.0).map(|c| c.abs()).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_in_open_interval() {
        let prices = vec![
            44.0, 44.25, 44.5, 43.75, 44.0, 44.5, 45.0, 45.5, 45.25, 45.5, 46.0, 46.5, 46.25,
            46.0, 46.5,
        ];
        let rsi = calculate_rsi(&prices, 14).unwrap();
        assert!(rsi > 0.0 && rsi < 100.0);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert!(calculate_rsi(&[100.0, 102.0, 101.0], 14).is_none());
    }

    #[test]
    fn test_rsi_pure_uptrend_pegs_at_100() {
        let prices = vec![100.0, 101.0, 102.0, 103.0, 104.0, 105.0];
        assert_eq!(calculate_rsi(&prices, 5), Some(100.0));
    }

    #[test]
    fn test_rsi_pure_downtrend_near_zero() {
        let prices = vec![105.0, 104.0, 103.0, 102.0, 101.0, 100.0];
        assert_eq!(calculate_rsi(&prices, 5), Some(0.0));
    }
}
