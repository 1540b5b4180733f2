use crate::indicators::IndicatorRow;
use crate::models::{Candle, TradeKind, TradeRecord};

/// Final results of one backtest run.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub strategy_name: String,
    pub initial_balance: f64,
    /// Wallet balance at the end of the replay. Margin still locked in
    /// an open position is not counted, matching live wallet reads.
    pub final_balance: f64,
    pub roi_pct: f64,
    pub total_trades: usize,
    pub trades_log: Vec<TradeRecord>,
    /// The replayed series with its precomputed indicator rows, for
    /// plotting and inspection.
    pub candles: Vec<Candle>,
    pub indicator_rows: Vec<IndicatorRow>,
}

impl BacktestReport {
    pub fn closed_trades(&self) -> impl Iterator<Item = &TradeRecord> {
        self.trades_log
            .iter()
            .filter(|t| t.kind == TradeKind::Close)
    }

    pub fn winning_trades(&self) -> usize {
        self.closed_trades()
            .filter(|t| t.pnl.unwrap_or(0.0) > 0.0)
            .count()
    }

    pub fn losing_trades(&self) -> usize {
        self.closed_trades()
            .filter(|t| t.pnl.unwrap_or(0.0) < 0.0)
            .count()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.closed_trades().filter_map(|t| t.pnl).sum()
    }

    pub fn print_report(&self) {
        println!("\n========== BACKTEST REPORT ==========");
        println!("Strategy:         {}", self.strategy_name);
        println!("Initial balance:  ${:.2}", self.initial_balance);
        println!("Final balance:    ${:.2}", self.final_balance);
        println!("ROI:              {:.2}%", self.roi_pct);
        println!("Total trades:     {}", self.total_trades);
        println!(
            "Closed (win/loss): {} / {}",
            self.winning_trades(),
            self.losing_trades()
        );
        println!("Realized P&L:     ${:.4}", self.realized_pnl());
        println!("=====================================\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_win_loss_split_counts_only_closes() {
        let now = Utc::now();
        let report = BacktestReport {
            strategy_name: "test".to_string(),
            initial_balance: 10_000.0,
            final_balance: 10_005.0,
            roi_pct: 0.05,
            total_trades: 4,
            trades_log: vec![
                TradeRecord::fill(TradeKind::Buy, 100.0, 1.0, now),
                TradeRecord::close(101.0, 1.0, now),
                TradeRecord::fill(TradeKind::Buy, 101.0, 1.0, now),
                TradeRecord::close(100.5, -0.5, now),
            ],
            candles: Vec::new(),
            indicator_rows: Vec::new(),
        };

        assert_eq!(report.winning_trades(), 1);
        assert_eq!(report.losing_trades(), 1);
        assert!((report.realized_pnl() - 0.5).abs() < 1e-9);
    }
}
