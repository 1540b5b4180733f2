use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order/position side
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side that closes a position held on this side
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderType {
    Limit,
    Market,
}

/// Venue order status (Bybit-style string values)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    Deactivated,
}

impl OrderStatus {
    /// Terminal without a fill: the order will never execute
    pub fn is_terminal_non_fill(self) -> bool {
        matches!(
            self,
            OrderStatus::Cancelled | OrderStatus::Rejected | OrderStatus::Deactivated
        )
    }
}

/// An order currently resting on the venue's book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: String,
    pub price: f64,
    pub qty: f64,
    pub side: Side,
    pub order_type: OrderType,
    pub status: OrderStatus,
}

/// A record from the venue's recent order history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryOrder {
    pub order_id: String,
    pub avg_price: f64,
    pub status: OrderStatus,
}

/// Open position as reported by the venue (or the simulator)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionInfo {
    pub side: Side,
    pub qty: f64,
    pub entry_price: f64,
    pub unrealized_pnl: f64,
    pub leverage: u32,
}

/// OHLCV candlestick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeKind {
    Buy,
    Sell,
    Close,
}

/// Immutable audit-trail entry: one executed fill or position close.
///
/// `qty` is present on `Buy`/`Sell` records, `pnl` on `Close` records.
/// Records are appended and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub kind: TradeKind,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    pub time: DateTime<Utc>,
}

impl TradeRecord {
    pub fn fill(kind: TradeKind, price: f64, qty: f64, time: DateTime<Utc>) -> Self {
        Self {
            kind,
            price,
            qty: Some(qty),
            pnl: None,
            time,
        }
    }

    pub fn close(price: f64, pnl: f64, time: DateTime<Utc>) -> Self {
        Self {
            kind: TradeKind::Close,
            price,
            qty: None,
            pnl: Some(pnl),
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_terminal_non_fill_statuses() {
        assert!(OrderStatus::Cancelled.is_terminal_non_fill());
        assert!(OrderStatus::Rejected.is_terminal_non_fill());
        assert!(OrderStatus::Deactivated.is_terminal_non_fill());
        assert!(!OrderStatus::Filled.is_terminal_non_fill());
        assert!(!OrderStatus::New.is_terminal_non_fill());
        assert!(!OrderStatus::PartiallyFilled.is_terminal_non_fill());
    }

    #[test]
    fn test_trade_record_serialization_omits_absent_fields() {
        let record = TradeRecord::close(105.0, 12.5, Utc::now());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"pnl\""));
        assert!(!json.contains("\"qty\""));

        let record = TradeRecord::fill(TradeKind::Buy, 100.0, 2.0, Utc::now());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"qty\""));
        assert!(!json.contains("\"pnl\""));
    }
}
