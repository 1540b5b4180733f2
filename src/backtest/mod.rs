//! Historical replay: synthetic data, the bar loop, and reporting.

pub mod report;
pub mod runner;
pub mod synthetic;

pub use report::BacktestReport;
pub use runner::BacktestRunner;
pub use synthetic::{MarketScenario, SyntheticDataGenerator};
