//! Order lifecycle: the per-trade state machine and the manager that
//! ticks a whole grid of them against one exchange client.

pub mod executor;
pub mod manager;
pub mod state;

pub use executor::{ExecutorRecord, PositionExecutor, TickSnapshot};
pub use manager::{Recovery, TradeManager};
pub use state::ExecutorState;
