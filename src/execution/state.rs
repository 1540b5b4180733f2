use serde::{Deserialize, Serialize};

/// Lifecycle states of a single entry+exit trade.
///
/// `PENDING_ENTRY → PLACED_ENTRY → FILLED_WAIT → PLACED_EXIT → COMPLETED`,
/// with `PLACED_EXIT → PENDING_ENTRY` when looping is enabled. The string
/// values are the persisted representation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExecutorState {
    #[serde(rename = "PENDING_ENTRY")]
    PendingEntry,
    #[serde(rename = "PLACED_ENTRY")]
    PlacedEntry,
    #[serde(rename = "FILLED_WAIT")]
    FilledWait,
    #[serde(rename = "PLACED_EXIT")]
    PlacedExit,
    #[serde(rename = "COMPLETED")]
    Completed,
}

impl Default for ExecutorState {
    fn default() -> Self {
        ExecutorState::PendingEntry
    }
}

impl std::fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExecutorState::PendingEntry => "PENDING_ENTRY",
            ExecutorState::PlacedEntry => "PLACED_ENTRY",
            ExecutorState::FilledWait => "FILLED_WAIT",
            ExecutorState::PlacedExit => "PLACED_EXIT",
            ExecutorState::Completed => "COMPLETED",
        };
        write!(f, "{}", name)
    }
}
